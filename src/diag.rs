use std::io::Write;
use std::sync::LazyLock;

use crate::engine::TaskRecord;
use crate::{Action, Callable};

// One shared instance, cloned into every lowered task, so callers can tell
// the diagnostic apart from user actions by function identity.
static WHY_AM_I_RUNNING: LazyLock<Callable> = LazyLock::new(|| {
    Callable::new("why_am_i_running", |ctx| {
        why_am_i_running(ctx.task, ctx.changed);
        Ok(())
    })
});

/// The action prepended to a lowered task when `tell_reason` is set.
pub fn diagnostic_action() -> Callable {
    WHY_AM_I_RUNNING.clone()
}

/// true if the given action is the diagnostic action.
pub(crate) fn is_diagnostic(action: &Action) -> bool {
    match action {
        Action::Call(f) => f.same_fn(&WHY_AM_I_RUNNING),
        _ => false,
    }
}

/// Print to stdout the reason a task is executing. Useful for debugging
/// declarations: the engine runs this like any other action, before the
/// task's real actions.
pub fn why_am_i_running(task: &TaskRecord, changed: Option<&[String]>) {
    explain_run(task, changed, &mut std::io::stdout());
}

/// Writer-injected core of [`why_am_i_running`]. First matching rule wins:
/// a missing target, then missing skip metadata, then the changed set.
/// Write failures are ignored; reporting must never fail a task.
pub fn explain_run(task: &TaskRecord, changed: Option<&[String]>, out: &mut dyn Write) {
    for target in &task.targets {
        if !target.exists() {
            let _ = writeln!(
                out,
                "Running {} because one of its targets no longer exists: {:?}",
                task.name, target
            );
            return;
        }
    }

    match changed {
        None | Some([]) => {
            if !task.targets.is_empty() {
                let _ = writeln!(
                    out,
                    "Running {} because it declares targets but no mechanism (file_dep or uptodate) to check them",
                    task.name
                );
            }
            // a task with no skip-relevant metadata always runs; nothing to explain
        }
        Some(changed) => {
            let _ = writeln!(
                out,
                "Running {} because the following changed: {:?}",
                task.name, changed
            );
        }
    }
}

/// Render a one-line label for a task: each action's display form (minus
/// the diagnostic action), or the member names for a pure grouping task
/// with no actions of its own.
pub fn title_with_actions(task: &TaskRecord) -> String {
    if task.actions.is_empty() {
        format!("{} => Group: {}", task.name, task.task_dep.join(", "))
    } else {
        let lines: Vec<String> = task
            .actions
            .iter()
            .filter(|a| !is_diagnostic(a))
            .map(ToString::to_string)
            .collect();
        format!("{} => {}", task.name, lines.join("\n\t"))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    fn record(name: &str) -> TaskRecord {
        TaskRecord {
            name: name.to_owned(),
            ..TaskRecord::default()
        }
    }

    fn explain(task: &TaskRecord, changed: Option<&[String]>) -> String {
        let mut out = Vec::new();
        explain_run(task, changed, &mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_missing_target_wins_over_changed_set() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = record("build");
        task.targets = vec![dir.path().join("out.txt")];

        let changed = vec!["src/main.c".to_owned()];
        let msg = explain(&task, Some(&changed));
        assert!(msg.starts_with("Running build because one of its targets no longer exists:"));
        assert!(msg.contains("out.txt"));
        // the changed set was not inspected:
        assert!(!msg.contains("src/main.c"));
    }

    #[test]
    fn test_targets_without_uptodate_metadata_warn() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("out.txt");
        std::fs::write(&existing, "x").unwrap();

        let mut task = record("build");
        task.targets = vec![existing];
        let msg = explain(&task, None);
        assert!(msg.contains("declares targets but no mechanism"));
    }

    #[test]
    fn test_no_metadata_prints_nothing() {
        let task = record("build");
        assert_eq!(explain(&task, None), "");
        assert_eq!(explain(&task, Some(&[])), "");
    }

    #[test]
    fn test_changed_set_is_reported() {
        let task = record("build");
        let changed = vec!["a.c".to_owned(), "b.c".to_owned()];
        let msg = explain(&task, Some(&changed));
        assert_eq!(
            msg,
            "Running build because the following changed: [\"a.c\", \"b.c\"]\n"
        );
    }

    #[test]
    fn test_title_filters_diagnostic_action() {
        let mut task = record("build");
        task.actions = vec![
            Action::Call(diagnostic_action()),
            Action::Cmd("echo hi".to_owned()),
            Action::Call(Callable::new("finish", |_| Ok(()))),
        ];
        assert_eq!(title_with_actions(&task), "build => Cmd: echo hi\n\tFn: finish");
    }

    #[test]
    fn test_group_task_title_lists_members() {
        let mut task = record("all");
        task.task_dep = vec!["build".to_owned(), "test".to_owned()];
        assert_eq!(title_with_actions(&task), "all => Group: build, test");
    }

    #[test]
    fn test_argv_actions_render_joined() {
        let mut task = record("cc");
        task.actions = vec![Action::Argv(vec![
            PathBuf::from("cc"),
            PathBuf::from("-o"),
            PathBuf::from("out"),
        ])];
        assert_eq!(title_with_actions(&task), "cc => Cmd: cc -o out");
    }
}
