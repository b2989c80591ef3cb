use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::diag::diagnostic_action;
use crate::engine::{Clean, GetArgs, NameKey, TaskDict, TaskRecord, Title, UpToDate};
use crate::names::{resolve_names, TaskRef};
use crate::{validate_action, Action, Callable, Error, Value};

/// A single task declaration. Built once with [`TaskBuilder`], immutable
/// afterwards; the engine consumes it through [`Task::to_engine_dict`].
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    name: Option<String>,
    doc: Option<String>,
    title: Option<Title>,
    /// attached function, when built decorator-style
    func: Option<Callable>,
    /// final action list: pre-actions, then the primary action(s), then post-actions
    actions: Vec<Action>,
    tell_reason: bool,
    file_dep: Option<Vec<PathBuf>>,
    task_dep: Option<Vec<TaskRef>>,
    uptodate: Option<Vec<UpToDate>>,
    targets: Option<Vec<PathBuf>>,
    clean: Option<Clean>,
    setup: Option<Vec<TaskRef>>,
    teardown: Option<Vec<Action>>,
    getargs: Option<GetArgs>,
    calc_dep: Option<Vec<TaskRef>>,
    verbosity: Option<u8>,
}

impl Task {
    /// Start declaring a task.
    pub fn builder() -> TaskBuilder {
        TaskBuilder::default()
    }

    /// Declare a task whose primary action is the given function, with
    /// everything else defaulted. Shorthand for `builder().attach(f)`.
    pub fn from_fn(f: Callable) -> Result<Self> {
        Self::builder().attach(f)
    }

    /// The name the engine will see: the explicit name when one was given,
    /// else the attached function's identifier.
    pub fn resolved_name(&self) -> Result<&str> {
        let name = self
            .name
            .as_deref()
            .or_else(|| self.func.as_ref().map(Callable::name))
            .ok_or(Error::MissingTaskName)?;
        Ok(name)
    }

    // explicit doc wins over the attached function's doc.
    fn resolved_doc(&self) -> Option<&str> {
        self.doc
            .as_deref()
            .or_else(|| self.func.as_ref().and_then(Callable::doc))
    }
}

// lowering ///////////////////////
impl Task {
    /// Lower this declaration into the plain mapping the engine consumes.
    /// Top-level tasks emit their name under `basename`; subtasks yielded
    /// by a group emit it under `name`. Leaves the declaration untouched,
    /// so lowering twice gives equal mappings.
    pub fn to_engine_dict(&self, is_subtask: bool) -> Result<TaskDict> {
        let name = self.resolved_name()?.to_owned();
        log::debug!("lowering task '{name}'");

        let key = if is_subtask {
            NameKey::Sub(name)
        } else {
            NameKey::Base(name)
        };
        let mut dict = TaskDict::bare(key);

        dict.doc = self.resolved_doc().map(str::to_owned);
        dict.title = self.title.clone();

        // diagnostic action goes first, before any pre-actions:
        let mut actions = Vec::with_capacity(self.actions.len() + 1);
        if self.tell_reason {
            actions.push(Action::Call(diagnostic_action()));
        }
        actions.extend(self.actions.iter().cloned());
        if actions.is_empty() {
            return Err(Error::EmptyActionList.into());
        }
        dict.actions = Some(actions);

        // dependency-like fields hold task references; normalize to names:
        if let Some(refs) = &self.task_dep {
            dict.task_dep = Some(resolve_names(refs)?);
        }
        if let Some(refs) = &self.setup {
            dict.setup = Some(resolve_names(refs)?);
        }
        if let Some(refs) = &self.calc_dep {
            dict.calc_dep = Some(resolve_names(refs)?);
        }

        // the rest lower verbatim, and only when set:
        dict.file_dep = self.file_dep.clone();
        dict.uptodate = self.uptodate.clone();
        dict.targets = self.targets.clone();
        dict.clean = self.clean.clone();
        dict.teardown = self.teardown.clone();
        dict.getargs = self.getargs.clone();
        dict.verbosity = self.verbosity;

        Ok(dict)
    }
}

#[derive(Debug, Clone)]
enum CleanSpec {
    Targets,
    Actions(Vec<Value>),
}

/// Builder for [`Task`]. Finish with [`TaskBuilder::build`] when the
/// actions are given explicitly, or [`TaskBuilder::attach`] to make a
/// function the primary action (the function also supplies the task's name
/// and doc when they were not given). Declared actions are validated when
/// construction finishes, so malformed shapes fail at the declaration site.
#[derive(Debug, Clone)]
pub struct TaskBuilder {
    name: Option<String>,
    doc: Option<String>,
    title: Option<Title>,
    pre_actions: Option<Vec<Value>>,
    actions: Option<Vec<Value>>,
    post_actions: Option<Vec<Value>>,
    tell_reason: bool,
    file_dep: Option<Vec<PathBuf>>,
    task_dep: Option<Vec<TaskRef>>,
    uptodate: Option<Vec<UpToDate>>,
    targets: Option<Vec<PathBuf>>,
    clean: Option<CleanSpec>,
    setup: Option<Vec<TaskRef>>,
    teardown: Option<Vec<Value>>,
    getargs: Option<GetArgs>,
    calc_dep: Option<Vec<TaskRef>>,
    verbosity: Option<u8>,
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self {
            name: None,
            doc: None,
            title: None,
            pre_actions: None,
            actions: None,
            post_actions: None,
            // explaining why a task runs is cheap; opt out per task:
            tell_reason: true,
            file_dep: None,
            task_dep: None,
            uptodate: None,
            targets: None,
            clean: None,
            setup: None,
            teardown: None,
            getargs: None,
            calc_dep: None,
            verbosity: None,
        }
    }
}

impl TaskBuilder {
    /// Name the task explicitly instead of borrowing the attached
    /// function's identifier.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Fixed title text; the engine shows it as `"<task-name> => <text>"`.
    pub fn title(mut self, text: impl Into<String>) -> Self {
        self.title = Some(Title::Text(text.into()));
        self
    }

    /// Title callable, invoked with the live task record.
    pub fn title_fn(mut self, f: impl Fn(&TaskRecord) -> String + Send + Sync + 'static) -> Self {
        self.title = Some(Title::Call(Arc::new(f)));
        self
    }

    /// Actions to run before the primary action(s).
    pub fn pre_actions(mut self, actions: impl IntoIterator<Item = Value>) -> Self {
        self.pre_actions = Some(actions.into_iter().collect());
        self
    }

    /// The task's primary actions. Not allowed together with an attached
    /// function; use `pre_actions`/`post_actions` alongside one instead.
    pub fn actions(mut self, actions: impl IntoIterator<Item = Value>) -> Self {
        self.actions = Some(actions.into_iter().collect());
        self
    }

    /// Actions to run after the primary action(s).
    pub fn post_actions(mut self, actions: impl IntoIterator<Item = Value>) -> Self {
        self.post_actions = Some(actions.into_iter().collect());
        self
    }

    /// Whether to prepend the diagnostic action that explains why the task
    /// is executing. On by default.
    pub fn tell_reason(mut self, tell: bool) -> Self {
        self.tell_reason = tell;
        self
    }

    /// Files this task reads; the engine skips the task when none changed.
    pub fn file_dep(mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.file_dep = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    /// Files this task creates.
    pub fn targets(mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.targets = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    /// Tasks that must run before this one.
    pub fn task_dep(mut self, refs: impl IntoIterator<Item = impl Into<TaskRef>>) -> Self {
        self.task_dep = Some(refs.into_iter().map(Into::into).collect());
        self
    }

    /// Tasks to run right before this one, only when this one runs.
    pub fn setup(mut self, refs: impl IntoIterator<Item = impl Into<TaskRef>>) -> Self {
        self.setup = Some(refs.into_iter().map(Into::into).collect());
        self
    }

    /// Tasks whose result contributes dependencies of this one.
    pub fn calc_dep(mut self, refs: impl IntoIterator<Item = impl Into<TaskRef>>) -> Self {
        self.calc_dep = Some(refs.into_iter().map(Into::into).collect());
        self
    }

    /// Extra up-to-date checks, evaluated by the engine.
    pub fn uptodate(mut self, checks: impl IntoIterator<Item = impl Into<UpToDate>>) -> Self {
        self.uptodate = Some(checks.into_iter().map(Into::into).collect());
        self
    }

    /// On clean, remove the task's declared targets.
    pub fn clean_targets(mut self) -> Self {
        self.clean = Some(CleanSpec::Targets);
        self
    }

    /// On clean, run these actions instead of removing targets.
    pub fn clean_actions(mut self, actions: impl IntoIterator<Item = Value>) -> Self {
        self.clean = Some(CleanSpec::Actions(actions.into_iter().collect()));
        self
    }

    /// Actions run once all tasks have completed.
    pub fn teardown(mut self, actions: impl IntoIterator<Item = Value>) -> Self {
        self.teardown = Some(actions.into_iter().collect());
        self
    }

    /// Pull argument values from other tasks' results:
    /// (local arg name, task name, value name).
    pub fn getargs<K, T, V>(mut self, args: impl IntoIterator<Item = (K, T, V)>) -> Self
    where
        K: Into<String>,
        T: Into<String>,
        V: Into<String>,
    {
        let map = args
            .into_iter()
            .map(|(k, task, val)| (k.into(), (task.into(), val.into())))
            .collect();
        self.getargs = Some(map);
        self
    }

    /// Per-task engine verbosity (0, 1 or 2).
    pub fn verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = Some(verbosity);
        self
    }

    /// Finish a creator-style declaration, with explicit actions.
    pub fn build(self) -> Result<Task> {
        self.finish(None)
    }

    /// Finish a decorator-style declaration: the given function becomes the
    /// primary action. Fails with [`Error::ConflictingDeclaration`] if an
    /// explicit action list was also given, since it would be ambiguous
    /// which is authoritative.
    pub fn attach(self, f: Callable) -> Result<Task> {
        if self.actions.is_some() {
            return Err(Error::ConflictingDeclaration.into());
        }
        self.finish(Some(f))
    }

    fn finish(self, func: Option<Callable>) -> Result<Task> {
        let pre = validate_all(self.pre_actions)?;
        let main = validate_all(self.actions)?;
        let post = validate_all(self.post_actions)?;

        // merge into the final ordered action list now, so lowering is a
        // pure read:
        let mut actions = Vec::with_capacity(
            pre.as_ref().map_or(0, Vec::len) + main.as_ref().map_or(1, Vec::len)
                + post.as_ref().map_or(0, Vec::len),
        );
        if let Some(pre) = pre {
            actions.extend(pre);
        }
        if let Some(main) = main {
            actions.extend(main);
        } else if let Some(f) = &func {
            actions.push(Action::Call(f.clone()));
        }
        if let Some(post) = post {
            actions.extend(post);
        }

        let clean = match self.clean {
            None => None,
            Some(CleanSpec::Targets) => Some(Clean::Targets),
            Some(CleanSpec::Actions(raw)) => Some(Clean::Actions(validate_list(&raw)?)),
        };
        let teardown = validate_all(self.teardown)?;

        Ok(Task {
            name: self.name,
            doc: self.doc,
            title: self.title,
            func,
            actions,
            tell_reason: self.tell_reason,
            file_dep: self.file_dep,
            task_dep: self.task_dep,
            uptodate: self.uptodate,
            targets: self.targets,
            clean,
            setup: self.setup,
            teardown,
            getargs: self.getargs,
            calc_dep: self.calc_dep,
            verbosity: self.verbosity,
        })
    }
}

fn validate_all(actions: Option<Vec<Value>>) -> Result<Option<Vec<Action>>> {
    match actions {
        None => Ok(None),
        Some(raw) => Ok(Some(validate_list(&raw)?)),
    }
}

fn validate_list(raw: &[Value]) -> Result<Vec<Action>> {
    raw.iter().map(validate_action).collect()
}
