use anyhow::Result;

use crate::{Callable, Task, TaskGroup};

/// A reference to a task, accepted wherever the engine expects a
/// dependency, setup or calc-dependency name. Always normalized to a plain
/// name string by [`resolve_names`] before the engine sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskRef {
    /// literal task name
    Name(String),
    /// direct link to a task declaration
    Task(Box<Task>),
    /// direct link to a task-group declaration
    Group(Box<TaskGroup>),
    /// bare function; its identifier supplies the name
    Func(Callable),
}

impl TaskRef {
    /// Resolve to the plain name string the engine expects.
    pub fn resolve(&self) -> Result<String> {
        match self {
            Self::Name(name) => Ok(name.clone()),
            Self::Task(task) => Ok(task.resolved_name()?.to_owned()),
            Self::Group(group) => Ok(group.resolved_name()?.to_owned()),
            Self::Func(f) => Ok(fn_task_name(f.name())),
        }
    }
}

impl From<&str> for TaskRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for TaskRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<&Task> for TaskRef {
    fn from(task: &Task) -> Self {
        Self::Task(Box::new(task.clone()))
    }
}

impl From<Task> for TaskRef {
    fn from(task: Task) -> Self {
        Self::Task(Box::new(task))
    }
}

impl From<&TaskGroup> for TaskRef {
    fn from(group: &TaskGroup) -> Self {
        Self::Group(Box::new(group.clone()))
    }
}

impl From<TaskGroup> for TaskRef {
    fn from(group: TaskGroup) -> Self {
        Self::Group(Box::new(group))
    }
}

impl From<Callable> for TaskRef {
    fn from(f: Callable) -> Self {
        Self::Func(f)
    }
}

/// Normalize a list of task references to plain name strings. Output order
/// matches input order exactly; nothing is de-duplicated.
pub fn resolve_names(refs: &[TaskRef]) -> Result<Vec<String>> {
    refs.iter().map(TaskRef::resolve).collect()
}

// Bare functions follow the conventional `task_` naming prefix; strip it
// once if present, otherwise use the identifier verbatim.
fn fn_task_name(name: &str) -> String {
    name.strip_prefix("task_").unwrap_or(name).to_owned()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Error, Value};

    #[test]
    fn test_resolves_mixed_refs_in_order() -> Result<()> {
        let x = Task::builder()
            .name("x")
            .actions([Value::from("echo x")])
            .build()?;
        let refs = [
            TaskRef::from(&x),
            TaskRef::from("y"),
            TaskRef::from(Callable::new("task_z", |_| Ok(()))),
        ];
        let names = resolve_names(&refs)?;
        assert_eq!(names, ["x", "y", "z"]);
        Ok(())
    }

    #[test]
    fn test_fn_name_used_verbatim_without_prefix() -> Result<()> {
        let refs = [TaskRef::from(Callable::new("deploy", |_| Ok(())))];
        assert_eq!(resolve_names(&refs)?, ["deploy"]);
        Ok(())
    }

    #[test]
    fn test_prefix_stripped_only_once() -> Result<()> {
        let refs = [TaskRef::from(Callable::new("task_task_a", |_| Ok(())))];
        assert_eq!(resolve_names(&refs)?, ["task_a"]);
        Ok(())
    }

    #[test]
    fn test_nameless_task_fails() -> Result<()> {
        let anon = Task::builder().actions([Value::from("echo")]).build()?;
        let err = resolve_names(&[TaskRef::from(anon)]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::MissingTaskName)
        ));
        Ok(())
    }
}
