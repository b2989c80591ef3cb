//! Plain-data shapes handed to the external task engine. Everything here is
//! inert configuration from the engine's point of view: this layer fills the
//! fields in, the engine interprets them. Scheduling, up-to-date checking
//! and persistence all live on the engine side.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{Action, HashMap};

/// The `getargs` mapping: local argument name to (task name, value name).
pub type GetArgs = HashMap<String, (String, String)>;

/// The name entry of a lowered task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameKey {
    /// top-level task, emitted under the `basename` key
    Base(String),
    /// subtask within a group, emitted under the `name` key
    Sub(String),
    /// group head entry: base name plus an explicit null `name`, so the
    /// engine registers the group's metadata even when it yields no subtasks
    GroupHead(String),
}

impl NameKey {
    /// The name string itself, whichever key it is emitted under.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Base(s) | Self::Sub(s) | Self::GroupHead(s) => s,
        }
    }
}

/// Signature of title callables: live task record in, one-line label out.
pub type TitleFn = Arc<dyn Fn(&TaskRecord) -> String + Send + Sync>;

/// A task title. Fixed text renders behind the task name; a callable is
/// invoked with the live task record wherever the engine needs a label.
#[derive(Clone)]
pub enum Title {
    Text(String),
    Call(TitleFn),
}

impl Title {
    /// Render the one-line label for the given task record.
    pub fn render(&self, task: &TaskRecord) -> String {
        match self {
            Self::Text(text) => format!("{} => {}", task.name, text),
            Self::Call(f) => f(task),
        }
    }
}

impl fmt::Debug for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "Title::Text({text})"),
            Self::Call(_) => write!(f, "Title::Call"),
        }
    }
}

impl PartialEq for Title {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Call(a), Self::Call(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Signature of up-to-date predicates.
pub type PredicateFn = Arc<dyn Fn(&RunContext) -> bool + Send + Sync>;

/// A named in-process up-to-date predicate.
#[derive(Clone)]
pub struct Predicate {
    name: String,
    f: PredicateFn,
}

impl Predicate {
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(&RunContext) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate the predicate with the engine-provided context.
    pub fn check(&self, ctx: &RunContext) -> bool {
        (self.f)(ctx)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicate({})", self.name)
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.f, &other.f)
    }
}

/// One entry of a task's `uptodate` list.
#[derive(Debug, Clone, PartialEq)]
pub enum UpToDate {
    /// constant verdict: `true` is always up to date, `false` never
    Always(bool),
    /// slot the engine should ignore
    Ignore,
    /// command probe: up to date when it exits successfully
    Cmd(String),
    /// in-process predicate
    Call(Predicate),
}

impl From<bool> for UpToDate {
    fn from(b: bool) -> Self {
        Self::Always(b)
    }
}

impl From<&str> for UpToDate {
    fn from(cmd: &str) -> Self {
        Self::Cmd(cmd.to_owned())
    }
}

impl From<Predicate> for UpToDate {
    fn from(p: Predicate) -> Self {
        Self::Call(p)
    }
}

/// A task's cleanup policy.
#[derive(Debug, Clone, PartialEq)]
pub enum Clean {
    /// remove the task's declared targets
    Targets,
    /// run these actions instead
    Actions(Vec<Action>),
}

/// A lowered task: the plain mapping handed to the engine. One `Option`
/// field per recognized engine key; `None` means the key is absent and the
/// engine's own default governs. Never null-valued.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDict {
    pub name: NameKey,
    pub doc: Option<String>,
    pub title: Option<Title>,
    pub actions: Option<Vec<Action>>,
    pub file_dep: Option<Vec<PathBuf>>,
    pub task_dep: Option<Vec<String>>,
    pub uptodate: Option<Vec<UpToDate>>,
    pub targets: Option<Vec<PathBuf>>,
    pub clean: Option<Clean>,
    pub setup: Option<Vec<String>>,
    pub teardown: Option<Vec<Action>>,
    pub getargs: Option<GetArgs>,
    pub calc_dep: Option<Vec<String>>,
    pub verbosity: Option<u8>,
}

impl TaskDict {
    /// A metadata-only dict with every optional key absent.
    pub fn bare(name: NameKey) -> Self {
        Self {
            name,
            doc: None,
            title: None,
            actions: None,
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

/// The live task record the engine hands back to in-process callables at
/// run time. Built by the engine from a lowered [`TaskDict`]; read-only
/// from this layer's perspective.
#[derive(Debug, Clone, Default)]
pub struct TaskRecord {
    pub name: String,
    pub targets: Vec<PathBuf>,
    pub task_dep: Vec<String>,
    pub actions: Vec<Action>,
}

/// Invocation context for in-process actions and predicates.
#[derive(Debug)]
pub struct RunContext<'a> {
    pub task: &'a TaskRecord,
    /// dependencies the engine found changed since the last run, when known
    pub changed: Option<&'a [String]>,
}
