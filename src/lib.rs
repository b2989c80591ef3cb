/// Actions and the shapes accepted for them
mod action;
/// Global engine configuration
mod config;
/// Run-time diagnostics and task titles
mod diag;
/// Plain-data shapes handed to the engine
mod engine;
/// Task-group declarations and their lazy lowering
mod group;
/// Task references and name resolution
mod names;
/// Single-task declarations and their lowering
mod task;
/// Loosely-typed declaration values
mod value;

pub use action::{validate_action, Action, ActionFn, Callable, CmdAction};
pub use config::{ConfigBuilder, GlobalConfig};
pub use diag::{diagnostic_action, explain_run, title_with_actions, why_am_i_running};
pub use engine::{
    Clean, GetArgs, NameKey, Predicate, PredicateFn, RunContext, TaskDict, TaskRecord, Title,
    TitleFn, UpToDate,
};
pub use group::{
    GenFn, Generator, GroupItem, LoweredGroup, SubtaskSource, TaskGroup, TaskGroupBuilder,
};
pub use names::{resolve_names, TaskRef};
pub use task::{Task, TaskBuilder};
pub use value::Value;

pub type Hasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;
pub type HashMap<K, V> = std::collections::HashMap<K, V, Hasher>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Action {0:?} does not match any accepted shape (command string, argv list, callable, or callable tuple)")]
    InvalidActionKind(Value),
    #[error("Task has neither an explicit name nor an attached function to derive one from")]
    MissingTaskName,
    #[error("Task would lower with an empty action list")]
    EmptyActionList,
    #[error("Explicit `actions` cannot be combined with an attached function; use pre_actions or post_actions instead")]
    ConflictingDeclaration,
    #[error("Task group has no generator attached")]
    MissingGenerator,
    #[error("Task group subtasks must come from a lazy generator, not an eager collection")]
    NotAGenerator,
    #[error("db_file {0:?} and dep_file {1:?} are aliases and cannot be given different values")]
    ConflictingAlias(std::path::PathBuf, std::path::PathBuf),
}
