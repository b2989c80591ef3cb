use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::engine::RunContext;
use crate::{Error, Value};

/// Signature of in-process actions. The engine invokes them with the live
/// task record and whatever it knows about changed dependencies.
pub type ActionFn = Arc<dyn Fn(&RunContext) -> Result<()> + Send + Sync>;

/// A named in-process function. The name is what the engine displays and
/// what task-name derivation works from; the doc is borrowed by a task
/// declaration that has none of its own.
#[derive(Clone)]
pub struct Callable {
    name: String,
    doc: Option<String>,
    f: ActionFn,
}

impl Callable {
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(&RunContext) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            doc: None,
            f: Arc::new(f),
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Invoke the function with the engine-provided context.
    pub fn call(&self, ctx: &RunContext) -> Result<()> {
        (self.f)(ctx)
    }

    /// true if `other` wraps the very same underlying function.
    pub fn same_fn(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.name)
    }
}

// Function identity, not behavior: two callables are equal when they share
// a name and wrap the same function object.
impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.same_fn(other)
    }
}

/// An engine-native command action. Declarations may carry one pre-built;
/// it passes through validation and lowering untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdAction {
    pub cmd: String,
    /// run through the shell (the engine's default) or exec directly
    pub shell: bool,
}

impl CmdAction {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            shell: true,
        }
    }

    pub fn without_shell(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            shell: false,
        }
    }
}

/// A validated task action, in the shape the engine executes.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// command string, run with the shell
    Cmd(String),
    /// argv, run without the shell
    Argv(Vec<PathBuf>),
    /// in-process function
    Call(Callable),
    /// in-process function with positional and keyword args
    CallWithArgs {
        f: Callable,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    },
    /// engine-native command action, pre-validated
    Engine(CmdAction),
}

// The engine's per-action display form, used by task titles.
impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cmd(cmd) => write!(f, "Cmd: {cmd}"),
            Self::Argv(argv) => {
                write!(f, "Cmd:")?;
                for arg in argv {
                    write!(f, " {}", arg.to_string_lossy())?;
                }
                Ok(())
            }
            Self::Call(c) => write!(f, "Fn: {}", c.name()),
            Self::CallWithArgs { f: c, .. } => write!(f, "Fn: {}", c.name()),
            Self::Engine(a) => write!(f, "Cmd: {}", a.cmd),
        }
    }
}

/// Check a declared action against the accepted shapes and classify it:
/// a command string (run with the shell), a list of strings/paths (argv,
/// run without the shell), a 2-or-3 tuple of a callable plus positional
/// args and optional keyword args, a bare callable, or an engine-native
/// [`CmdAction`]. Anything else fails with [`Error::InvalidActionKind`]
/// carrying the offending value.
pub fn validate_action(v: &Value) -> Result<Action> {
    match v {
        Value::Str(cmd) => Ok(Action::Cmd(cmd.clone())),
        Value::List(items) => argv_action(items, v),
        Value::Tuple(items) => tuple_action(items, v),
        Value::Func(f) => Ok(Action::Call(f.clone())),
        Value::Engine(a) => Ok(Action::Engine(a.clone())),
        _ => Err(invalid(v)),
    }
}

fn argv_action(items: &[Value], orig: &Value) -> Result<Action> {
    let mut argv = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Str(s) => argv.push(PathBuf::from(s)),
            Value::Path(p) => argv.push(p.clone()),
            _ => return Err(invalid(orig)),
        }
    }
    Ok(Action::Argv(argv))
}

fn tuple_action(items: &[Value], orig: &Value) -> Result<Action> {
    let (f, rest) = match items {
        [Value::Func(f), rest @ ..] if rest.len() <= 2 && !rest.is_empty() => (f, rest),
        _ => return Err(invalid(orig)),
    };
    let args = match &rest[0] {
        Value::List(args) => args.clone(),
        _ => return Err(invalid(orig)),
    };
    let kwargs = match rest.get(1) {
        None => Vec::with_capacity(0),
        Some(Value::Map(kwargs)) => kwargs.clone(),
        Some(_) => return Err(invalid(orig)),
    };
    Ok(Action::CallWithArgs {
        f: f.clone(),
        args,
        kwargs,
    })
}

fn invalid(v: &Value) -> anyhow::Error {
    log::trace!("rejecting action value: {v:?}");
    Error::InvalidActionKind(v.clone()).into()
}
