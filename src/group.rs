use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::engine::{NameKey, TaskDict, TaskRecord, Title};
use crate::{Error, Task};

/// Signature of group generators: each invocation starts a fresh lazy pass
/// over the group's items.
pub type GenFn = Arc<dyn Fn() -> Box<dyn Iterator<Item = GroupItem>> + Send + Sync>;

/// A named lazy generator of group items. As with [`crate::Callable`], the
/// name supplies the group's base name when none was given explicitly, and
/// the doc is borrowed by a group declaration without one of its own.
#[derive(Clone)]
pub struct Generator {
    name: String,
    doc: Option<String>,
    f: GenFn,
}

impl Generator {
    pub fn new<F, I>(name: impl Into<String>, gen: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: Iterator<Item = GroupItem> + 'static,
    {
        let f: GenFn = Arc::new(move || Box::new(gen()) as Box<dyn Iterator<Item = GroupItem>>);
        Self {
            name: name.into(),
            doc: None,
            f,
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

    // start a fresh pass over the generated items.
    fn items(&self) -> Box<dyn Iterator<Item = GroupItem>> {
        (self.f)()
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Generator({})", self.name)
    }
}

impl PartialEq for Generator {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.f, &other.f)
    }
}

/// One item yielded by a group generator.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupItem {
    /// pre-lowered mapping, passed through unchanged
    Dict(TaskDict),
    /// task declaration, lowered as a subtask
    Task(Task),
    /// nested group, flattened into the stream
    Group(TaskGroup),
}

impl From<TaskDict> for GroupItem {
    fn from(dict: TaskDict) -> Self {
        Self::Dict(dict)
    }
}

impl From<Task> for GroupItem {
    fn from(task: Task) -> Self {
        Self::Task(task)
    }
}

impl From<TaskGroup> for GroupItem {
    fn from(group: TaskGroup) -> Self {
        Self::Group(group)
    }
}

/// Where a group's subtasks come from. Only the lazy form survives
/// construction: consumers rely on receiving the group's placeholder entry
/// before any subtask is materialized, which an eagerly-built collection
/// cannot promise.
#[derive(Debug, Clone)]
pub enum SubtaskSource {
    /// lazy generator, re-invoked on every lowering pass
    Lazy(Generator),
    /// eagerly materialized items; rejected at construction
    Eager(Vec<GroupItem>),
}

impl From<Generator> for SubtaskSource {
    fn from(gen: Generator) -> Self {
        Self::Lazy(gen)
    }
}

impl From<Vec<GroupItem>> for SubtaskSource {
    fn from(items: Vec<GroupItem>) -> Self {
        Self::Eager(items)
    }
}

/// A family of related task declarations sharing a base name, doc and
/// title. Lowered with [`TaskGroup::to_engine_seq`] into the flat stream
/// of mappings the engine consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskGroup {
    basename: Option<String>,
    doc: Option<String>,
    title: Option<Title>,
    gen: Option<Generator>,
}

impl TaskGroup {
    /// Start declaring a task group.
    pub fn builder() -> TaskGroupBuilder {
        TaskGroupBuilder::default()
    }

    /// Declare a group straight from its generator, with everything else
    /// defaulted. Shorthand for `builder().attach(gen)`.
    pub fn from_generator(gen: Generator) -> Result<Self> {
        Self::builder().attach(gen)
    }

    /// The base name the engine will see: the explicit name when one was
    /// given, else the generator's identifier.
    pub fn resolved_name(&self) -> Result<&str> {
        let name = self
            .basename
            .as_deref()
            .or_else(|| self.gen.as_ref().map(Generator::name))
            .ok_or(Error::MissingTaskName)?;
        Ok(name)
    }

    // head entry registering the group's base metadata, emitted even when
    // the generator yields nothing.
    fn head_dict(&self) -> Result<TaskDict> {
        let name = self.resolved_name()?.to_owned();
        let mut dict = TaskDict::bare(NameKey::GroupHead(name));
        dict.doc = self
            .doc
            .as_deref()
            .or_else(|| self.gen.as_ref().and_then(Generator::doc))
            .map(str::to_owned);
        dict.title = self.title.clone();
        Ok(dict)
    }

    /// Lower this group into the flat lazy sequence the engine consumes:
    /// the placeholder head first, then one entry per generated item, with
    /// nested groups flattened in place. The generator is re-invoked on
    /// every call; the sequence is derived fresh each time, never cached.
    pub fn to_engine_seq(&self) -> Result<LoweredGroup> {
        let gen = self.gen.as_ref().ok_or(Error::MissingGenerator)?;
        log::debug!("lowering task group '{}'", self.resolved_name()?);
        Ok(LoweredGroup {
            pending: vec![self.head_dict()?],
            stack: vec![gen.items()],
        })
    }
}

/// Iterator over a group's lowered entries. Subtask declarations are
/// lowered one at a time, as the engine pulls them.
pub struct LoweredGroup {
    /// head entries ready to emit
    pending: Vec<TaskDict>,
    /// active generators, innermost last
    stack: Vec<Box<dyn Iterator<Item = GroupItem>>>,
}

impl Iterator for LoweredGroup {
    type Item = Result<TaskDict>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(head) = self.pending.pop() {
            return Some(Ok(head));
        }
        loop {
            let items = self.stack.last_mut()?;
            match items.next() {
                None => {
                    self.stack.pop();
                }
                Some(GroupItem::Dict(dict)) => return Some(Ok(dict)),
                Some(GroupItem::Task(task)) => return Some(task.to_engine_dict(true)),
                Some(GroupItem::Group(group)) => match group.to_engine_seq() {
                    // nested head first, then its items before ours resume:
                    Ok(mut sub) => {
                        self.stack.append(&mut sub.stack);
                        if let Some(head) = sub.pending.pop() {
                            return Some(Ok(head));
                        }
                    }
                    Err(e) => return Some(Err(e)),
                },
            }
        }
    }
}

/// Builder for [`TaskGroup`]. Finish with [`TaskGroupBuilder::attach`]
/// (the usual, generator-first path) or set a source explicitly and call
/// [`TaskGroupBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct TaskGroupBuilder {
    basename: Option<String>,
    doc: Option<String>,
    title: Option<Title>,
    source: Option<SubtaskSource>,
}

impl TaskGroupBuilder {
    /// Name the group explicitly instead of borrowing the generator's
    /// identifier.
    pub fn basename(mut self, name: impl Into<String>) -> Self {
        self.basename = Some(name.into());
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Fixed title text; the engine shows it as `"<group-name> => <text>"`.
    pub fn title(mut self, text: impl Into<String>) -> Self {
        self.title = Some(Title::Text(text.into()));
        self
    }

    /// Title callable, invoked with the live task record.
    pub fn title_fn(mut self, f: impl Fn(&TaskRecord) -> String + Send + Sync + 'static) -> Self {
        self.title = Some(Title::Call(Arc::new(f)));
        self
    }

    /// Where the group's subtasks come from.
    pub fn subtasks(mut self, source: impl Into<SubtaskSource>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach the generator and finish the declaration.
    pub fn attach(self, gen: Generator) -> Result<TaskGroup> {
        self.subtasks(gen).build()
    }

    /// Finish the declaration. Fails with [`Error::NotAGenerator`] if the
    /// subtask source is an eager collection; a group may be built without
    /// any source, but lowering it fails with [`Error::MissingGenerator`].
    pub fn build(self) -> Result<TaskGroup> {
        let gen = match self.source {
            None => None,
            Some(SubtaskSource::Lazy(gen)) => Some(gen),
            Some(SubtaskSource::Eager(_)) => return Err(Error::NotAGenerator.into()),
        };
        Ok(TaskGroup {
            basename: self.basename,
            doc: self.doc,
            title: self.title,
            gen,
        })
    }
}
