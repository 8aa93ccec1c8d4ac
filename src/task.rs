//! Highway identifiers, descriptors and nodes.
//!
//! A pipeline names its highways with a closed enum implementing [`TaskId`],
//! usually generated with the [`highways!`](crate::highways) macro. Each
//! registered identifier owns exactly one [`TaskNode`], which carries the
//! declared dependencies, the body and the memoized result of the current
//! invocation.

use std::cell::OnceCell;
use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::HighwayError;
use crate::invocation::Invocation;
use crate::registry::Registry;
use crate::ui::Ui;

/// Closed set of highway names for one pipeline.
///
/// Implementations are expected to be plain field-less enums, the
/// [`highways!`](crate::highways) macro writes one for you.
pub trait TaskId: Copy + Eq + Ord + Hash + Debug + 'static {
    /// Every identifier of the pipeline, in declaration order.
    const ALL: &'static [Self];

    /// Raw name used on the command line and in the manifest.
    fn name(&self) -> &'static str;

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.name() == name)
    }
}

/// Declares a highway identifier enum together with its [`TaskId`] impl.
///
/// ```rust
/// highway::highways! {
///     pub enum Lane {
///         Build => "build",
///         Test => "test",
///     }
/// }
///
/// use highway::TaskId;
/// assert_eq!(Lane::Test.name(), "test");
/// assert_eq!(Lane::from_name("build"), Some(Lane::Build));
/// ```
#[macro_export]
macro_rules! highways {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $raw:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis enum $name {
            $($variant),*
        }

        impl $crate::TaskId for $name {
            const ALL: &'static [Self] = &[$($name::$variant),*];

            fn name(&self) -> &'static str {
                match *self {
                    $($name::$variant => $raw),*
                }
            }
        }
    };
}

/// Read-only metadata of a highway, used for help output and the manifest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub name: String,
    pub usage: Option<String>,
}

impl TaskDescriptor {
    pub fn new(name: impl Into<String>, usage: Option<&str>) -> Self {
        Self {
            name: name.into(),
            usage: usage.map(str::to_string),
        }
    }
}

/// Unit of work attached to a highway. Returning `None` means the highway
/// produced no result worth keeping.
pub type Body<T, R> = Box<dyn Fn(&TaskContext<'_, T, R>) -> anyhow::Result<Option<R>>>;

/// The context passed to every highway body.
///
/// It is shared by all bodies of one invocation and never changes while the
/// invocation is running, apart from results of finished highways becoming
/// visible through [`TaskContext::result`].
pub struct TaskContext<'a, T: TaskId, R = ()> {
    /// The command line request that started this run.
    pub invocation: &'a Invocation,
    /// Output sink for user facing messages.
    pub ui: &'a dyn Ui,
    pub(crate) registry: &'a Registry<T, R>,
    /// Tracing span assigned to the running highway.
    pub(crate) span: tracing::Span,
}

impl<'a, T: TaskId, R> TaskContext<'a, T, R> {
    pub(crate) fn new(invocation: &'a Invocation, ui: &'a dyn Ui, registry: &'a Registry<T, R>) -> Self {
        Self {
            invocation,
            ui,
            registry,
            span: tracing::Span::none(),
        }
    }

    pub(crate) fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Result of a highway that already ran during this invocation.
    pub fn result(&self, id: T) -> Option<&'a R> {
        self.registry.get(id)?.result()
    }

    pub fn verbose(&self) -> bool {
        self.invocation.verbose
    }

    pub fn arguments(&self) -> &'a [String] {
        &self.invocation.arguments
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}

/// A single highway in the registry.
pub struct TaskNode<T: TaskId, R = ()> {
    id: T,
    usage: Option<String>,
    dependencies: Vec<T>,
    body: Option<Body<T, R>>,
    result: OnceCell<Option<R>>,
}

impl<T: TaskId, R> TaskNode<T, R> {
    pub(crate) fn new(id: T, usage: Option<&str>) -> Self {
        Self {
            id,
            usage: usage.map(str::to_string),
            dependencies: Vec::new(),
            body: None,
            result: OnceCell::new(),
        }
    }

    pub fn id(&self) -> T {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    pub fn dependencies(&self) -> &[T] {
        &self.dependencies
    }

    pub fn descriptor(&self) -> TaskDescriptor {
        TaskDescriptor::new(self.id.name(), self.usage.as_deref())
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Replaces the dependency list. Declared order is kept and decides the
    /// order in which independent dependencies run.
    pub fn depends(&mut self, on: impl IntoIterator<Item = T>) -> &mut Self {
        self.dependencies = on.into_iter().collect();
        self
    }

    pub fn usage(&mut self, text: impl Into<String>) -> &mut Self {
        self.usage = Some(text.into());
        self
    }

    /// Attaches the body of this highway.
    ///
    /// The callback may return an `R` directly, or an `Option<R>` when the
    /// result is conditional.
    pub fn run<F, O>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&TaskContext<'_, T, R>) -> anyhow::Result<O> + 'static,
        O: Into<Option<R>> + 'static,
        R: 'static,
    {
        self.body = Some(Box::new(move |ctx: &TaskContext<'_, T, R>| {
            callback(ctx).map(Into::into)
        }));
        self
    }

    /// Runs the body at most once per invocation.
    ///
    /// Later calls return the memoized result without touching the body. A
    /// node without a body finishes immediately with no result.
    pub fn invoke(&self, ctx: &TaskContext<'_, T, R>) -> Result<Option<&R>, HighwayError> {
        if let Some(done) = self.result.get() {
            return Ok(done.as_ref());
        }

        let output = match &self.body {
            Some(body) => body(ctx).map_err(|source| HighwayError::TaskExecution {
                task: self.id.name().to_string(),
                source,
            })?,
            None => None,
        };

        Ok(self.result.get_or_init(|| output).as_ref())
    }

    pub fn is_done(&self) -> bool {
        self.result.get().is_some()
    }

    pub fn result(&self) -> Option<&R> {
        self.result.get().and_then(Option::as_ref)
    }

    pub(crate) fn reset(&mut self) {
        self.result.take();
    }
}

impl<T: TaskId, R> Debug for TaskNode<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskNode")
            .field("id", &self.id)
            .field("usage", &self.usage)
            .field("dependencies", &self.dependencies)
            .field("body", &self.body.as_ref().map(|_| "*"))
            .field("done", &self.is_done())
            .finish()
    }
}
