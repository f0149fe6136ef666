//! Routes and the metadata attached to them.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::Script;

/// A script plus optional metadata the transport adapter interprets.
#[derive(Clone)]
pub struct Route {
    script: Script,
    metadata: Option<Arc<dyn Any + Send + Sync>>,
}

impl Route {
    /// Builds a route without metadata.
    #[must_use]
    pub fn new(script: Script) -> Self {
        Self {
            script,
            metadata: None,
        }
    }

    /// Attaches metadata, replacing any earlier value.
    #[must_use]
    pub fn with<M>(mut self, metadata: M) -> Self
    where
        M: Any + Send + Sync,
    {
        self.metadata = Some(Arc::new(metadata));
        self
    }

    /// Script the router runs for this route.
    #[must_use]
    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Reports whether metadata of any type is attached.
    #[must_use]
    pub fn has_metadata(&self) -> bool {
        self.metadata.is_some()
    }

    /// Metadata of type `M`, or `None` when absent or of another type.
    #[must_use]
    pub fn metadata<M: Any>(&self) -> Option<&M> {
        self.metadata.as_deref()?.downcast_ref::<M>()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Route")
            .field("steps", &self.script.len())
            .field("has_metadata", &self.has_metadata())
            .finish()
    }
}

/// Argument rules for slash-command routes.
///
/// Negative bounds are unbounded. Routes without metadata accept no
/// arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandMetadata {
    /// Fewest arguments accepted after the route key.
    pub min_args: i32,
    /// Most arguments accepted after the route key.
    pub max_args: i32,
    /// Names bound to positional arguments, in order.
    pub arg_names: Vec<String>,
}

impl CommandMetadata {
    /// Builds metadata with argument bounds.
    #[must_use]
    pub fn new(min_args: i32, max_args: i32) -> Self {
        Self {
            min_args,
            max_args,
            arg_names: Vec::new(),
        }
    }

    /// Names the positional arguments.
    #[must_use]
    pub fn with_arg_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arg_names = names.into_iter().map(Into::into).collect();
        self
    }
}
