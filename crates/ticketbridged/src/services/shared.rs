use std::sync::Arc;

use arc_swap::ArcSwap;
use camino::Utf8Path;

use super::{ServiceContext, TemplateError, TemplateRegistry};

/// Atomically replaceable [`ServiceContext`].
///
/// Each request takes one [`snapshot`](Self::snapshot) when it starts and uses
/// it until it completes, so a concurrent [`update`](Self::update) never
/// mixes old and new state within a request.
pub struct SharedServiceContext {
    current: ArcSwap<ServiceContext>,
}

impl SharedServiceContext {
    /// Wraps the initial context.
    pub fn new(context: ServiceContext) -> Self {
        Self {
            current: ArcSwap::from_pointee(context),
        }
    }

    /// Returns the context in effect now.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ServiceContext> {
        self.current.load_full()
    }

    /// Derives a new context from the current one and installs it.
    pub fn update<F>(&self, derive: F)
    where
        F: Fn(&ServiceContext) -> ServiceContext,
    {
        self.current.rcu(|current| Arc::new(derive(current)));
    }

    /// Reloads templates from `dir` on top of the built-ins.
    ///
    /// On failure the templates in effect are kept.
    pub fn reload_templates(&self, dir: Option<&Utf8Path>) -> Result<(), TemplateError> {
        let templates = Arc::new(TemplateRegistry::load(dir)?);
        self.update(|current| current.with_templates(Arc::clone(&templates)));
        Ok(())
    }
}
