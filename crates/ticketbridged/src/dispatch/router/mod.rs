//! Route-key resolution and pipeline execution.
//!
//! Keys are `/`-separated paths. Resolution tries, in order: the exact key,
//! the key's own wildcard (`key/*`), the wildcard of each ancestor from the
//! nearest outwards, and finally the default route. Commands use the same
//! keys with their tokens joined by `/`.

use std::collections::HashMap;
use std::sync::Arc;

use http::StatusCode;
use tracing::{debug, debug_span, warn};

use super::{Action, ActionError, Route, Script};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

const WILDCARD: &str = "/*";

/// Outcome of resolving a route key.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Route table key that matched, `None` for the default route.
    pub matched: Option<String>,
    /// Route to run.
    pub route: Arc<Route>,
}

/// Immutable dispatch table.
#[derive(Debug)]
pub struct Router {
    routes: HashMap<String, Arc<Route>>,
    before: Option<Script>,
    after: Option<Script>,
    default_route: Arc<Route>,
}

impl Router {
    /// Starts building a router.
    #[must_use]
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Exact-match lookup without wildcard fallback.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&Arc<Route>> {
        self.routes.get(key)
    }

    /// Resolves `key` to the route that handles it.
    #[must_use]
    pub fn resolve(&self, key: &str) -> Resolution {
        let key = key.trim_end_matches('/');
        self.find(key)
            .or_else(|| self.find(&format!("{key}{WILDCARD}")))
            .or_else(|| self.find_ancestor_wildcard(key))
            .unwrap_or_else(|| Resolution {
                matched: None,
                route: Arc::clone(&self.default_route),
            })
    }

    /// Runs Before, the resolved route's script, then After.
    ///
    /// A Before failure skips the route script. Errors are recorded on the
    /// request context; After always runs and its own errors are only
    /// logged.
    pub fn dispatch(&self, key: &str, action: &mut dyn Action) {
        let resolution = self.resolve(key);
        let span = debug_span!(
            target: DISPATCH_TARGET,
            "dispatch",
            key,
            matched = resolution.matched.as_deref().unwrap_or("<default>")
        );
        let _entered = span.enter();

        let outcome = match self.before.as_ref().map(|before| before.run(action)) {
            Some(Err(error)) => {
                debug!(target: DISPATCH_TARGET, %error, "before script rejected request");
                Err(error)
            }
            _ => resolution.route.script().run(action),
        };
        if let Err(error) = outcome {
            action.context_mut().record_error(error);
        }

        if let Some(after) = &self.after
            && let Err(error) = after.run(action)
        {
            warn!(target: DISPATCH_TARGET, %error, "after script failed");
        }
    }

    fn find(&self, key: &str) -> Option<Resolution> {
        self.routes.get(key).map(|route| Resolution {
            matched: Some(key.to_owned()),
            route: Arc::clone(route),
        })
    }

    fn find_ancestor_wildcard(&self, key: &str) -> Option<Resolution> {
        let mut remaining = key;
        while let Some((parent, _)) = remaining.rsplit_once('/') {
            if let Some(found) = self.find(&format!("{parent}{WILDCARD}")) {
                return Some(found);
            }
            remaining = parent;
        }
        None
    }
}

/// Builder for [`Router`].
#[derive(Debug, Default)]
pub struct RouterBuilder {
    routes: HashMap<String, Arc<Route>>,
    before: Option<Script>,
    after: Option<Script>,
    default_route: Option<Route>,
}

impl RouterBuilder {
    /// Adds or replaces a route.
    #[must_use]
    pub fn add_route(mut self, key: impl Into<String>, route: Route) -> Self {
        self.routes.insert(key.into(), Arc::new(route));
        self
    }

    /// Adds or replaces several routes.
    #[must_use]
    pub fn add_routes<I, K>(self, routes: I) -> Self
    where
        I: IntoIterator<Item = (K, Route)>,
        K: Into<String>,
    {
        routes
            .into_iter()
            .fold(self, |builder, (key, route)| builder.add_route(key, route))
    }

    /// Sets the script run before every route.
    #[must_use]
    pub fn before(mut self, script: Script) -> Self {
        self.before = Some(script);
        self
    }

    /// Sets the script run after every route.
    #[must_use]
    pub fn after(mut self, script: Script) -> Self {
        self.after = Some(script);
        self
    }

    /// Sets the route used when nothing else matches.
    #[must_use]
    pub fn default_route(mut self, route: Route) -> Self {
        self.default_route = Some(route);
        self
    }

    /// Finishes the router. Without an explicit default route, unmatched
    /// keys respond `404 not found`.
    #[must_use]
    pub fn build(self) -> Router {
        let default_route = self
            .default_route
            .unwrap_or_else(|| Route::new(Script::of(&[respond_not_found])));
        Router {
            routes: self.routes,
            before: self.before,
            after: self.after,
            default_route: Arc::new(default_route),
        }
    }
}

/// Responds `404 not found`.
pub fn respond_not_found(action: &mut dyn Action) -> Result<(), ActionError> {
    Err(action.respond_error(ActionError::new(StatusCode::NOT_FOUND, "not found")))
}

#[cfg(test)]
mod tests;
