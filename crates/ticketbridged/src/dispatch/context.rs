//! Per-request state shared by every step of a pipeline.
//!
//! Capability cells start empty and are filled at most once by their
//! resolver. Setting a cell twice means two resolvers disagree about who owns
//! a capability, which is reported as a misconfiguration instead of silently
//! replacing the earlier value.

use std::sync::Arc;

use once_cell::unsync::OnceCell;

use crate::services::{
    BackendClient, BackendUser, CallerIdentity, ServiceContext, SignedToken, Upstream,
};

use super::ActionError;

/// Mutable state owned by one in-flight request.
pub struct RequestContext {
    config: Arc<ServiceContext>,
    caller_id: Option<String>,
    identity: OnceCell<CallerIdentity>,
    upstream: OnceCell<Upstream>,
    backend_user: OnceCell<BackendUser>,
    backend_client: OnceCell<Arc<dyn BackendClient>>,
    signed_token: OnceCell<SignedToken>,
    last_error: Option<ActionError>,
}

fn set_once<T>(cell: &OnceCell<T>, value: T, capability: &str) -> Result<(), ActionError> {
    cell.set(value)
        .map_err(|_| ActionError::misconfiguration(format!("{capability} already resolved")))
}

impl RequestContext {
    /// Starts a request against a configuration snapshot.
    pub fn new(config: Arc<ServiceContext>) -> Self {
        Self {
            config,
            caller_id: None,
            identity: OnceCell::new(),
            upstream: OnceCell::new(),
            backend_user: OnceCell::new(),
            backend_client: OnceCell::new(),
            signed_token: OnceCell::new(),
            last_error: None,
        }
    }

    /// Attaches the caller identifier reported by the transport.
    #[must_use]
    pub fn with_caller_id(mut self, caller_id: impl Into<String>) -> Self {
        self.set_caller_id(caller_id);
        self
    }

    /// Records the caller identifier; empty identifiers count as absent.
    pub fn set_caller_id(&mut self, caller_id: impl Into<String>) {
        let caller_id = caller_id.into();
        self.caller_id = (!caller_id.is_empty()).then_some(caller_id);
    }

    /// Configuration snapshot the request runs against.
    #[must_use]
    pub fn config(&self) -> &Arc<ServiceContext> {
        &self.config
    }

    /// Caller identifier, when the transport supplied one.
    #[must_use]
    pub fn caller_id(&self) -> Option<&str> {
        self.caller_id.as_deref()
    }

    /// Resolved platform identity.
    #[must_use]
    pub fn identity(&self) -> Option<&CallerIdentity> {
        self.identity.get()
    }

    /// Stores the platform identity.
    pub fn set_identity(&mut self, identity: CallerIdentity) -> Result<(), ActionError> {
        set_once(&self.identity, identity, "caller identity")
    }

    /// Resolved upstream.
    #[must_use]
    pub fn upstream(&self) -> Option<&Upstream> {
        self.upstream.get()
    }

    /// Stores the upstream.
    pub fn set_upstream(&mut self, upstream: Upstream) -> Result<(), ActionError> {
        set_once(&self.upstream, upstream, "upstream")
    }

    /// Resolved linked account.
    #[must_use]
    pub fn backend_user(&self) -> Option<&BackendUser> {
        self.backend_user.get()
    }

    /// Stores the linked account.
    pub fn set_backend_user(&mut self, user: BackendUser) -> Result<(), ActionError> {
        set_once(&self.backend_user, user, "backend user")
    }

    /// Resolved backend client.
    #[must_use]
    pub fn backend_client(&self) -> Option<&Arc<dyn BackendClient>> {
        self.backend_client.get()
    }

    /// Stores the backend client.
    pub fn set_backend_client(&mut self, client: Arc<dyn BackendClient>) -> Result<(), ActionError> {
        set_once(&self.backend_client, client, "backend client")
    }

    /// Verified signed token.
    #[must_use]
    pub fn signed_token(&self) -> Option<&SignedToken> {
        self.signed_token.get()
    }

    /// Stores the verified signed token.
    pub fn set_signed_token(&mut self, token: SignedToken) -> Result<(), ActionError> {
        set_once(&self.signed_token, token, "signed token")
    }

    /// Most recent error recorded by the router.
    #[must_use]
    pub fn last_error(&self) -> Option<&ActionError> {
        self.last_error.as_ref()
    }

    /// Records a pipeline error for the After script.
    pub fn record_error(&mut self, error: ActionError) {
        self.last_error = Some(error);
    }
}
