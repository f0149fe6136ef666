//! Collaborators consulted by capability resolvers.
//!
//! The dispatch core never talks to storage, the chat platform or the
//! ticketing backend directly. Resolvers reach them through the traits in this
//! module, bundled per process into a [`ServiceContext`] that every request
//! receives as an immutable snapshot.

mod clients;
mod memory;
mod shared;
mod templates;
mod token;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ticketbridge_config::Config;

pub use clients::{StaticClientFactory, UpstreamClient};
pub use memory::MemoryTenantRegistry;
pub use shared::SharedServiceContext;
pub use templates::{TemplateError, TemplateRegistry};
pub use token::HmacTokenVerifier;

/// Chat-platform account that issued the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Platform user identifier.
    pub user_id: String,
    /// Login name.
    pub username: String,
    /// Name shown in the chat client.
    pub display_name: String,
    /// Platform roles held by the account.
    pub roles: Vec<String>,
}

impl CallerIdentity {
    /// Builds an identity without any roles.
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            user_id: user_id.into(),
            display_name: username.clone(),
            username,
            roles: Vec::new(),
        }
    }

    /// Adds a role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Reports whether the identity carries `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|candidate| candidate == role)
    }
}

/// Deployment flavour of an upstream ticketing instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamKind {
    /// Hosted instance that authenticates requests with signed tokens.
    Cloud,
    /// Self-hosted instance.
    Server,
}

/// A configured ticketing backend instance (tenant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upstream {
    /// Stable identifier, usually the instance URL.
    pub key: String,
    /// Base URL of the instance.
    pub url: String,
    /// Deployment flavour.
    pub kind: UpstreamKind,
    /// Secret shared with the instance for signed-token verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_secret: Option<String>,
}

impl Upstream {
    /// Builds a cloud upstream whose key is its URL.
    pub fn cloud(url: impl Into<String>, shared_secret: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            key: url.clone(),
            url,
            kind: UpstreamKind::Cloud,
            shared_secret: Some(shared_secret.into()),
        }
    }

    /// Builds a server upstream whose key is its URL.
    pub fn server(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            key: url.clone(),
            url,
            kind: UpstreamKind::Server,
            shared_secret: None,
        }
    }
}

/// The caller's linked account on an upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendUser {
    /// Platform user the account is linked to.
    pub caller_id: String,
    /// Account identifier on the upstream.
    pub account_id: String,
    /// Name the upstream displays for the account.
    pub display_name: String,
    /// Per-account preferences.
    #[serde(default)]
    pub settings: UserSettings,
}

impl BackendUser {
    /// Builds a freshly linked account with notifications on.
    pub fn new(
        caller_id: impl Into<String>,
        account_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            caller_id: caller_id.into(),
            account_id: account_id.into(),
            display_name: display_name.into(),
            settings: UserSettings {
                notifications: true,
            },
        }
    }
}

/// Preferences a caller sets for their linked account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    /// Whether the caller receives direct-message notifications.
    pub notifications: bool,
}

/// Claims carried by an upstream's signed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer, the upstream's client key.
    pub iss: String,
    /// Subject, the upstream account the token was issued for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Query-string hash binding the token to a request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qsh: Option<String>,
    /// Expiry as seconds since the Unix epoch.
    pub exp: u64,
    /// Issue time as seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    /// Free-form context supplied by the upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

/// A verified signed token together with its raw form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken {
    /// Token exactly as received.
    pub raw: String,
    /// Verified claims.
    pub claims: Claims,
}

/// Authenticated client for one upstream account.
pub trait BackendClient: fmt::Debug + Send + Sync {
    /// Base URL requests are issued against.
    fn base_url(&self) -> &str;

    /// Account the client acts for.
    fn account_id(&self) -> &str;
}

/// Failures reported by collaborators.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No upstream has been selected as current.
    #[error("no upstream is configured")]
    NoCurrentUpstream,
    /// The named upstream is not known.
    #[error("unknown upstream '{0}'")]
    UnknownUpstream(String),
    /// The platform does not know the caller.
    #[error("unknown user '{0}'")]
    UnknownUser(String),
    /// The caller has not linked an account on the upstream.
    #[error("user '{caller_id}' is not connected to '{upstream}'")]
    NotConnected {
        /// Platform user identifier.
        caller_id: String,
        /// Upstream key.
        upstream: String,
    },
    /// The signed token uses an algorithm other than HMAC.
    #[error("unsupported signing method {0}")]
    UnsupportedAlgorithm(String),
    /// The signed token failed verification.
    #[error("invalid signed token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    /// A writer panicked while holding the store's lock.
    #[error("{store} lock poisoned")]
    Poisoned {
        /// Store whose lock was poisoned.
        store: &'static str,
    },
}

/// Tenant selection and account lookup.
pub trait TenantRegistry: Send + Sync {
    /// Loads the upstream requests are currently routed to.
    fn load_current_upstream(&self) -> Result<Upstream, ServiceError>;

    /// Lists every upstream the plugin knows about, ordered by key.
    fn load_known_upstreams(&self) -> Result<Vec<Upstream>, ServiceError>;

    /// Records `upstream`, replacing any upstream stored under the same key.
    fn store_upstream(&self, upstream: &Upstream) -> Result<(), ServiceError>;

    /// Routes later requests to the upstream stored under `key`.
    fn store_current_upstream(&self, key: &str) -> Result<Upstream, ServiceError>;

    /// Forgets the upstream stored under `key` along with every account
    /// linked on it. Clears the current selection when it pointed there.
    fn delete_upstream(&self, key: &str) -> Result<Upstream, ServiceError>;

    /// Loads the platform identity of a caller.
    fn load_identity(&self, caller_id: &str) -> Result<CallerIdentity, ServiceError>;

    /// Loads the caller's linked account on `upstream`.
    fn load_backend_user(
        &self,
        upstream: &Upstream,
        caller_id: &str,
    ) -> Result<BackendUser, ServiceError>;

    /// Persists the caller's notification preference.
    fn store_notification_setting(
        &self,
        upstream: &Upstream,
        caller_id: &str,
        enabled: bool,
    ) -> Result<(), ServiceError>;

    /// Removes the caller's linked account on `upstream`.
    fn delete_backend_user(&self, upstream: &Upstream, caller_id: &str)
    -> Result<(), ServiceError>;
}

/// Creates authenticated backend clients.
pub trait ClientFactory: Send + Sync {
    /// Builds a client acting for `user` on `upstream`.
    fn new_client(
        &self,
        upstream: &Upstream,
        user: &BackendUser,
    ) -> Result<Arc<dyn BackendClient>, ServiceError>;
}

/// Verifies signed tokens issued by an upstream.
pub trait TokenVerifier: Send + Sync {
    /// Verifies `raw` with `secret` and returns its claims.
    fn verify_signed_token(&self, raw: &str, secret: &str) -> Result<Claims, ServiceError>;
}

/// Collaborator handles supplied by the embedding process.
#[derive(Clone)]
pub struct Services {
    /// Tenant and account storage.
    pub registry: Arc<dyn TenantRegistry>,
    /// Backend client construction.
    pub clients: Arc<dyn ClientFactory>,
    /// Signed-token verification.
    pub verifier: Arc<dyn TokenVerifier>,
}

impl Services {
    /// Bundles collaborators.
    pub fn new(
        registry: Arc<dyn TenantRegistry>,
        clients: Arc<dyn ClientFactory>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            registry,
            clients,
            verifier,
        }
    }

    /// In-process collaborators backed by [`MemoryTenantRegistry`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryTenantRegistry::default()),
            Arc::new(StaticClientFactory),
            Arc::new(HmacTokenVerifier::default()),
        )
    }
}

/// Process-wide configuration and collaborators, read-only per request.
#[derive(Clone)]
pub struct ServiceContext {
    settings: Config,
    services: Services,
    templates: Arc<TemplateRegistry>,
}

impl ServiceContext {
    /// Assembles a context.
    pub fn new(settings: Config, services: Services, templates: Arc<TemplateRegistry>) -> Self {
        Self {
            settings,
            services,
            templates,
        }
    }

    /// Daemon configuration.
    #[must_use]
    pub fn settings(&self) -> &Config {
        &self.settings
    }

    /// Tenant and account storage.
    #[must_use]
    pub fn registry(&self) -> &Arc<dyn TenantRegistry> {
        &self.services.registry
    }

    /// Backend client construction.
    #[must_use]
    pub fn clients(&self) -> &Arc<dyn ClientFactory> {
        &self.services.clients
    }

    /// Signed-token verification.
    #[must_use]
    pub fn verifier(&self) -> &Arc<dyn TokenVerifier> {
        &self.services.verifier
    }

    /// Registered templates.
    #[must_use]
    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Returns a copy serving `templates`.
    #[must_use]
    pub fn with_templates(&self, templates: Arc<TemplateRegistry>) -> Self {
        Self {
            templates,
            ..self.clone()
        }
    }
}
