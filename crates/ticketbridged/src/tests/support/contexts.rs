//! Service contexts and actions seeded with a small tenant.
//!
//! The seeded registry holds one cloud upstream at [`UPSTREAM_URL`] and two
//! callers: `u1` (alice, a system administrator linked to `acc-1`) and `u2`
//! (bob, not linked). `ghost` is unknown to the platform.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use http::{Method, Request};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};

use ticketbridge_config::{Config, DEFAULT_ADMIN_ROLE};

use crate::bridge::BridgeConnectionHandler;
use crate::dispatch::Router;
use crate::routes::{command_router, http_router};
use crate::services::{
    BackendUser, CallerIdentity, Claims, HmacTokenVerifier, MemoryTenantRegistry, ServiceContext,
    Services, SharedServiceContext, StaticClientFactory, TemplateRegistry, TenantRegistry,
    Upstream,
};
use crate::transport::command::{CommandArgs, CommandResponse, CommandSurface};
use crate::transport::http::{CALLER_ID_HEADER, HttpAction, HttpSurface};

/// URL of the seeded upstream.
pub const UPSTREAM_URL: &str = "https://acme.atlassian.net";
/// Shared secret of the seeded upstream.
pub const SECRET: &str = "shared-secret";

/// Context with default settings and an empty registry.
pub fn service_context() -> Arc<ServiceContext> {
    Arc::new(ServiceContext::new(
        Config::default(),
        Services::in_memory(),
        Arc::new(TemplateRegistry::builtin()),
    ))
}

/// Production collaborators around `registry`.
pub fn services_with_registry(registry: Arc<dyn TenantRegistry>) -> Services {
    Services::new(
        registry,
        Arc::new(StaticClientFactory),
        Arc::new(HmacTokenVerifier::default()),
    )
}

/// Context whose registry is `registry`.
pub fn context_with_registry(registry: Arc<dyn TenantRegistry>) -> Arc<ServiceContext> {
    Arc::new(ServiceContext::new(
        Config::default(),
        services_with_registry(registry),
        Arc::new(TemplateRegistry::builtin()),
    ))
}

/// Registry holding the seeded tenant.
pub fn seeded_registry() -> Arc<MemoryTenantRegistry> {
    let registry = MemoryTenantRegistry::default();
    registry.add_upstream(Upstream::cloud(UPSTREAM_URL, SECRET));
    registry.add_identity(CallerIdentity::new("u1", "alice").with_role(DEFAULT_ADMIN_ROLE));
    registry.add_identity(CallerIdentity::new("u2", "bob"));
    registry.connect(UPSTREAM_URL, BackendUser::new("u1", "acc-1", "Alice Backend"));
    Arc::new(registry)
}

/// Context backed by the seeded registry.
pub fn seeded_context() -> Arc<ServiceContext> {
    context_with_registry(seeded_registry())
}

/// Shared, hot-swappable wrapper around a fresh [`seeded_context`].
pub fn seeded_services() -> Arc<SharedServiceContext> {
    let context = Arc::unwrap_or_clone(seeded_context());
    Arc::new(SharedServiceContext::new(context))
}

/// Token signed with `secret` for the seeded upstream.
pub fn sign_token(secret: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_secs();
    let claims = Claims {
        iss: "ticketbridge-test".to_owned(),
        sub: Some("Alice Backend".to_owned()),
        qsh: None,
        exp: now + 3600,
        iat: Some(now),
        context: None,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("token should encode")
}

fn request(method: Method, path_and_query: &str, caller_id: Option<&str>) -> Request<Vec<u8>> {
    let mut builder = Request::builder().method(method).uri(path_and_query);
    if let Some(caller_id) = caller_id {
        builder = builder.header(CALLER_ID_HEADER, caller_id);
    }
    builder.body(Vec::new()).expect("request should build")
}

/// HTTP action against [`service_context`] without a caller.
pub fn http_action(method: Method, path_and_query: &str) -> HttpAction {
    HttpAction::new(service_context(), request(method, path_and_query, None))
}

/// HTTP action against [`seeded_context`].
pub fn seeded_http(method: Method, path_and_query: &str, caller_id: Option<&str>) -> HttpAction {
    HttpAction::new(seeded_context(), request(method, path_and_query, caller_id))
}

/// Runs `command` for `caller_id` through `router` against a seeded context.
pub fn seeded_command(router: Router, caller_id: &str, command: &str) -> CommandResponse {
    let surface = CommandSurface::new(Arc::new(router), seeded_services());
    surface.handle(CommandArgs {
        user_id: caller_id.to_owned(),
        channel_id: "c1".to_owned(),
        command: command.to_owned(),
    })
}

/// Runs `command` for `caller_id` through `router` against `registry`.
pub fn command_with_registry(
    router: Router,
    registry: Arc<dyn TenantRegistry>,
    caller_id: &str,
    command: &str,
) -> CommandResponse {
    let context = Arc::unwrap_or_clone(context_with_registry(registry));
    let surface = CommandSurface::new(
        Arc::new(router),
        Arc::new(SharedServiceContext::new(context)),
    );
    surface.handle(CommandArgs {
        user_id: caller_id.to_owned(),
        channel_id: "c1".to_owned(),
        command: command.to_owned(),
    })
}

/// Bridge handler serving both route tables against a seeded context.
pub fn bridge_handler() -> BridgeConnectionHandler {
    let services = seeded_services();
    BridgeConnectionHandler::new(
        HttpSurface::new(Arc::new(http_router()), Arc::clone(&services)),
        CommandSurface::new(Arc::new(command_router()), services),
    )
}
