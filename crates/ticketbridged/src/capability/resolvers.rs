//! Resolvers for the request capabilities.

use std::sync::Arc;

use http::StatusCode;
use tracing::debug;

use crate::dispatch::{Action, ActionError, run_prerequisites};
use crate::services::SignedToken;

use super::CAPABILITY_TARGET;

fn internal<E>(error: E) -> ActionError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ActionError::from_source(StatusCode::INTERNAL_SERVER_ERROR, error)
}

/// Requires the transport to have reported a caller.
pub fn require_caller_id(action: &mut dyn Action) -> Result<(), ActionError> {
    if action.context().caller_id().is_some() {
        return Ok(());
    }
    Err(action.respond_error(ActionError::unauthorized("not authorized")))
}

/// Resolves the caller's platform identity.
pub fn require_caller_identity(action: &mut dyn Action) -> Result<(), ActionError> {
    if action.context().identity().is_some() {
        return Ok(());
    }
    run_prerequisites(action, &[require_caller_id])?;

    let config = Arc::clone(action.context().config());
    let caller_id = action.context().caller_id().unwrap_or_default().to_owned();
    let identity = config.registry().load_identity(&caller_id).map_err(|error| {
        action.respond_error(
            internal(error).context(format!("failed to load caller identity {caller_id:?}")),
        )
    })?;
    debug!(
        target: CAPABILITY_TARGET,
        username = identity.username.as_str(),
        "loaded caller identity"
    );
    action
        .context_mut()
        .set_identity(identity)
        .map_err(|error| action.respond_error(error))
}

/// Requires the caller to hold the configured administrator role.
pub fn require_sys_admin(action: &mut dyn Action) -> Result<(), ActionError> {
    run_prerequisites(action, &[require_caller_identity])?;

    let context = action.context();
    let admin_role = context.config().settings().admin_role.as_str();
    let is_admin = context
        .identity()
        .is_some_and(|identity| identity.has_role(admin_role));
    if is_admin {
        return Ok(());
    }
    Err(action.respond_error(ActionError::unauthorized(
        "reserved for system administrators",
    )))
}

/// Resolves the upstream requests are currently routed to.
pub fn require_upstream(action: &mut dyn Action) -> Result<(), ActionError> {
    if action.context().upstream().is_some() {
        return Ok(());
    }

    let config = Arc::clone(action.context().config());
    let upstream = config
        .registry()
        .load_current_upstream()
        .map_err(|error| action.respond_error(internal(error)))?;
    debug!(target: CAPABILITY_TARGET, upstream = upstream.key.as_str(), "loaded upstream");
    action
        .context_mut()
        .set_upstream(upstream)
        .map_err(|error| action.respond_error(error))
}

/// Resolves the caller's linked account on the current upstream.
pub fn require_backend_user(action: &mut dyn Action) -> Result<(), ActionError> {
    if action.context().backend_user().is_some() {
        return Ok(());
    }
    run_prerequisites(action, &[require_caller_id, require_upstream])?;

    let context = action.context();
    let config = Arc::clone(context.config());
    let caller_id = context.caller_id().unwrap_or_default().to_owned();
    let Some(upstream) = context.upstream().cloned() else {
        return Err(action.respond_error(ActionError::misconfiguration("upstream not resolved")));
    };
    let user = config
        .registry()
        .load_backend_user(&upstream, &caller_id)
        .map_err(|error| {
            action.respond_error(ActionError::from_source(StatusCode::UNAUTHORIZED, error))
        })?;
    debug!(
        target: CAPABILITY_TARGET,
        display_name = user.display_name.as_str(),
        "loaded backend user"
    );
    action
        .context_mut()
        .set_backend_user(user)
        .map_err(|error| action.respond_error(error))
}

/// Builds a client acting for the caller's linked account.
pub fn require_backend_client(action: &mut dyn Action) -> Result<(), ActionError> {
    if action.context().backend_client().is_some() {
        return Ok(());
    }
    run_prerequisites(action, &[require_upstream, require_backend_user])?;

    let context = action.context();
    let config = Arc::clone(context.config());
    let (Some(upstream), Some(user)) = (
        context.upstream().cloned(),
        context.backend_user().cloned(),
    ) else {
        return Err(action.respond_error(ActionError::misconfiguration(
            "backend user not resolved",
        )));
    };
    let client = config
        .clients()
        .new_client(&upstream, &user)
        .map_err(|error| action.respond_error(internal(error)))?;
    debug!(
        target: CAPABILITY_TARGET,
        display_name = user.display_name.as_str(),
        "loaded backend client"
    );
    action
        .context_mut()
        .set_backend_client(client)
        .map_err(|error| action.respond_error(error))
}

/// Verifies the `jwt` input against the upstream's shared secret.
pub fn require_signed_token(action: &mut dyn Action) -> Result<(), ActionError> {
    if action.context().signed_token().is_some() {
        return Ok(());
    }
    run_prerequisites(action, &[require_upstream])?;

    let Some(raw) = action
        .form_value("jwt")
        .filter(|raw| !raw.is_empty())
        .map(str::to_owned)
    else {
        return Err(action.respond_error(ActionError::bad_request(
            "no jwt found in the HTTP request",
        )));
    };

    let context = action.context();
    let config = Arc::clone(context.config());
    let Some(upstream) = context.upstream().cloned() else {
        return Err(action.respond_error(ActionError::misconfiguration("upstream not resolved")));
    };
    let Some(secret) = upstream.shared_secret.as_deref() else {
        return Err(action.respond_error(ActionError::internal(format!(
            "upstream {:?} has no shared secret",
            upstream.key
        ))));
    };
    let claims = config
        .verifier()
        .verify_signed_token(&raw, secret)
        .map_err(|error| {
            action.respond_error(
                ActionError::from_source(StatusCode::UNAUTHORIZED, error)
                    .context("failed to validate JWT"),
            )
        })?;
    debug!(target: CAPABILITY_TARGET, issuer = claims.iss.as_str(), "verified signed token");
    action
        .context_mut()
        .set_signed_token(SignedToken { raw, claims })
        .map_err(|error| action.respond_error(error))
}
