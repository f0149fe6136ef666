//! Slash-command routes.

use std::sync::Arc;

use http::StatusCode;

use crate::capability::{
    require_backend_client, require_backend_user, require_caller_id, require_command_action,
    require_sys_admin, require_upstream,
};
use crate::dispatch::{Action, ActionError, CommandMetadata, Route, Router, Script};
use crate::services::{ServiceError, TenantRegistry, Upstream, UpstreamKind};
use crate::transport::command::log_command_action;

use super::normalize_url;

/// Links the caller's account.
pub const ROUTE_CONNECT: &str = "connect";
/// Unlinks the caller's account.
pub const ROUTE_DISCONNECT: &str = "disconnect";
/// Turns notifications on or off.
pub const ROUTE_NOTIFICATIONS: &str = "settings/notifications";
/// Lists known upstreams; administrators only.
pub const ROUTE_UPSTREAM_LIST: &str = "upstream/list";
/// Picks the upstream requests are routed to; administrators only.
pub const ROUTE_UPSTREAM_SELECT: &str = "upstream/select";
/// Registers a cloud upstream; administrators only.
pub const ROUTE_INSTALL_CLOUD: &str = "install/cloud";
/// Registers a server upstream; administrators only.
pub const ROUTE_INSTALL_SERVER: &str = "install/server";
/// Removes the current upstream; administrators only.
pub const ROUTE_UNINSTALL: &str = "uninstall";

const HELP: &[(&str, &str)] = &[
    ("connect", "Link your chat account with your ticketing account"),
    ("disconnect", "Unlink your chat account from your ticketing account"),
    ("settings notifications [on|off]", "Turn notifications on or off"),
    ("install cloud <URL>", "Connect to the cloud instance at <URL> (system administrators)"),
    ("install server <URL>", "Connect to the server instance at <URL> (system administrators)"),
    ("uninstall <cloud|server> <URL>", "Disconnect from the current instance (system administrators)"),
    ("upstream list", "List the known ticketing instances (system administrators)"),
    ("upstream select <number|URL>", "Route requests to another instance (system administrators)"),
];

/// Builds the router for slash commands. Unknown commands get the help text.
#[must_use]
pub fn command_router() -> Router {
    Router::builder()
        .before(Script::of(&[require_command_action]))
        .after(Script::of(&[log_command_action]))
        .add_routes([
            (
                ROUTE_CONNECT,
                Route::new(Script::of(&[require_caller_id, require_upstream, connect])),
            ),
            (
                ROUTE_DISCONNECT,
                Route::new(Script::of(&[require_backend_user, disconnect])),
            ),
            (
                ROUTE_NOTIFICATIONS,
                Route::new(Script::of(&[require_backend_client, notifications]))
                    .with(CommandMetadata::new(1, 1).with_arg_names(["value"])),
            ),
            (
                ROUTE_UPSTREAM_LIST,
                Route::new(Script::of(&[require_sys_admin, list_upstreams])),
            ),
            (
                ROUTE_UPSTREAM_SELECT,
                Route::new(Script::of(&[require_sys_admin, select_upstream]))
                    .with(CommandMetadata::new(1, 1).with_arg_names(["key"])),
            ),
            (
                ROUTE_INSTALL_CLOUD,
                Route::new(Script::of(&[require_sys_admin, install_cloud]))
                    .with(CommandMetadata::new(1, 1).with_arg_names(["key"])),
            ),
            (
                ROUTE_INSTALL_SERVER,
                Route::new(Script::of(&[require_sys_admin, install_server]))
                    .with(CommandMetadata::new(1, 1).with_arg_names(["key"])),
            ),
            (
                ROUTE_UNINSTALL,
                Route::new(Script::of(&[require_upstream, require_sys_admin, uninstall]))
                    .with(CommandMetadata::new(2, 2).with_arg_names(["type", "key"])),
            ),
        ])
        .default_route(Route::new(Script::of(&[help])))
        .build()
}

fn help(action: &mut dyn Action) -> Result<(), ActionError> {
    let trigger = action.context().config().settings().command_trigger();
    let mut text = String::from("###### Ticketing slash commands\n");
    for (usage, summary) in HELP {
        text.push_str(&format!("* `{trigger} {usage}` - {summary}\n"));
    }
    action.respond_text(&text)
}

fn connect(action: &mut dyn Action) -> Result<(), ActionError> {
    let plugin_url = action.context().config().settings().plugin_url();
    action.respond_text(&format!(
        "[Click here to link your ticketing account]({plugin_url}/user/connect)"
    ))
}

fn disconnect(action: &mut dyn Action) -> Result<(), ActionError> {
    let context = action.context();
    let outcome = match (context.upstream(), context.backend_user()) {
        (Some(upstream), Some(user)) => context
            .config()
            .registry()
            .delete_backend_user(upstream, &user.caller_id)
            .map(|()| user.display_name.clone())
            .map_err(|error| ActionError::from_source(StatusCode::INTERNAL_SERVER_ERROR, error)),
        _ => Err(ActionError::misconfiguration("backend user required")),
    };
    match outcome {
        Ok(display_name) => action.respond_text(&format!(
            "You have successfully disconnected your ticketing account (**{display_name}**)."
        )),
        Err(error) => Err(action.respond_error(error)),
    }
}

fn notifications(action: &mut dyn Action) -> Result<(), ActionError> {
    let enabled = match action.form_value("value") {
        Some("on") => true,
        Some("off") => false,
        other => {
            let error = ActionError::bad_request(format!(
                "unrecognised value {:?}, expected \"on\" or \"off\"",
                other.unwrap_or_default()
            ));
            return Err(action.respond_error(error));
        }
    };
    let context = action.context();
    let stored = match (context.upstream(), context.caller_id()) {
        (Some(upstream), Some(caller_id)) => context
            .config()
            .registry()
            .store_notification_setting(upstream, caller_id, enabled)
            .map_err(|error| ActionError::from_source(StatusCode::INTERNAL_SERVER_ERROR, error)),
        _ => Err(ActionError::misconfiguration("backend user required")),
    };
    if let Err(error) = stored {
        return Err(action.respond_error(error));
    }
    let state = if enabled { "on" } else { "off" };
    action.respond_text(&format!("Settings updated. Notifications {state}."))
}

fn registry_failure(error: ServiceError) -> ActionError {
    let status = match error {
        ServiceError::UnknownUpstream(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ActionError::from_source(status, error)
}

fn known_upstreams(registry: &dyn TenantRegistry) -> Result<Vec<Upstream>, ServiceError> {
    let mut upstreams = registry.load_known_upstreams()?;
    upstreams.sort_by(|left, right| left.key.cmp(&right.key));
    Ok(upstreams)
}

fn list_upstreams(action: &mut dyn Action) -> Result<(), ActionError> {
    let registry = action.context().config().registry();
    let listed = known_upstreams(&**registry).map(|upstreams| {
        let current = registry.load_current_upstream().ok().map(|upstream| upstream.key);
        upstreams
            .into_iter()
            .enumerate()
            .map(|(index, upstream)| {
                let marker = if current.as_deref() == Some(upstream.key.as_str()) {
                    " (current)"
                } else {
                    ""
                };
                format!("{}. {}{marker}", index + 1, upstream.url)
            })
            .collect::<Vec<_>>()
    });
    match listed {
        Ok(lines) if lines.is_empty() => action.respond_text("No ticketing instances configured."),
        Ok(lines) => action.respond_text(&format!("Known instances:\n{}", lines.join("\n"))),
        Err(error) => Err(action.respond_error(ActionError::from_source(
            StatusCode::INTERNAL_SERVER_ERROR,
            error,
        ))),
    }
}

/// Resolves `requested` to an upstream key: a 1-based position in the
/// `upstream list` output, or an instance URL.
fn selection_key(registry: &dyn TenantRegistry, requested: &str) -> Result<String, ActionError> {
    let Ok(position) = requested.parse::<usize>() else {
        return normalize_url(requested);
    };
    let upstreams = known_upstreams(registry).map_err(registry_failure)?;
    position
        .checked_sub(1)
        .and_then(|index| upstreams.get(index))
        .map(|upstream| upstream.key.clone())
        .ok_or_else(|| {
            ActionError::bad_request(format!(
                "wrong instance number {position}, must be 1-{}",
                upstreams.len()
            ))
        })
}

fn select_upstream(action: &mut dyn Action) -> Result<(), ActionError> {
    let registry = Arc::clone(action.context().config().registry());
    let requested = action.form_value("key").unwrap_or_default().to_owned();
    let selected = selection_key(&*registry, &requested).and_then(|key| {
        registry
            .store_current_upstream(&key)
            .map_err(registry_failure)
    });
    match selected {
        Ok(upstream) => action.respond_text(&format!("Now using {}.", upstream.url)),
        Err(error) => Err(action.respond_error(error)),
    }
}

fn install_cloud(action: &mut dyn Action) -> Result<(), ActionError> {
    install(action, UpstreamKind::Cloud)
}

fn install_server(action: &mut dyn Action) -> Result<(), ActionError> {
    install(action, UpstreamKind::Server)
}

/// Stores a new upstream and makes it current. Cloud upstreams receive
/// their shared secret from the instance's installation callback.
fn install(action: &mut dyn Action, kind: UpstreamKind) -> Result<(), ActionError> {
    let url = normalize_url(action.form_value("key").unwrap_or_default())
        .map_err(|error| action.respond_error(error))?;
    let upstream = Upstream {
        key: url.clone(),
        url,
        kind,
        shared_secret: None,
    };
    let registry = Arc::clone(action.context().config().registry());
    let installed = registry
        .store_upstream(&upstream)
        .and_then(|()| registry.store_current_upstream(&upstream.key))
        .map_err(|error| {
            registry_failure(error).context(format!("failed to install {}", upstream.url))
        });
    if let Err(error) = installed {
        return Err(action.respond_error(error));
    }
    let trigger = action.context().config().settings().command_trigger();
    let text = match kind {
        UpstreamKind::Cloud => format!(
            "{} has been installed. Finish the configuration by installing the app on the \
             instance, then run `{trigger} connect` to link your account.",
            upstream.url
        ),
        UpstreamKind::Server => format!(
            "Server instance {} has been installed. Run `{trigger} connect` to link your account.",
            upstream.url
        ),
    };
    action.respond_text(&text)
}

fn uninstall(action: &mut dyn Action) -> Result<(), ActionError> {
    let Some(current) = action.context().upstream().cloned() else {
        return Err(action.respond_error(ActionError::misconfiguration("upstream not resolved")));
    };
    let kind = action.form_value("type").unwrap_or_default();
    if !matches!(kind, "cloud" | "server") {
        let error = ActionError::bad_request(format!(
            "unrecognised instance type {kind:?}, expected \"cloud\" or \"server\""
        ));
        return Err(action.respond_error(error));
    }
    let entered = normalize_url(action.form_value("key").unwrap_or_default())
        .map_err(|error| action.respond_error(error))?;
    if entered != current.key {
        let error = ActionError::bad_request(format!(
            "You have entered an incorrect URL. The current instance URL is: {}. \
             Please enter the URL correctly to confirm the uninstall command.",
            current.key
        ));
        return Err(action.respond_error(error));
    }
    let registry = Arc::clone(action.context().config().registry());
    match registry.delete_upstream(&current.key) {
        Ok(removed) => action.respond_text(&format!(
            "Instance {} successfully disconnected. Remove the app from the instance to finish.",
            removed.url
        )),
        Err(error) => Err(action.respond_error(
            registry_failure(error).context(format!("failed to delete instance {}", current.key)),
        )),
    }
}
