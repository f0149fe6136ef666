//! HTTP routes.

use http::StatusCode;
use serde::Serialize;
use serde_json::json;

use crate::capability::{
    require_backend_user, require_caller_id, require_caller_identity, require_http_action,
    require_http_get, require_http_post, require_signed_token, require_upstream,
};
use crate::dispatch::{Action, ActionError, Route, Router, Script, Surface};
use crate::services::UserSettings;
use crate::transport::http::log_http_action;

use super::connect_url;

/// Caller's connection status, for the web app.
pub const ROUTE_USER_INFO: &str = "/api/v2/userinfo";
/// Starts linking the caller's account.
pub const ROUTE_USER_CONNECT: &str = "/user/connect";
/// Removes the caller's linked account.
pub const ROUTE_USER_DISCONNECT: &str = "/user/disconnect";
/// Pages the upstream embeds while linking accounts.
pub const ROUTE_CONNECT_PAGES: &str = "/ac/*";

const MESSAGE_TEMPLATE: &str = "/other/message.html";
const HTML: &str = "text/html; charset=utf-8";

/// Builds the router for plugin HTTP requests.
#[must_use]
pub fn http_router() -> Router {
    Router::builder()
        .before(Script::of(&[require_http_action]))
        .after(Script::of(&[log_http_action]))
        .add_routes([
            (
                ROUTE_USER_INFO,
                Route::new(Script::of(&[require_http_get, require_caller_id, user_info])),
            ),
            (
                ROUTE_USER_CONNECT,
                Route::new(Script::of(&[require_upstream, require_caller_id, connect_user])),
            ),
            (
                ROUTE_USER_DISCONNECT,
                Route::new(Script::of(&[
                    require_http_post,
                    require_upstream,
                    require_backend_user,
                    disconnect_user,
                ])),
            ),
            (
                ROUTE_CONNECT_PAGES,
                Route::new(Script::of(&[
                    require_http_get,
                    require_caller_identity,
                    require_upstream,
                    require_signed_token,
                    render_connect_page,
                ])),
            ),
        ])
        .build()
}

/// Body of [`ROUTE_USER_INFO`] replies, in the shape the web app reads.
#[derive(Debug, Default, Serialize)]
struct UserInfo {
    upstream_user_id: String,
    settings: UserSettings,
    is_connected: bool,
    instance_installed: bool,
    #[serde(rename = "jira_url", skip_serializing_if = "String::is_empty")]
    upstream_url: String,
}

fn user_info(action: &mut dyn Action) -> Result<(), ActionError> {
    let context = action.context();
    let caller_id = context.caller_id().unwrap_or_default();
    let registry = context.config().registry();
    let mut info = UserInfo::default();
    if let Ok(upstream) = registry.load_current_upstream() {
        info.instance_installed = true;
        if let Ok(user) = registry.load_backend_user(&upstream, caller_id) {
            info.is_connected = true;
            info.upstream_user_id = user.account_id;
            info.settings = user.settings;
        }
        info.upstream_url = upstream.url;
    }
    let body = serde_json::to_value(&info).map_err(|error| {
        action.respond_error(ActionError::from_source(
            StatusCode::INTERNAL_SERVER_ERROR,
            error,
        ))
    })?;
    action.respond_json(&body)
}

fn connect_user(action: &mut dyn Action) -> Result<(), ActionError> {
    let context = action.context();
    let url = match (context.upstream(), context.caller_id()) {
        (Some(upstream), Some(caller_id)) => {
            connect_url(context.config().settings(), upstream, caller_id)
        }
        _ => Err(ActionError::misconfiguration("upstream and caller required")),
    };
    match url {
        Ok(url) => action.respond_redirect(url.as_str()),
        Err(error) => Err(action.respond_error(error)),
    }
}

fn disconnect_user(action: &mut dyn Action) -> Result<(), ActionError> {
    let context = action.context();
    let removed = match (context.upstream(), context.backend_user()) {
        (Some(upstream), Some(user)) => context
            .config()
            .registry()
            .delete_backend_user(upstream, &user.caller_id)
            .map_err(|error| ActionError::from_source(StatusCode::INTERNAL_SERVER_ERROR, error)),
        _ => Err(ActionError::misconfiguration("backend user required")),
    };
    if let Err(error) = removed {
        return Err(action.respond_error(error));
    }
    action.respond_template(
        MESSAGE_TEMPLATE,
        HTML,
        &json!({
            "header": "Disconnected",
            "message": "Disconnected from Jira. Please close this page.",
        }),
    )
}

fn connect_page_key(action: &dyn Action) -> Option<String> {
    let Surface::Http(exchange) = action.surface() else {
        return None;
    };
    exchange
        .uri()
        .path()
        .split_once("/ac/")
        .map(|(_, page)| format!("/ac/{page}"))
}

fn render_connect_page(action: &mut dyn Action) -> Result<(), ActionError> {
    let Some(key) = connect_page_key(action) else {
        return Err(action.respond_error(ActionError::not_found("not found")));
    };

    let context = action.context();
    let settings = context.config().settings();
    let values = json!({
        "caller_display_name": context
            .identity()
            .map(|identity| identity.display_name.as_str())
            .unwrap_or_default(),
        "backend_display_name": context
            .signed_token()
            .and_then(|token| token.claims.sub.as_deref())
            .unwrap_or_default(),
        "connect_submit_url": format!("{}/ac/user_connected.html", settings.plugin_url()),
        "jwt": context.signed_token().map(|token| token.raw.as_str()).unwrap_or_default(),
    });
    action.respond_template(&key, HTML, &values)
}
