//! Steps that check which transport carried the request.

use http::Method;

use crate::dispatch::{Action, ActionError, Surface};

fn http_method(action: &dyn Action) -> Option<Method> {
    match action.surface() {
        Surface::Http(exchange) => Some(exchange.method().clone()),
        Surface::Basic | Surface::Command(_) => None,
    }
}

fn require_method(action: &mut dyn Action, expected: Method) -> Result<(), ActionError> {
    let Some(method) = http_method(action) else {
        return Err(action.respond_error(ActionError::misconfiguration(
            "an HTTP action is required",
        )));
    };
    if method == expected {
        return Ok(());
    }
    Err(action.respond_error(ActionError::method_not_allowed(format!(
        "method {method} is not allowed, must be {expected}"
    ))))
}

/// Requires an HTTP `GET`.
pub fn require_http_get(action: &mut dyn Action) -> Result<(), ActionError> {
    require_method(action, Method::GET)
}

/// Requires an HTTP `POST`.
pub fn require_http_post(action: &mut dyn Action) -> Result<(), ActionError> {
    require_method(action, Method::POST)
}

/// Requires an HTTP `PUT`.
pub fn require_http_put(action: &mut dyn Action) -> Result<(), ActionError> {
    require_method(action, Method::PUT)
}

/// Requires an HTTP `DELETE`.
pub fn require_http_delete(action: &mut dyn Action) -> Result<(), ActionError> {
    require_method(action, Method::DELETE)
}

/// Requires the request to have arrived over HTTP.
pub fn require_http_action(action: &mut dyn Action) -> Result<(), ActionError> {
    if http_method(action).is_some() {
        return Ok(());
    }
    Err(action.respond_error(ActionError::misconfiguration(
        "an HTTP action is required",
    )))
}

/// Requires the request to have arrived as a slash command.
pub fn require_command_action(action: &mut dyn Action) -> Result<(), ActionError> {
    if matches!(action.surface(), Surface::Command(_)) {
        return Ok(());
    }
    Err(action.respond_error(ActionError::misconfiguration(
        "a command action is required",
    )))
}
