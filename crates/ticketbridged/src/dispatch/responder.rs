//! Transport-neutral response operations.

use http::StatusCode;
use serde_json::Value;

use crate::services::{TemplateError, TemplateRegistry};

use super::ActionError;

/// Emits a response on the transport that carried the request.
///
/// Each call replaces whatever an earlier call produced, so the last write
/// wins.
pub trait Responder {
    /// Responds with a JSON document.
    fn respond_json(&mut self, value: &Value) -> Result<(), ActionError>;

    /// Responds with a rendered template.
    fn respond_template(
        &mut self,
        key: &str,
        content_type: &str,
        values: &Value,
    ) -> Result<(), ActionError>;

    /// Redirects the caller.
    fn respond_redirect(&mut self, url: &str) -> Result<(), ActionError>;

    /// Emits `error` and hands it back so steps can `return Err(..)` with it.
    fn respond_error(&mut self, error: ActionError) -> ActionError;

    /// Responds with plain text. Callers format with `format!`.
    fn respond_text(&mut self, text: &str) -> Result<(), ActionError>;

    /// Emits the error carried by `result`, if any.
    fn respond_result(&mut self, result: Result<(), ActionError>) -> Result<(), ActionError> {
        result.map_err(|error| self.respond_error(error))
    }
}

/// Renders `key`, mapping template failures onto response errors.
pub(crate) fn render_template(
    templates: &TemplateRegistry,
    key: &str,
    values: &Value,
) -> Result<String, ActionError> {
    templates.render(key, values).map_err(|error| match error {
        TemplateError::Missing { key } => {
            ActionError::internal(format!("no template found for {key:?}"))
        }
        other => ActionError::from_source(StatusCode::INTERNAL_SERVER_ERROR, other)
            .context("failed to write response"),
    })
}

/// Serialises `value`, mapping failures onto response errors.
pub(crate) fn encode_json(value: &Value) -> Result<Vec<u8>, ActionError> {
    serde_json::to_vec(value).map_err(|error| {
        ActionError::from_source(StatusCode::INTERNAL_SERVER_ERROR, error)
            .context("failed to write response")
    })
}
