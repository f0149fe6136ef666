//! The unit handed to every pipeline step.
//!
//! An [`Action`] couples one [`RequestContext`] with a [`Responder`] and an
//! input accessor. Transports build their action by wrapping a
//! [`BasicAction`] and overriding the parts they own, so the context always
//! lives in exactly one place.

use std::collections::HashMap;

use serde_json::Value;

use crate::transport::command::CommandInvocation;
use crate::transport::http::HttpExchange;

use super::responder::{encode_json, render_template};
use super::{ActionError, RequestContext, Responder};

/// Transport-specific view of an action.
#[derive(Clone, Copy)]
pub enum Surface<'a> {
    /// No transport; the base action.
    Basic,
    /// Inbound HTTP request.
    Http(&'a HttpExchange),
    /// Slash command.
    Command(&'a CommandInvocation),
}

/// Request-scoped action seen by steps.
pub trait Action: Responder {
    /// Request state.
    fn context(&self) -> &RequestContext;

    /// Mutable request state.
    fn context_mut(&mut self) -> &mut RequestContext;

    /// Named input value: a form or query field over HTTP, a named or
    /// positional (`$1`, `$2`, ...) argument for commands.
    fn form_value(&self, name: &str) -> Option<&str>;

    /// Transport that carried the request.
    fn surface(&self) -> Surface<'_> {
        Surface::Basic
    }
}

/// Response captured by a [`BasicAction`].
#[derive(Debug, Clone)]
pub enum BasicResponse {
    /// Serialised JSON document.
    Json(String),
    /// Rendered template.
    Template {
        /// Template key.
        key: String,
        /// Declared content type.
        content_type: String,
        /// Rendered body.
        body: String,
    },
    /// Redirect target.
    Redirect(String),
    /// Plain text.
    Text(String),
    /// Emitted error.
    Error(ActionError),
}

/// Transport-neutral action that records its response in memory.
pub struct BasicAction {
    context: RequestContext,
    form: HashMap<String, String>,
    response: Option<BasicResponse>,
}

impl BasicAction {
    /// Wraps a request context.
    pub fn new(context: RequestContext) -> Self {
        Self {
            context,
            form: HashMap::new(),
            response: None,
        }
    }

    /// Adds an input value.
    #[must_use]
    pub fn with_form_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.insert(name.into(), value.into());
        self
    }

    /// Last response emitted, if any.
    #[must_use]
    pub fn response(&self) -> Option<&BasicResponse> {
        self.response.as_ref()
    }

    /// Consumes the action, returning its request state.
    #[must_use]
    pub fn into_context(self) -> RequestContext {
        self.context
    }
}

impl Responder for BasicAction {
    fn respond_json(&mut self, value: &Value) -> Result<(), ActionError> {
        let encoded = encode_json(value).map_err(|error| self.respond_error(error))?;
        self.response = Some(BasicResponse::Json(
            String::from_utf8_lossy(&encoded).into_owned(),
        ));
        Ok(())
    }

    fn respond_template(
        &mut self,
        key: &str,
        content_type: &str,
        values: &Value,
    ) -> Result<(), ActionError> {
        let body = render_template(self.context.config().templates(), key, values)
            .map_err(|error| self.respond_error(error))?;
        self.response = Some(BasicResponse::Template {
            key: key.to_owned(),
            content_type: content_type.to_owned(),
            body,
        });
        Ok(())
    }

    fn respond_redirect(&mut self, url: &str) -> Result<(), ActionError> {
        self.response = Some(BasicResponse::Redirect(url.to_owned()));
        Ok(())
    }

    fn respond_error(&mut self, error: ActionError) -> ActionError {
        self.response = Some(BasicResponse::Error(error.clone()));
        error
    }

    fn respond_text(&mut self, text: &str) -> Result<(), ActionError> {
        self.response = Some(BasicResponse::Text(text.to_owned()));
        Ok(())
    }
}

impl Action for BasicAction {
    fn context(&self) -> &RequestContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut RequestContext {
        &mut self.context
    }

    fn form_value(&self, name: &str) -> Option<&str> {
        self.form.get(name).map(String::as_str)
    }
}
