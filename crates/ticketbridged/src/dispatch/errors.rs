//! Structured errors surfaced by pipeline steps.
//!
//! Every step failure carries the status a transport should report, an
//! optional human-readable message and an optional underlying cause. The
//! error is cheap to clone so the router can record it on the request context
//! while the step that produced it also returns it.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;

/// Shared, thread-safe error cause.
pub type SharedSource = Arc<dyn StdError + Send + Sync + 'static>;

/// Failure produced by a step, resolver or responder.
#[derive(Debug, Clone)]
pub struct ActionError {
    status: StatusCode,
    message: Option<String>,
    source: Option<SharedSource>,
}

impl ActionError {
    /// Builds an error from a status and message.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying cause.
    pub fn from_source<E>(status: StatusCode, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::from_shared(status, Arc::new(source))
    }

    /// Builds an error around a cause that is already shared.
    pub fn from_shared(status: StatusCode, source: SharedSource) -> Self {
        Self {
            status,
            message: None,
            source: Some(source),
        }
    }

    /// Prefixes the message with additional context.
    #[must_use]
    pub fn context(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.message = Some(match self.message.take() {
            Some(existing) => format!("{message}: {existing}"),
            None => message,
        });
        self
    }

    /// `400 Bad Request`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// `401 Unauthorized`.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// `404 Not Found`.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// `405 Method Not Allowed`.
    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, message)
    }

    /// `500 Internal Server Error`.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Router or adapter wiring error, reported as `500`.
    pub fn misconfiguration(message: impl Into<String>) -> Self {
        Self::internal(message).context("misconfiguration")
    }

    /// Status the transport should report.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Message attached to the error, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.message, &self.source) {
            (Some(message), Some(source)) => write!(formatter, "{message}: {source}"),
            (Some(message), None) => formatter.write_str(message),
            (None, Some(source)) => write!(formatter, "{source}"),
            (None, None) => formatter.write_str(
                self.status
                    .canonical_reason()
                    .unwrap_or("request failed"),
            ),
        }
    }
}

impl StdError for ActionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Debug, thiserror::Error)]
    #[error("registry offline")]
    struct Offline;

    #[rstest]
    #[case(ActionError::unauthorized("not authorized"), "not authorized")]
    #[case(ActionError::from_source(StatusCode::INTERNAL_SERVER_ERROR, Offline), "registry offline")]
    #[case(
        ActionError::from_source(StatusCode::INTERNAL_SERVER_ERROR, Offline).context("failed to load upstream"),
        "failed to load upstream: registry offline"
    )]
    #[case(
        ActionError::internal("already resolved").context("misconfiguration"),
        "misconfiguration: already resolved"
    )]
    fn renders_message_and_source(#[case] error: ActionError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn exposes_source_chain() {
        let error = ActionError::from_source(StatusCode::UNAUTHORIZED, Offline);
        let source = error.source().expect("source should be present");
        assert_eq!(source.to_string(), "registry offline");
        assert_eq!(error.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn misconfiguration_reports_internal_status() {
        let error = ActionError::misconfiguration("wrong action type");
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.message(), Some("misconfiguration: wrong action type"));
    }
}
