use std::io;

use thiserror::Error;

/// Failures decoding or answering a host-bridge request.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The request line was not valid protocol JSON.
    #[error("malformed request: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The HTTP method could not be parsed.
    #[error("invalid HTTP method {method:?}")]
    InvalidMethod {
        /// Method as received.
        method: String,
        /// Parser failure.
        #[source]
        source: http::method::InvalidMethod,
    },

    /// A header name or value was not valid HTTP.
    #[error("invalid header {name:?}")]
    InvalidHeader {
        /// Header name as received.
        name: String,
    },

    /// The request could not be assembled from its parts.
    #[error("invalid HTTP request: {0}")]
    InvalidRequest(#[from] http::Error),

    /// Reading the request line failed.
    #[error("failed to read request: {0}")]
    Read(#[source] io::Error),

    /// The response could not be encoded.
    #[error("failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),

    /// Writing the response line failed.
    #[error("failed to write response: {0}")]
    Write(#[source] io::Error),
}
