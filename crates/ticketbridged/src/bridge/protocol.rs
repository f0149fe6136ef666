//! Wire types exchanged with the host.

use std::collections::BTreeMap;

use http::header::{HeaderName, HeaderValue};
use http::{Method, Request, Response};
use serde::{Deserialize, Serialize};

use crate::transport::command::{CommandArgs, CommandResponse};

use super::BridgeError;

/// One request from the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BridgeRequest {
    /// A plugin HTTP request.
    Http(HttpRequest),
    /// A slash-command invocation.
    Command(CommandArgs),
}

impl BridgeRequest {
    /// Decodes one request line.
    pub fn parse(line: &[u8]) -> Result<Self, BridgeError> {
        serde_json::from_slice(line).map_err(BridgeError::Malformed)
    }
}

/// HTTP request forwarded by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    /// Request method, such as `GET`.
    pub method: String,
    /// Request path, plugin prefix included.
    pub path: String,
    /// Raw query string without the leading `?`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub query: String,
    /// Request headers; names are case-insensitive.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Request body as text.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
}

impl HttpRequest {
    /// Assembles an [`http::Request`].
    pub fn into_request(self) -> Result<Request<Vec<u8>>, BridgeError> {
        let method =
            Method::from_bytes(self.method.as_bytes()).map_err(|source| {
                BridgeError::InvalidMethod {
                    method: self.method.clone(),
                    source,
                }
            })?;
        let uri = if self.query.is_empty() {
            self.path
        } else {
            format!("{}?{}", self.path, self.query)
        };
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in &self.headers {
            let invalid = || BridgeError::InvalidHeader { name: name.clone() };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            builder = builder.header(header_name, header_value);
        }
        Ok(builder.body(self.body.into_bytes())?)
    }
}

/// One response to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BridgeResponse {
    /// Reply to an HTTP request.
    Http(HttpReply),
    /// Reply to a slash command.
    Command {
        /// Reply the host posts.
        response: CommandResponse,
    },
    /// The request could not be served.
    Error {
        /// Human-readable reason.
        message: String,
    },
}

impl BridgeResponse {
    /// Builds an error reply.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Buffered HTTP response returned to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpReply {
    /// Status code.
    pub status: u16,
    /// Response headers. Values that are not valid text are dropped.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Response body, lossily decoded as UTF-8.
    #[serde(default)]
    pub body: String,
}

impl From<Response<Vec<u8>>> for HttpReply {
    fn from(response: Response<Vec<u8>>) -> Self {
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_owned(), value.to_owned()))
            })
            .collect();
        Self {
            status: response.status().as_u16(),
            headers,
            body: String::from_utf8_lossy(response.body()).into_owned(),
        }
    }
}
