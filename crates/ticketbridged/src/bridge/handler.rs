//! Connection handler for the host bridge.

use tracing::{debug, warn};

use crate::transport::command::CommandSurface;
use crate::transport::http::HttpSurface;
use crate::transport::{
    ConnectionHandler, ConnectionStream, read_request_line, write_response_line,
};

use super::{BRIDGE_TARGET, BridgeError, BridgeRequest, BridgeResponse};

const ENCODE_FAILURE: &[u8] = br#"{"kind":"error","message":"failed to encode response"}"#;

/// Serves one bridge request per connection.
#[derive(Clone)]
pub struct BridgeConnectionHandler {
    http: HttpSurface,
    command: CommandSurface,
}

impl BridgeConnectionHandler {
    /// Pairs the HTTP and command surfaces.
    pub fn new(http: HttpSurface, command: CommandSurface) -> Self {
        Self { http, command }
    }

    /// Decodes and serves one request line.
    pub fn respond(&self, line: &[u8]) -> BridgeResponse {
        match BridgeRequest::parse(line).and_then(|request| self.serve_request(request)) {
            Ok(response) => response,
            Err(error) => {
                warn!(target: BRIDGE_TARGET, %error, "rejected bridge request");
                BridgeResponse::error(error.to_string())
            }
        }
    }

    fn serve_request(&self, request: BridgeRequest) -> Result<BridgeResponse, BridgeError> {
        match request {
            BridgeRequest::Http(request) => {
                let request = request.into_request()?;
                Ok(BridgeResponse::Http(self.http.handle(request).into()))
            }
            BridgeRequest::Command(args) => Ok(BridgeResponse::Command {
                response: self.command.handle(args),
            }),
        }
    }

    fn serve(&self, stream: &mut ConnectionStream) -> Result<(), BridgeError> {
        let response = match read_request_line(&mut *stream) {
            Ok(Some(line)) => self.respond(&line),
            Ok(None) => {
                debug!(target: BRIDGE_TARGET, "host disconnected without a request");
                return Ok(());
            }
            Err(error) => {
                let error = BridgeError::Read(error);
                warn!(target: BRIDGE_TARGET, %error, "failed to read bridge request");
                BridgeResponse::error(error.to_string())
            }
        };
        let encoded = serde_json::to_vec(&response).map_err(BridgeError::Encode);
        let payload = match &encoded {
            Ok(payload) => payload.as_slice(),
            Err(error) => {
                warn!(target: BRIDGE_TARGET, %error, "failed to encode bridge response");
                ENCODE_FAILURE
            }
        };
        write_response_line(stream, payload).map_err(BridgeError::Write)
    }
}

impl ConnectionHandler for BridgeConnectionHandler {
    fn handle(&self, mut stream: ConnectionStream) {
        if let Err(error) = self.serve(&mut stream) {
            warn!(target: BRIDGE_TARGET, %error, "bridge connection failed");
        }
    }
}
