//! Host-bridge protocol.
//!
//! The chat platform host opens one connection per request and writes a
//! single JSON line tagged by `kind`:
//!
//! ```text
//! {"kind":"http","method":"GET","path":"/plugins/ticketbridge/api/v2/userinfo","headers":{"mattermost-user-id":"u1"}}
//! {"kind":"command","user_id":"u1","channel_id":"c1","command":"/jira connect"}
//! ```
//!
//! The daemon answers with one line of the matching kind, or
//! `{"kind":"error","message":"..."}` when the request cannot be decoded.

mod errors;
mod handler;
mod protocol;

pub use self::errors::BridgeError;
pub use self::handler::BridgeConnectionHandler;
pub use self::protocol::{BridgeRequest, BridgeResponse, HttpReply, HttpRequest};

const BRIDGE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bridge");
