//! Transports that carry requests into the dispatch core.
//!
//! The host bridge listens on the configured socket and hands each accepted
//! connection to a [`ConnectionHandler`]. The [`http`] and [`command`]
//! adapters turn decoded requests into actions and run them through their
//! routers.

pub mod command;
mod errors;
mod handler;
pub mod http;
mod listener;
#[cfg(test)]
mod listener_tests;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub(crate) use self::handler::{
    ConnectionHandler, ConnectionStream, read_request_line, write_response_line,
};
#[cfg(test)]
pub(crate) use self::handler::MAX_REQUEST_BYTES;
pub(crate) use self::listener::SocketListener;
#[cfg(test)]
pub(crate) use self::listener::ListenerHandle;
#[cfg(test)]
pub(crate) use self::test_utils::{CountingHandler, wait_for_count};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
