//! Failures raised while binding or running the host-bridge listener.

use std::io;
use std::net::SocketAddr;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Listener failures.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The TCP host could not be resolved.
    #[error("failed to resolve {host}:{port}: {source}")]
    Resolve {
        /// Host as configured.
        host: String,
        /// Port as configured.
        port: u16,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Resolution succeeded but produced no usable address.
    #[error("{host}:{port} resolved to no addresses")]
    NoAddress {
        /// Host as configured.
        host: String,
        /// Port as configured.
        port: u16,
    },
    /// Binding the TCP socket failed.
    #[error("failed to bind {addr}: {source}")]
    BindTcp {
        /// Address the bind was attempted on.
        addr: SocketAddr,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The socket could not be switched to non-blocking accepts.
    #[error("failed to enable non-blocking accepts: {source}")]
    NonBlocking {
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Unix sockets are not available on this platform.
    #[cfg(not(unix))]
    #[error("unix sockets are unsupported for {path}")]
    UnsupportedUnix {
        /// Socket path.
        path: Utf8PathBuf,
    },
    /// Binding the Unix socket failed.
    #[cfg(unix)]
    #[error("failed to bind {path}: {source}")]
    BindUnix {
        /// Socket path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Another process is serving the Unix socket.
    #[cfg(unix)]
    #[error("{path} is already served by another process")]
    UnixInUse {
        /// Socket path.
        path: Utf8PathBuf,
    },
    /// The configured path exists but is not a socket.
    #[cfg(unix)]
    #[error("{path} exists and is not a socket")]
    UnixNotSocket {
        /// Socket path.
        path: Utf8PathBuf,
    },
    /// Inspecting or removing a stale socket failed.
    #[cfg(unix)]
    #[error("failed to reclaim stale socket {path}: {source}")]
    UnixStale {
        /// Socket path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The accept loop panicked.
    #[error("listener thread panicked")]
    ThreadPanic,
}
