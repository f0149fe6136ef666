//! Socket endpoints the host bridge listens on.
//!
//! The chat platform host reaches the daemon either through a Unix domain
//! socket (the default on Unix platforms) or a loopback TCP port. Endpoints are
//! written as URLs (`unix:///run/ticketbridge.sock`, `tcp://127.0.0.1:9787`) on
//! the command line and in environment variables. Configuration files accept
//! either a URL string or a tagged table.

use std::fmt;
use std::fs::DirBuilder;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Declarative configuration for the host-bridge socket.
///
/// Deserializes from either an endpoint URL or a tagged table; serializes as
/// the tagged table.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(
    tag = "transport",
    rename_all = "snake_case",
    try_from = "EndpointRepr"
)]
pub enum SocketEndpoint {
    /// Unix domain socket endpoint.
    Unix {
        /// Filesystem path of the socket.
        path: Utf8PathBuf,
    },
    /// TCP socket endpoint.
    Tcp {
        /// Host name or address to bind.
        host: String,
        /// Port to bind; `0` picks an ephemeral port.
        port: u16,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EndpointRepr {
    Url(String),
    Tagged(TaggedEndpoint),
}

#[derive(Deserialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
enum TaggedEndpoint {
    Unix { path: Utf8PathBuf },
    Tcp { host: String, port: u16 },
}

impl TryFrom<EndpointRepr> for SocketEndpoint {
    type Error = SocketParseError;

    fn try_from(repr: EndpointRepr) -> Result<Self, Self::Error> {
        match repr {
            EndpointRepr::Url(url) => url.parse(),
            EndpointRepr::Tagged(TaggedEndpoint::Unix { path }) => Ok(Self::unix(path)),
            EndpointRepr::Tagged(TaggedEndpoint::Tcp { host, port }) => Ok(Self::tcp(host, port)),
        }
    }
}

impl SocketEndpoint {
    /// Builds a Unix domain socket endpoint.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Builds a TCP socket endpoint.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Returns the socket path when the endpoint uses the Unix transport.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Unix { path } => Some(path.as_ref()),
            Self::Tcp { .. } => None,
        }
    }

    /// Ensures a Unix socket's parent directory exists and is private to the
    /// current user. TCP endpoints need no preparation.
    pub fn prepare_filesystem(&self) -> Result<(), SocketPreparationError> {
        let Some(path) = self.unix_path() else {
            return Ok(());
        };
        let parent = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .ok_or_else(|| SocketPreparationError::MissingParent {
                path: path.to_path_buf(),
            })?;

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }

        match builder.create(parent.as_std_path()) {
            Err(source) if source.kind() != std::io::ErrorKind::AlreadyExists => {
                Err(SocketPreparationError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source,
                })
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix { path } => write!(formatter, "unix://{path}"),
            Self::Tcp { host, port } => write!(formatter, "tcp://{host}:{port}"),
        }
    }
}

impl FromStr for SocketEndpoint {
    type Err = SocketParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input)?;
        match url.scheme() {
            "unix" => parse_unix(input, &url),
            "tcp" => parse_tcp(input, &url),
            other => Err(SocketParseError::UnsupportedScheme(other.to_owned())),
        }
    }
}

fn parse_unix(input: &str, url: &Url) -> Result<SocketEndpoint, SocketParseError> {
    match url.path() {
        "" | "/" => Err(SocketParseError::MissingUnixPath(input.to_owned())),
        path => Ok(SocketEndpoint::unix(path)),
    }
}

fn parse_tcp(input: &str, url: &Url) -> Result<SocketEndpoint, SocketParseError> {
    let host = url
        .host_str()
        .ok_or_else(|| SocketParseError::MissingHost(input.to_owned()))?;
    let port = url
        .port()
        .ok_or_else(|| SocketParseError::MissingPort(input.to_owned()))?;
    Ok(SocketEndpoint::tcp(host, port))
}

/// Errors encountered while parsing a [`SocketEndpoint`] from text.
#[derive(Debug, Error)]
pub enum SocketParseError {
    /// Scheme was not recognised.
    #[error("unsupported socket scheme '{0}'")]
    UnsupportedScheme(String),
    /// TCP host name was missing.
    #[error("missing TCP host in '{0}'")]
    MissingHost(String),
    /// TCP port was missing from the address.
    #[error("missing TCP port in '{0}'")]
    MissingPort(String),
    /// Unix socket path was absent.
    #[error("missing Unix socket path in '{0}'")]
    MissingUnixPath(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// Errors raised when preparing socket directories.
#[derive(Debug, Error)]
pub enum SocketPreparationError {
    /// The Unix socket path has no parent directory.
    #[error("socket path '{path}' has no parent directory")]
    MissingParent { path: Utf8PathBuf },
    /// Failed to create the socket directory.
    #[error("failed to create socket directory '{path}': {source}")]
    CreateDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}
