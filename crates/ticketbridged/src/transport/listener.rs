//! Accept loop for the host-bridge socket.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use ticketbridge_config::SocketEndpoint;

use super::{ConnectionHandler, ConnectionStream, LISTENER_TARGET, ListenerError};

#[cfg(unix)]
use camino::Utf8Path;
#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};

const IDLE_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// A bound, not yet accepting, listener.
#[derive(Debug)]
pub(crate) struct SocketListener {
    endpoint: SocketEndpoint,
    socket: BoundSocket,
}

#[derive(Debug)]
enum BoundSocket {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl BoundSocket {
    fn set_nonblocking(&self) -> io::Result<()> {
        match self {
            Self::Tcp(listener) => listener.set_nonblocking(true),
            #[cfg(unix)]
            Self::Unix(listener) => listener.set_nonblocking(true),
        }
    }

    fn accept(&self) -> io::Result<Option<ConnectionStream>> {
        let accepted = match self {
            Self::Tcp(listener) => listener.accept().and_then(|(stream, _)| {
                stream.set_nonblocking(false)?;
                Ok(ConnectionStream::Tcp(stream))
            }),
            #[cfg(unix)]
            Self::Unix(listener) => listener.accept().and_then(|(stream, _)| {
                stream.set_nonblocking(false)?;
                Ok(ConnectionStream::Unix(stream))
            }),
        };
        match accepted {
            Ok(stream) => Ok(Some(stream)),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }
}

impl SocketListener {
    /// Binds `endpoint`, reclaiming a stale Unix socket file when nobody is
    /// serving it.
    pub(crate) fn bind(endpoint: &SocketEndpoint) -> Result<Self, ListenerError> {
        let socket = match endpoint {
            SocketEndpoint::Tcp { host, port } => BoundSocket::Tcp(bind_tcp(host, *port)?),
            #[cfg(unix)]
            SocketEndpoint::Unix { path } => BoundSocket::Unix(bind_unix(path)?),
            #[cfg(not(unix))]
            SocketEndpoint::Unix { path } => {
                return Err(ListenerError::UnsupportedUnix { path: path.clone() });
            }
        };
        Ok(Self {
            endpoint: endpoint.clone(),
            socket,
        })
    }

    /// Bound TCP address; `None` for Unix sockets.
    pub(crate) fn local_addr(&self) -> Option<SocketAddr> {
        match &self.socket {
            BoundSocket::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            BoundSocket::Unix(_) => None,
        }
    }

    /// Starts accepting on a background thread. Each connection is served
    /// on its own thread.
    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<ListenerHandle, ListenerError> {
        if let Err(source) = self.socket.set_nonblocking() {
            self.remove_socket_file();
            return Err(ListenerError::NonBlocking { source });
        }
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let thread = thread::spawn(move || self.accept_until(&flag, &handler));
        Ok(ListenerHandle {
            shutdown,
            thread: Some(thread),
        })
    }

    fn accept_until(&self, shutdown: &AtomicBool, handler: &Arc<dyn ConnectionHandler>) {
        info!(target: LISTENER_TARGET, endpoint = %self.endpoint, "host bridge listening");
        let mut reported = None::<io::ErrorKind>;
        while !shutdown.load(Ordering::SeqCst) {
            match self.socket.accept() {
                Ok(Some(stream)) => {
                    reported = None;
                    let handler = Arc::clone(handler);
                    thread::spawn(move || handler.handle(stream));
                }
                Ok(None) => thread::sleep(IDLE_BACKOFF),
                Err(error) => {
                    if reported != Some(error.kind()) {
                        warn!(target: LISTENER_TARGET, %error, "accept failed");
                    }
                    reported = Some(error.kind());
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }
        debug!(target: LISTENER_TARGET, endpoint = %self.endpoint, "host bridge stopped");
        self.remove_socket_file();
    }

    #[cfg(unix)]
    fn remove_socket_file(&self) {
        if let Some(path) = self.endpoint.unix_path()
            && let Err(error) = std::fs::remove_file(path)
            && error.kind() != io::ErrorKind::NotFound
        {
            warn!(target: LISTENER_TARGET, %error, %path, "failed to remove socket file");
        }
    }

    #[cfg(not(unix))]
    fn remove_socket_file(&self) {}
}

/// Controls a running accept loop.
#[derive(Debug)]
pub(crate) struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    /// Asks the accept loop to stop.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept loop to finish.
    pub(crate) fn join(mut self) -> Result<(), ListenerError> {
        self.thread
            .take()
            .map_or(Ok(()), |thread| thread.join().map_err(|_| ListenerError::ThreadPanic))
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?
        .next()
        .ok_or_else(|| ListenerError::NoAddress {
            host: host.to_owned(),
            port,
        })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}

#[cfg(unix)]
fn bind_unix(path: &Utf8Path) -> Result<UnixListener, ListenerError> {
    reclaim_stale_socket(path)?;
    UnixListener::bind(path).map_err(|source| ListenerError::BindUnix {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
fn reclaim_stale_socket(path: &Utf8Path) -> Result<(), ListenerError> {
    use std::os::unix::fs::FileTypeExt;

    let stale = |source: io::Error| ListenerError::UnixStale {
        path: path.to_path_buf(),
        source,
    };
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(error) => return Err(stale(error)),
    };
    if !metadata.file_type().is_socket() {
        return Err(ListenerError::UnixNotSocket {
            path: path.to_path_buf(),
        });
    }
    match UnixStream::connect(path) {
        Ok(_) => Err(ListenerError::UnixInUse {
            path: path.to_path_buf(),
        }),
        Err(error)
            if matches!(
                error.kind(),
                io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
            ) =>
        {
            debug!(target: LISTENER_TARGET, %path, "removing stale socket file");
            std::fs::remove_file(path).map_err(stale)
        }
        Err(error) => Err(stale(error)),
    }
}
