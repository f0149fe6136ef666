//! Socket listener tests.

use std::net::TcpStream;
use std::sync::Arc;

use rstest::{fixture, rstest};

use ticketbridge_config::SocketEndpoint;

use super::{ConnectionHandler, CountingHandler, ListenerError, SocketListener, wait_for_count};

#[fixture]
fn loopback() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", 0)
}

#[rstest]
fn serves_every_tcp_connection(loopback: SocketEndpoint) {
    let listener = SocketListener::bind(&loopback).expect("bind tcp listener");
    let addr = listener.local_addr().expect("tcp listener has an address");
    let (count, handler) = CountingHandler::new();
    let handler: Arc<dyn ConnectionHandler> = handler;
    let handle = listener.start(handler).expect("start listener");

    for _ in 0..3 {
        TcpStream::connect(addr).expect("connect client");
    }

    assert!(wait_for_count(&count, 3), "expected three connections");
    handle.shutdown();
    handle.join().expect("join listener");
}

#[cfg(unix)]
mod unix {
    use super::*;
    use std::os::unix::net::{UnixListener, UnixStream};

    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    #[fixture]
    fn socket_dir() -> TempDir {
        tempfile::tempdir().expect("temp dir")
    }

    fn socket_path(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("bridge.sock")).expect("utf8 temp path")
    }

    #[rstest]
    fn reclaims_stale_socket_and_cleans_up(socket_dir: TempDir) {
        let path = socket_path(&socket_dir);
        drop(UnixListener::bind(&path).expect("bind stale listener"));
        assert!(path.exists(), "stale socket file remains after drop");

        let listener =
            SocketListener::bind(&SocketEndpoint::unix(path.clone())).expect("bind over stale");
        let (count, handler) = CountingHandler::new();
        let handle = listener.start(handler).expect("start listener");

        UnixStream::connect(&path).expect("connect unix client");
        assert!(wait_for_count(&count, 1), "expected one connection");

        handle.shutdown();
        handle.join().expect("join listener");
        assert!(!path.exists(), "socket file removed on shutdown");
    }

    #[rstest]
    fn refuses_socket_in_use(socket_dir: TempDir) {
        let path = socket_path(&socket_dir);
        let _live = UnixListener::bind(&path).expect("bind live listener");

        let error = SocketListener::bind(&SocketEndpoint::unix(path)).expect_err("in use");
        assert!(matches!(error, ListenerError::UnixInUse { .. }));
    }

    #[rstest]
    fn refuses_regular_files(socket_dir: TempDir) {
        let path = socket_path(&socket_dir);
        std::fs::write(&path, b"not a socket").expect("write file");

        let error = SocketListener::bind(&SocketEndpoint::unix(path)).expect_err("not a socket");
        assert!(matches!(error, ListenerError::UnixNotSocket { .. }));
    }
}
