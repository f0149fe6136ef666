//! Connection plumbing shared by listener and bridge handlers.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::TcpStream;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// Largest accepted request line, newline included.
pub(crate) const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// An accepted connection.
pub(crate) enum ConnectionStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

/// Serves one accepted connection. Implementations must not panic.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    fn handle(&self, stream: ConnectionStream);
}

/// Reads one newline-terminated request.
///
/// Returns `None` when the peer closes without sending anything. A final
/// line without a newline is still returned. Lines longer than
/// [`MAX_REQUEST_BYTES`] are rejected with `InvalidData`.
pub(crate) fn read_request_line<R: Read>(stream: R) -> io::Result<Option<Vec<u8>>> {
    let limit = u64::try_from(MAX_REQUEST_BYTES).unwrap_or(u64::MAX).saturating_add(1);
    let mut reader = BufReader::new(stream.take(limit));
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line)? == 0 {
        return Ok(None);
    }
    if line.len() > MAX_REQUEST_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "request exceeds maximum size",
        ));
    }
    Ok(Some(line))
}

/// Writes `payload` followed by a newline and flushes.
pub(crate) fn write_response_line<W: Write>(mut stream: W, payload: &[u8]) -> io::Result<()> {
    stream.write_all(payload)?;
    stream.write_all(b"\n")?;
    stream.flush()
}
