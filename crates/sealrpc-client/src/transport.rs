use std::io::{self, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use sealrpc_common::frame;
use thiserror::Error;

/// Timeout for establishing the TCP connection itself.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport-level failure, classified.
///
/// The class decides the connection's recovery behavior: only `Network`
/// (connection-level) errors trigger the single reconnect-and-retry on
/// send; `Framing` is fatal; `Timeout` and `Io` surface as receive
/// failures.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("receive timed out after {0:?}")]
    Timeout(Duration),

    /// Connection-level failure: refused, reset, aborted, broken pipe,
    /// peer vanished mid-frame.
    #[error("{0}")]
    Network(String),

    /// The byte stream violated the frame layout (oversized length
    /// field).
    #[error("{0}")]
    Framing(String),

    /// Any other I/O failure.
    #[error("{0}")]
    Io(String),
}

impl TransportError {
    /// True for connection-level errors, the class that warrants one
    /// reconnect-and-retry.
    pub fn is_network(&self) -> bool {
        matches!(self, TransportError::Network(_))
    }

    fn from_io(err: io::Error, context: &str) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => {
                TransportError::Network(format!("{context}: {err}"))
            }
            io::ErrorKind::InvalidData => TransportError::Framing(err.to_string()),
            _ => TransportError::Io(format!("{context}: {err}")),
        }
    }
}

/// Byte transport carrying whole frames.
///
/// `recv` returns exactly one frame, header included; an empty vector
/// means the peer closed the connection cleanly. Implementations are
/// injected into [`Connection`](crate::Connection) at construction, which
/// is also how tests substitute a scripted mock.
pub trait Transport: Send {
    fn connect(&mut self, host: &str, port: u16) -> Result<(), TransportError>;

    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    /// Blocking read of one frame, bounded by `timeout`.
    fn recv(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError>;

    fn close(&mut self);
}

/// Blocking TCP transport.
///
/// Resolves the address (which may yield several socket addresses) and
/// connects to the first that answers within [`CONNECT_TIMEOUT`]. Frame
/// boundaries are found with [`frame::read_frame`], so both the legacy
/// and the extended header layout delimit correctly.
pub struct TcpTransport {
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new() -> Self {
        TcpTransport { stream: None }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
        let socket_addrs = (host, port).to_socket_addrs().map_err(|e| {
            TransportError::Network(format!("invalid address '{host}:{port}': {e}"))
        })?;

        let mut last_err = None;
        for socket_addr in socket_addrs {
            match TcpStream::connect_timeout(&socket_addr, CONNECT_TIMEOUT) {
                Ok(stream) => {
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(TransportError::Network(format!(
            "failed to connect to {host}:{port}: {}",
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no address resolved".to_string())
        )))
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TransportError::Network("not connected".to_string()))?;

        stream
            .write_all(frame)
            .map_err(|e| TransportError::from_io(e, "writing frame"))?;
        stream
            .flush()
            .map_err(|e| TransportError::from_io(e, "flushing stream"))
    }

    fn recv(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TransportError::Network("not connected".to_string()))?;

        // A zero timeout would disable the read timeout entirely.
        let read_timeout = if timeout.is_zero() { None } else { Some(timeout) };
        stream
            .set_read_timeout(read_timeout)
            .map_err(|e| TransportError::Io(format!("setting read timeout: {e}")))?;

        match frame::read_frame(stream) {
            Ok(Some(bytes)) => Ok(bytes),
            Ok(None) => Ok(Vec::new()),
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut =>
            {
                Err(TransportError::Timeout(timeout))
            }
            Err(e) => Err(TransportError::from_io(e, "reading frame")),
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}
