//! Connection state machine and failover.
//!
//! A `Connection` owns the transport and one grow-only view of endpoint
//! health: indices that failed to connect are marked unavailable for the
//! lifetime of the instance and only a fresh `Connection` forgets them.
//! State machine: `Disconnected → Connecting → Connected`; any
//! network-class send/recv failure drops back to `Disconnected`;
//! [`close`](Connection::close) is terminal.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use sealrpc_common::crypto::{Encryption, Plaintext};
use sealrpc_common::frame::{self, Compression, FrameError};
use sealrpc_common::{Result, RpcError};

use crate::config::EndpointConfig;
use crate::selector::EndpointSelector;
use crate::transport::{TcpTransport, Transport};

/// Connect gives up after this many endpoint attempts.
pub const CONNECT_ATTEMPTS: usize = 3;

/// Replacement for the default pack path. Receives the outbound envelope,
/// the endpoint's secret key and algorithm name; returns the frame bytes
/// to transmit, or `None` when packing failed.
pub type PackOverride = Box<dyn Fn(&Value, &str, &str) -> Option<Vec<u8>> + Send>;

/// Replacement for the default unpack path. Receives the received frame,
/// secret key and algorithm name; returns the decoded envelope, or `None`
/// when decoding failed.
pub type UnpackOverride = Box<dyn Fn(&[u8], &str, &str) -> Option<Value> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

/// One logical, single-flight channel to a service.
///
/// Not safe for concurrent use: at most one request is in flight per
/// instance, and concurrent call flows must use separate instances.
pub struct Connection {
    configs: Vec<EndpointConfig>,
    current: Option<usize>,
    unavailable: HashSet<usize>,
    state: ConnectionState,
    last_error: String,
    transport: Box<dyn Transport>,
    selector: EndpointSelector,
    crypto: Arc<dyn Encryption>,
    compression: Compression,
    pack_override: Option<PackOverride>,
    unpack_override: Option<UnpackOverride>,
}

impl Connection {
    /// Creates a connection over TCP with no payload encryption.
    ///
    /// Production callers inject their encryption implementation with
    /// [`with_parts`](Self::with_parts).
    pub fn new(configs: Vec<EndpointConfig>) -> Self {
        Self::with_parts(
            configs,
            Box::new(TcpTransport::new()),
            Arc::new(Plaintext),
            EndpointSelector::new(),
        )
    }

    /// Creates a connection from injected collaborators: the transport,
    /// the encryption implementation and the endpoint selector. This is
    /// the substitution point tests use for a scripted transport and a
    /// seeded selector.
    pub fn with_parts(
        configs: Vec<EndpointConfig>,
        transport: Box<dyn Transport>,
        crypto: Arc<dyn Encryption>,
        selector: EndpointSelector,
    ) -> Self {
        Connection {
            configs,
            current: None,
            unavailable: HashSet::new(),
            state: ConnectionState::Disconnected,
            last_error: String::new(),
            transport,
            selector,
            crypto,
            compression: Compression::None,
            pack_override: None,
            unpack_override: None,
        }
    }

    /// Requests compression for outbound frames.
    pub fn set_compression(&mut self, compression: Compression) {
        self.compression = compression;
    }

    /// Substitutes the pack path. At most one override is active; the
    /// last registration wins.
    pub fn set_pack_override(&mut self, hook: PackOverride) {
        self.pack_override = Some(hook);
    }

    /// Substitutes the unpack path. At most one override is active; the
    /// last registration wins.
    pub fn set_unpack_override(&mut self, hook: UnpackOverride) {
        self.unpack_override = Some(hook);
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Accumulated error text of the most recent failure.
    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    /// The endpoint the connection currently targets, once one has been
    /// selected.
    pub fn current_endpoint(&self) -> Option<&EndpointConfig> {
        self.current.map(|index| &self.configs[index])
    }

    /// Endpoint indices marked unreachable. Grows for the lifetime of the
    /// connection.
    pub fn unavailable(&self) -> &HashSet<usize> {
        &self.unavailable
    }

    /// Connects to an available endpoint, trying up to
    /// [`CONNECT_ATTEMPTS`] of them.
    ///
    /// Each failed attempt appends a line to the accumulated error text
    /// and marks the endpoint unavailable. When the selector has no
    /// endpoint left the call fails immediately. Already connected is a
    /// no-op success.
    pub fn connect(&mut self) -> Result<()> {
        match self.state {
            ConnectionState::Connected => return Ok(()),
            ConnectionState::Closed => {
                return Err(RpcError::Connect("connection is closed".to_string()))
            }
            _ => {}
        }

        self.last_error.clear();
        let mut count = 0;
        while count < CONNECT_ATTEMPTS {
            count += 1;

            let Some(index) = self.selector.pick(&self.configs, &self.unavailable) else {
                self.last_error
                    .push_str("connected failure to server, available config not found\n");
                return Err(RpcError::Connect(self.last_error.clone()));
            };

            self.current = Some(index);
            self.state = ConnectionState::Connecting;
            let (host, port) = {
                let endpoint = &self.configs[index];
                (endpoint.host.clone(), endpoint.port)
            };
            debug!(endpoint = %format!("{host}:{port}"), attempt = count, "connecting");

            match self.transport.connect(&host, port) {
                Ok(()) => {
                    self.state = ConnectionState::Connected;
                    return Ok(());
                }
                Err(e) => {
                    warn!(endpoint = %format!("{host}:{port}"), error = %e, "connect attempt failed");
                    self.last_error.push_str(&format!(
                        "connected failure to server: {host}:{port}, error: {e}\n"
                    ));
                    self.unavailable.insert(index);
                    self.state = ConnectionState::Disconnected;
                }
            }
        }

        Err(RpcError::Connect(self.last_error.clone()))
    }

    /// Encodes and writes one envelope.
    ///
    /// A network-class write failure triggers exactly one reconnect and
    /// one retried write; any failure after that is reported through the
    /// error, never retried again.
    pub fn send(&mut self, envelope: &Value) -> Result<()> {
        if self.state == ConnectionState::Closed {
            return Err(RpcError::Send("connection is closed".to_string()));
        }
        let endpoint = self
            .current_endpoint()
            .cloned()
            .ok_or_else(|| RpcError::Send("no endpoint selected, connect first".to_string()))?;

        let frame_bytes = self.encode(envelope, &endpoint)?;

        match self.transport.send(&frame_bytes) {
            Ok(()) => Ok(()),
            Err(e) if e.is_network() => {
                warn!(endpoint = %endpoint.address(), error = %e, "network failure on send, reconnecting once");
                self.state = ConnectionState::Disconnected;

                if self.connect().is_err() {
                    // connect() accumulated the error text already.
                    return Err(RpcError::Send(self.last_error.clone()));
                }

                self.transport.send(&frame_bytes).map_err(|retry_err| {
                    self.last_error = format!(
                        "send failure to server: {}:{}, error: {retry_err}",
                        endpoint.host, endpoint.port
                    );
                    RpcError::Send(self.last_error.clone())
                })
            }
            Err(e) => {
                self.last_error = format!(
                    "send failure to server: {}:{}, error: {e}",
                    endpoint.host, endpoint.port
                );
                Err(RpcError::Send(self.last_error.clone()))
            }
        }
    }

    /// Reads and decodes one envelope, blocking up to `timeout`.
    ///
    /// Returns `Ok(None)` with the cause in [`last_error`](Self::last_error)
    /// when the peer closed, the read failed, or the payload could not be
    /// decoded into a structured object; only a malformed frame raises
    /// [`RpcError::Framing`].
    pub fn recv(&mut self, timeout: Duration) -> Result<Option<Value>> {
        if self.state == ConnectionState::Closed {
            return Err(RpcError::Response("connection is closed".to_string()));
        }
        let endpoint = self
            .current_endpoint()
            .cloned()
            .ok_or_else(|| RpcError::Response("no endpoint selected, connect first".to_string()))?;

        let frame_bytes = match self.transport.recv(timeout) {
            Ok(bytes) if bytes.is_empty() => {
                self.state = ConnectionState::Disconnected;
                self.last_error = "socket closed by server".to_string();
                return Ok(None);
            }
            Ok(bytes) => bytes,
            Err(crate::transport::TransportError::Framing(message)) => {
                return Err(RpcError::Framing(message));
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                self.last_error = e.to_string();
                return Ok(None);
            }
        };

        let envelope = if let Some(hook) = &self.unpack_override {
            match hook(&frame_bytes, &endpoint.secret_key, &endpoint.algorithm) {
                Some(envelope) => envelope,
                None => {
                    self.last_error = "unpack override produced no envelope".to_string();
                    return Ok(None);
                }
            }
        } else {
            match frame::unpack(
                &frame_bytes,
                &endpoint.secret_key,
                &endpoint.algorithm,
                endpoint.use_public_key,
                self.crypto.as_ref(),
            ) {
                Ok(unpacked) => {
                    debug!(compression = ?unpacked.compression, "frame decoded");
                    unpacked.envelope
                }
                Err(FrameError::Framing(message)) => return Err(RpcError::Framing(message)),
                Err(FrameError::Payload(message)) => {
                    self.last_error = message;
                    return Ok(None);
                }
            }
        };

        if !envelope.is_object() {
            self.last_error = "response payload is not a structured object".to_string();
            return Ok(None);
        }

        Ok(Some(envelope))
    }

    /// Releases the transport. Terminal and idempotent; also runs on
    /// drop.
    pub fn close(&mut self) {
        self.transport.close();
        self.state = ConnectionState::Closed;
    }

    fn encode(&self, envelope: &Value, endpoint: &EndpointConfig) -> Result<Vec<u8>> {
        if let Some(hook) = &self.pack_override {
            return hook(envelope, &endpoint.secret_key, &endpoint.algorithm)
                .filter(|bytes| !bytes.is_empty())
                .ok_or_else(|| RpcError::Send("pack override produced no frame".to_string()));
        }

        frame::pack(
            envelope,
            &endpoint.secret_key,
            &endpoint.algorithm,
            endpoint.use_public_key,
            self.compression,
            self.crypto.as_ref(),
        )
        .map_err(|e| RpcError::Send(format!("pack failure: {e}")))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.transport.close();
    }
}
