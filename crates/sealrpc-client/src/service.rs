use std::time::Duration;

use serde_json::Value;

use sealrpc_common::{CallRequest, CallResponse, Result, RpcArgs, RpcError};

use crate::config::EndpointConfig;
use crate::connection::Connection;

/// Default bound on one blocking receive.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Generic invocation engine over one [`Connection`].
///
/// `invoke(method, args)` is the single entry point for arbitrary remote
/// calls; typed per-method stubs are thin wrappers delegating to it:
///
/// ```no_run
/// use sealrpc_client::{EndpointConfig, ServiceProxy};
/// use serde_json::json;
///
/// struct UserService(ServiceProxy);
///
/// impl UserService {
///     fn balance(&mut self, account: &str) -> sealrpc_common::Result<serde_json::Value> {
///         self.0.invoke("balance", vec![json!(account)])
///     }
/// }
/// ```
///
/// A response is classified into exactly one of: success (the result is
/// returned), business error (expected, domain-level), or protocol error
/// (unexpected, carries the kind tag and optional server trace).
pub struct ServiceProxy {
    connection: Connection,
    service: String,
    caller: String,
    trace_id: String,
    span_id: String,
    timeout: Duration,
}

impl ServiceProxy {
    /// Creates a proxy for `service`, identifying this process as
    /// `caller`, over a fresh TCP connection to the given endpoints.
    pub fn new(
        configs: Vec<EndpointConfig>,
        service: impl Into<String>,
        caller: impl Into<String>,
    ) -> Self {
        Self::from_connection(Connection::new(configs), service, caller)
    }

    /// Creates a proxy over an existing connection, which may carry an
    /// injected transport, encryption implementation or codec overrides.
    pub fn from_connection(
        connection: Connection,
        service: impl Into<String>,
        caller: impl Into<String>,
    ) -> Self {
        ServiceProxy {
            connection,
            service: service.into(),
            caller: caller.into(),
            trace_id: String::new(),
            span_id: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Target service name (the request's `p` field).
    pub fn service_name(&self) -> &str {
        &self.service
    }

    /// Caller identity (the request's `f` field).
    pub fn caller_service_name(&self) -> &str {
        &self.caller
    }

    pub fn set_trace_id(&mut self, trace_id: impl Into<String>) {
        self.trace_id = trace_id.into();
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn set_span_id(&mut self, span_id: impl Into<String>) {
        self.span_id = span_id.into();
    }

    pub fn span_id(&self) -> &str {
        &self.span_id
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// The underlying connection, for registering codec overrides or
    /// adjusting compression.
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    /// Performs one synchronous round trip: connect (or reuse the live
    /// connection), send the request envelope, block for the response,
    /// classify it.
    ///
    /// # Errors
    ///
    /// - [`RpcError::Connect`] - no endpoint reachable after retries
    /// - [`RpcError::Send`] - write failed even after one reconnect
    /// - [`RpcError::Response`] - empty, timed out or malformed response
    /// - [`RpcError::Framing`] - malformed frame length
    /// - [`RpcError::Business`] - the service reported a domain failure
    /// - [`RpcError::Protocol`] - any other non-success response kind
    pub fn invoke(&mut self, method: &str, args: RpcArgs) -> Result<Value> {
        self.connection.connect()?;

        let request = CallRequest::new(self.service.as_str(), method, args)
            .from_service(self.caller.as_str())
            .with_trace_id(self.trace_id.as_str())
            .with_span_id(self.span_id.as_str());
        let envelope = serde_json::to_value(&request)
            .map_err(|e| RpcError::Send(format!("envelope encode failure: {e}")))?;

        self.connection.send(&envelope)?;

        let Some(raw) = self.connection.recv(self.timeout)? else {
            return Err(RpcError::Response(format!(
                "response is empty: {}",
                self.connection.last_error()
            )));
        };

        let response: CallResponse = serde_json::from_value(raw)
            .map_err(|e| RpcError::Response(format!("response decode failure: {e}")))?;
        response.into_result()
    }

    /// Closes the underlying connection. Terminal.
    pub fn close(&mut self) {
        self.connection.close();
    }
}
