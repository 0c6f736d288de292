use thiserror::Error;

/// Error taxonomy for the sealrpc client.
///
/// The variants split into two tiers:
///
/// - **Infrastructure failures** (`Connect`, `Send`, `Response`, `Framing`,
///   `Protocol`) - operational problems, typically logged and alerted.
/// - **Business failures** (`Business`) - explicit domain-level errors
///   reported by the remote service, expected and often user-facing.
///
/// The two tiers must never be conflated: a caller matching on
/// [`RpcError::Business`] handles an insufficient balance, not a broken
/// socket.
#[derive(Error, Debug)]
pub enum RpcError {
    /// No endpoint was reachable after the connect retries.
    #[error("connect error: {0}")]
    Connect(String),

    /// Writing the frame failed even after one reconnect-and-retry.
    #[error("send error: {0}")]
    Send(String),

    /// The response was empty, timed out or malformed.
    #[error("response error: {0}")]
    Response(String),

    /// The frame length field was malformed during unpack. Fatal, never
    /// retried.
    #[error("framing error: {0}")]
    Framing(String),

    /// Domain-level failure reported by the remote service
    /// (`type == "busi_exception"`).
    ///
    /// Canonical field order is (message, code); the wire fields are
    /// `err` and `code`.
    #[error("business error {code}: {message}")]
    Business { message: String, code: i64 },

    /// Any other non-success response type, or a protocol-level failure.
    /// Carries the server-reported kind tag and optional diagnostic trace.
    #[error("protocol error ({kind}, code {code}): {message}")]
    Protocol {
        message: String,
        code: i64,
        kind: String,
        trace: Option<String>,
    },
}

impl RpcError {
    /// True for the expected, domain-level tier of the taxonomy.
    pub fn is_business(&self) -> bool {
        matches!(self, RpcError::Business { .. })
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
