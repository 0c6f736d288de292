use serde::{Deserialize, Serialize};

/// Ordered, positional call arguments.
pub type RpcArgs = Vec<serde_json::Value>;

/// Protocol revision reported in every request envelope.
pub const CLIENT_VERSION: &str = "1.0";

/// An RPC request envelope.
///
/// Field names on the wire are single letters for compactness and are
/// fixed by the protocol:
///
/// | Wire key | Field          | Meaning                        |
/// |----------|----------------|--------------------------------|
/// | `p`      | `path`         | Target service name            |
/// | `m`      | `method`       | Method to invoke               |
/// | `a`      | `args`         | Positional arguments           |
/// | `t`      | `trace_id`     | Distributed-trace correlation  |
/// | `f`      | `from_service` | Caller identity                |
/// | `s`      | `span_id`      | Span within the trace          |
/// | `v`      | `version`      | Client protocol revision       |
///
/// Argument order is preserved end to end; arguments are positional, not
/// named.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallRequest {
    #[serde(rename = "p")]
    pub path: String,
    #[serde(rename = "m")]
    pub method: String,
    #[serde(rename = "a")]
    pub args: RpcArgs,
    #[serde(rename = "t", default)]
    pub trace_id: String,
    #[serde(rename = "f", default)]
    pub from_service: String,
    #[serde(rename = "s", default)]
    pub span_id: String,
    #[serde(rename = "v", default)]
    pub version: String,
}

impl CallRequest {
    /// Creates a request envelope for `path.method(args)` with empty trace
    /// context and the current [`CLIENT_VERSION`].
    pub fn new(path: impl Into<String>, method: impl Into<String>, args: RpcArgs) -> Self {
        CallRequest {
            path: path.into(),
            method: method.into(),
            args,
            trace_id: String::new(),
            from_service: String::new(),
            span_id: String::new(),
            version: CLIENT_VERSION.to_string(),
        }
    }

    /// Sets the caller identity (`f` field).
    pub fn from_service(mut self, from: impl Into<String>) -> Self {
        self.from_service = from.into();
        self
    }

    /// Sets the trace correlation id (`t` field).
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    /// Sets the span id (`s` field).
    pub fn with_span_id(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = span_id.into();
        self
    }
}
