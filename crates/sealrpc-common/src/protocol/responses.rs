//! RPC response envelope and its interpretation.
//!
//! A response's `type` field is a closed enumeration from the invocation
//! engine's point of view: `success`, `busi_exception`, or any other kind
//! tag, which is treated as a protocol-level failure. [`CallResponse::into_result`]
//! performs that classification.

use serde::{Deserialize, Serialize};

use super::error::RpcError;

/// Response kind reported by a successful call.
pub const TYPE_SUCCESS: &str = "success";

/// Response kind reported for an expected, domain-level failure.
pub const TYPE_BUSI_EXCEPTION: &str = "busi_exception";

/// An RPC response envelope as decoded from a frame.
///
/// # Fields
///
/// - `kind`: the `type` wire field; see [`into_result`](Self::into_result)
/// - `code`: numeric status, `0` when absent
/// - `result`: present iff the call succeeded
/// - `err`: error message, present iff the call did not succeed
/// - `trace`: optional server-side diagnostic string
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallResponse {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl CallResponse {
    /// Creates a success response carrying `result`.
    pub fn success(result: serde_json::Value) -> Self {
        CallResponse {
            kind: TYPE_SUCCESS.to_string(),
            code: 0,
            result: Some(result),
            err: None,
            trace: None,
        }
    }

    /// Creates a business-exception response with `message` and `code`.
    pub fn busi_exception(message: impl Into<String>, code: i64) -> Self {
        CallResponse {
            kind: TYPE_BUSI_EXCEPTION.to_string(),
            code,
            result: None,
            err: Some(message.into()),
            trace: None,
        }
    }

    /// Interprets the response into the error taxonomy.
    ///
    /// - `success` returns the carried result (`null` when the server sent
    ///   none)
    /// - `busi_exception` becomes [`RpcError::Business`]
    /// - any other kind becomes [`RpcError::Protocol`] with the kind tag
    ///   and optional trace preserved
    pub fn into_result(self) -> Result<serde_json::Value, RpcError> {
        match self.kind.as_str() {
            TYPE_SUCCESS => Ok(self.result.unwrap_or(serde_json::Value::Null)),
            TYPE_BUSI_EXCEPTION => Err(RpcError::Business {
                message: self.err.unwrap_or_default(),
                code: self.code,
            }),
            _ => Err(RpcError::Protocol {
                message: self.err.unwrap_or_default(),
                code: self.code,
                kind: self.kind,
                trace: self.trace,
            }),
        }
    }
}
