//! Sealrpc Protocol Types and Frame Codec
//!
//! This crate provides the shared protocol vocabulary for the sealrpc
//! client: request/response envelopes, the error taxonomy, the wire frame
//! codec and the encryption seam.
//!
//! # Overview
//!
//! Sealrpc speaks a compact binary wire protocol: a JSON envelope is
//! encrypted with a caller-supplied algorithm, optionally gzip-compressed,
//! and framed with a big-endian length prefix. The header format evolved
//! from a single length field to a length + compression-flag pair; the
//! codec detects both layouts so old peers keep working.
//!
//! # Components
//!
//! - [`protocol`] - Envelope types ([`CallRequest`], [`CallResponse`]) and
//!   the [`RpcError`] taxonomy
//! - [`frame`] - Frame encoding/decoding with compression and the
//!   frame-boundary reader
//! - [`crypto`] - The [`Encryption`](crypto::Encryption) collaborator trait
//!
//! # Example
//!
//! ```
//! use sealrpc_common::{CallRequest, frame, crypto::Plaintext};
//! use sealrpc_common::frame::Compression;
//! use serde_json::json;
//!
//! let request = CallRequest::new("UserService", "balance", vec![json!(42)]);
//! let envelope = serde_json::to_value(&request).unwrap();
//!
//! let bytes = frame::pack(&envelope, "key", "aes", true, Compression::None, &Plaintext).unwrap();
//! let unpacked = frame::unpack(&bytes, "key", "aes", true, &Plaintext).unwrap();
//! assert_eq!(unpacked.envelope, envelope);
//! ```

pub mod crypto;
pub mod frame;
pub mod protocol;

pub use protocol::*;
