//! Sealrpc Client
//!
//! A synchronous RPC client speaking the sealrpc wire protocol: encrypted,
//! optionally gzip-compressed, length-prefixed frames over TCP, with
//! multi-endpoint failover and distributed-trace propagation.
//!
//! # Concurrency model
//!
//! Each [`Connection`]/[`ServiceProxy`] pair is one logical, single-flight
//! channel: send, then a blocking receive, at most one call in flight. An
//! instance is not safe for concurrent use; concurrent call flows need
//! separate instances.
//!
//! # Example
//!
//! ```no_run
//! use sealrpc_client::{EndpointConfig, ServiceProxy};
//! use serde_json::json;
//!
//! let endpoints = vec![
//!     EndpointConfig::new("10.0.0.1", 9901, "secret"),
//!     EndpointConfig::new("10.0.0.2", 9901, "secret"),
//! ];
//!
//! let mut proxy = ServiceProxy::new(endpoints, "UserService", "Gateway");
//! proxy.set_trace_id("trace-8f2a");
//! let balance = proxy.invoke("balance", vec![json!("alice")]).unwrap();
//! ```

pub mod config;
pub mod connection;
pub mod selector;
pub mod service;
pub mod transport;

pub use config::EndpointConfig;
pub use connection::{Connection, ConnectionState, PackOverride, UnpackOverride};
pub use selector::EndpointSelector;
pub use service::ServiceProxy;
pub use transport::{TcpTransport, Transport, TransportError};
