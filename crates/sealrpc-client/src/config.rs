use serde::{Deserialize, Serialize};

fn default_algorithm() -> String {
    "aes".to_string()
}

fn default_use_public_key() -> bool {
    true
}

/// One reachable endpoint plus its encryption parameters.
///
/// Endpoint sets are supplied at [`Connection`](crate::Connection)
/// construction and never mutated afterwards. The struct deserializes
/// straight from a JSON configuration document:
///
/// ```
/// use sealrpc_client::EndpointConfig;
///
/// let config: EndpointConfig = serde_json::from_str(r#"{
///     "host": "10.0.0.1",
///     "port": 9901,
///     "secret_key": "U0ZLf0s8NQ"
/// }"#).unwrap();
/// assert_eq!(config.algorithm, "aes");
/// assert!(config.use_public_key);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointConfig {
    pub host: String,
    pub port: u16,
    /// Key material handed to the encryption collaborator; for asymmetric
    /// algorithms this is the client-side half of the pair.
    pub secret_key: String,
    /// Opaque algorithm name interpreted by the injected
    /// [`Encryption`](sealrpc_common::crypto::Encryption) implementation.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    #[serde(default = "default_use_public_key")]
    pub use_public_key: bool,
}

impl EndpointConfig {
    /// Creates a config with the default algorithm (`"aes"`) and
    /// public-key encryption enabled.
    pub fn new(host: impl Into<String>, port: u16, secret_key: impl Into<String>) -> Self {
        EndpointConfig {
            host: host.into(),
            port,
            secret_key: secret_key.into(),
            algorithm: default_algorithm(),
            use_public_key: default_use_public_key(),
        }
    }

    /// Overrides the encryption algorithm name.
    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = algorithm.into();
        self
    }

    /// `host:port` for diagnostics.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied_on_deserialize() {
        let config: EndpointConfig = serde_json::from_str(
            r#"{"host": "127.0.0.1", "port": 9901, "secret_key": "k"}"#,
        )
        .unwrap();
        assert_eq!(config.algorithm, "aes");
        assert!(config.use_public_key);
    }

    #[test]
    fn test_explicit_algorithm_kept() {
        let config: EndpointConfig = serde_json::from_str(
            r#"{"host": "h", "port": 1, "secret_key": "k", "algorithm": "rsa", "use_public_key": false}"#,
        )
        .unwrap();
        assert_eq!(config.algorithm, "rsa");
        assert!(!config.use_public_key);
    }

    #[test]
    fn test_address_format() {
        let config = EndpointConfig::new("10.0.0.1", 9901, "k");
        assert_eq!(config.address(), "10.0.0.1:9901");
    }
}
