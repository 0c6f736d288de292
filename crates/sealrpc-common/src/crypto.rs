//! Encryption seam for the frame codec.
//!
//! Concrete algorithms are deliberately external: the codec only needs an
//! `encrypt`/`decrypt` pair and treats the algorithm name as an opaque
//! string chosen by the endpoint configuration (`"aes"`, `"rsa"`, ...).
//! `use_public_key` selects which half of an asymmetric key pair applies;
//! symmetric implementations are free to ignore it.

use thiserror::Error;

/// Failure inside an [`Encryption`] implementation.
///
/// Encrypt failures surface as send errors; decrypt failures are payload
/// errors and yield an empty receive result, so the caller can distinguish
/// a bad frame from a bad payload.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct CryptoError(pub String);

impl CryptoError {
    pub fn new(message: impl Into<String>) -> Self {
        CryptoError(message.into())
    }
}

/// Payload-level encryption collaborator.
///
/// Implementations must be deterministic inverses:
/// `decrypt(encrypt(p, k, a, pub), k', a, !pub) == p` for the matching key
/// material `k'` (identical key for symmetric algorithms, the paired key
/// for asymmetric ones).
pub trait Encryption: Send + Sync {
    fn encrypt(
        &self,
        plaintext: &[u8],
        key: &str,
        algorithm: &str,
        use_public_key: bool,
    ) -> Result<Vec<u8>, CryptoError>;

    fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &str,
        algorithm: &str,
        use_public_key: bool,
    ) -> Result<Vec<u8>, CryptoError>;
}

/// Identity "encryption" for development rigs and tests.
///
/// Passes bytes through unchanged whatever the key or algorithm. Never use
/// this against a production endpoint.
pub struct Plaintext;

impl Encryption for Plaintext {
    fn encrypt(
        &self,
        plaintext: &[u8],
        _key: &str,
        _algorithm: &str,
        _use_public_key: bool,
    ) -> Result<Vec<u8>, CryptoError> {
        Ok(plaintext.to_vec())
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        _key: &str,
        _algorithm: &str,
        _use_public_key: bool,
    ) -> Result<Vec<u8>, CryptoError> {
        Ok(ciphertext.to_vec())
    }
}
