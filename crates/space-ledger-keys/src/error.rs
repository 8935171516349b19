//! Error types for key distribution.

use thiserror::Error;

/// Errors that can occur while wrapping, unwrapping or sealing data.
#[derive(Debug, Error)]
pub enum KeysError {
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength { expected: usize, actual: usize },

    /// Ciphertext is shorter than the fixed framing around it.
    #[error("ciphertext truncated: {0} bytes")]
    Truncated(usize),

    #[error("encryption failed")]
    EncryptionFailed,

    /// Authentication tag mismatch: wrong key, wrong nonce or tampered data.
    #[error("decryption failed")]
    DecryptionFailed,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("core error: {0}")]
    Core(#[from] space_ledger_core::CoreError),
}

/// Result type for key operations.
pub type Result<T> = std::result::Result<T, KeysError>;
