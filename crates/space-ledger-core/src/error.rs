//! Error types for the space ledger core.

use thiserror::Error;

/// Errors raised by encoding, signing and identity-proof primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid private key")]
    InvalidPrivateKey,

    #[error("invalid account address: {0}")]
    InvalidAccountAddress(String),

    #[error("identity proof rejected: {0}")]
    InvalidProof(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
