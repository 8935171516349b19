//! Error types for applying events.

use thiserror::Error;

/// Why an event was rejected.
///
/// Every variant is fatal for the event in question: a rejected event is
/// never persisted and never advances the chain head.
#[derive(Debug, Error)]
pub enum StateError {
    /// The signature is malformed or does not recover to the claimed author.
    #[error("signature verification failed: {0}")]
    VerifySignature(String),

    /// The author's account/key binding could not be proven.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// Chain integrity or authorization violation.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("core error: {0}")]
    Core(#[from] space_ledger_core::CoreError),
}

/// Result type for state operations.
pub type Result<T> = std::result::Result<T, StateError>;
