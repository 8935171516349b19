//! Error types for the ledger.

use space_ledger_core::{AccountAddress, CoreError, SpaceId};
use space_ledger_keys::KeysError;
use space_ledger_state::StateError;
use space_ledger_store::StoreError;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The reducer rejected the event.
    #[error("event rejected: {0}")]
    State(#[from] StateError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Key distribution error.
    #[error("key error: {0}")]
    Keys(#[from] KeysError),

    /// Building or encoding an event failed.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Space not found.
    #[error("space not found: {0}")]
    SpaceNotFound(SpaceId),

    /// A genesis event names a different space than the one written to.
    #[error("event belongs to space {actual}, not {expected}")]
    SpaceMismatch { expected: SpaceId, actual: SpaceId },

    /// Still losing the counter race after every retry.
    #[error("conflict on space {space_id} after {attempts} attempts")]
    Conflict { space_id: SpaceId, attempts: u32 },

    /// A key was addressed to someone outside the space.
    #[error("{account} is not a member of space {space_id}")]
    NotMember {
        space_id: SpaceId,
        account: AccountAddress,
    },

    /// No key box for this account could be opened.
    #[error("no key box for {account} in space {space_id}")]
    NoKeyBox {
        space_id: SpaceId,
        account: AccountAddress,
    },
}

impl LedgerError {
    /// True if the reducer refused the event itself.
    pub fn is_rejection(&self) -> bool {
        matches!(self, LedgerError::State(_))
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
