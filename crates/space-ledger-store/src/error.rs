//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Event or state serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Another writer advanced the space first.
    #[error("conflict in space {space_id}: expected counter {expected}, got {actual}")]
    Conflict {
        space_id: String,
        expected: u64,
        actual: u64,
    },

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Poisoned lock or failed blocking task.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
