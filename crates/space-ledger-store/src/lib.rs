//! # Space Ledger Store
//!
//! Storage abstraction for space event chains. Provides a trait-based
//! interface with SQLite and in-memory implementations.
//!
//! ## Key Types
//!
//! - [`EventStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`StoredEvent`] - Head event of a space with its counter and state
//!
//! ## Usage
//!
//! ```rust,no_run
//! use space_ledger_store::{EventStore, SqliteStore};
//! use space_ledger_core::SpaceId;
//!
//! async fn example() {
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!     let head = store.get_latest_event(&SpaceId::new("space")).await.unwrap();
//!     println!("{:?}", head.map(|h| h.counter));
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Optimistic concurrency**: appends carry the expected counter; a
//!   mismatch returns `Conflict` and writes nothing
//! - **No validation**: stores persist what the reducer accepted; they do
//!   not re-check signatures or authorization

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{EventStore, EventStoreExt, StoredEvent};
