//! # Space Ledger
//!
//! The unified API for shared spaces: a per-space membership ledger of
//! signed, hash-chained events, plus the key boxes that carry the space
//! key to its members.
//!
//! ## Overview
//!
//! - **Events**: signed changes to a space, each linked to its predecessor
//!   by hash
//! - **Reducer**: folds events into [`SpaceState`], checking signatures,
//!   identity proofs and authorization
//! - **Store**: persists the chain with optimistic concurrency
//! - **Key boxes**: X25519 + XChaCha20-Poly1305 wrapping of the space key
//!
//! ## Usage
//!
//! ```rust,no_run
//! use space_ledger::{LedgerConfig, SpaceLedger};
//! use space_ledger::state::ProofRegistry;
//! use space_ledger::store::SqliteStore;
//!
//! async fn example(alice: space_ledger::core::Author) {
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!     let ledger = SpaceLedger::new(store, ProofRegistry::new(), LedgerConfig::default());
//!
//!     let space = ledger.create_space(&alice).await.unwrap();
//!     println!("created {} at counter {}", space.space_id, space.counter);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `space_ledger::core` - events, signatures, identities
//! - `space_ledger::keys` - key boxes and message encryption
//! - `space_ledger::state` - state, reducer, identity verification
//! - `space_ledger::store` - storage abstraction, SQLite and memory

pub mod config;
pub mod error;
pub mod ledger;

// Re-export component crates
pub use space_ledger_core as core;
pub use space_ledger_keys as keys;
pub use space_ledger_state as state;
pub use space_ledger_store as store;

// Re-export main types for convenience
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use ledger::{CommittedEvent, NewInbox, SpaceLedger};

// Re-export commonly used types
pub use space_ledger_core::{AccountAddress, Author, Identity, SpaceEvent, SpaceId};
pub use space_ledger_keys::{EncryptionKeypair, KeyBox, SpaceKey};
pub use space_ledger_state::{IdentityVerifier, SpaceState};
