//! # Space Ledger Core
//!
//! Pure primitives for the space ledger: canonical encoding, recoverable
//! signatures, identity proofs, events and their constructors.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`SpaceEvent`] - A signed, hash-chained change to a space
//! - [`SpaceTransaction`] - The closed set of state changes
//! - [`EventHash`] - BLAKE3 digest linking an event to its predecessor
//! - [`AccountAddress`] - Ethereum-style account identifier
//!
//! ## Canonicalization
//!
//! Events are hashed and signed over canonical JSON. See [`canonical`].

#[macro_use]
mod macros;

pub mod builder;
pub mod canonical;
pub mod crypto;
pub mod error;
pub mod event;
pub mod identity;
pub mod types;

pub use builder::{
    accept_invitation, create_invitation, create_invitation_with_secret, create_space,
    create_space_inbox, delete_space, sign_transaction, Author,
};
pub use canonical::{canonicalize, canonicalize_value};
pub use crypto::{
    recover_public_key, sign, verify, EventHash, RecoverableSignature, SignatureKeypair,
    SignaturePublicKey,
};
pub use error::{CoreError, Result};
pub use event::{hash_event, EventAuthor, InboxAuthPolicy, SpaceEvent, SpaceTransaction};
pub use identity::{
    account_proof_message, key_proof_message, AccountAddress, Identity, IdentityProofs,
};
pub use types::{EncryptionPublicKey, EventId, InboxId, InvitationId, SpaceId};
