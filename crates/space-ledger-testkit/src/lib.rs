//! # Space Ledger Testkit
//!
//! Testing utilities for the space ledger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: accounts with registered identity proofs, and valid
//!   event chains built through the reducer
//! - **Generators**: Proptest strategies for keys, hashes and authors
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use space_ledger_testkit::{registry_with, space_with_members, TestAccount};
//!
//! async fn example() {
//!     let alice = TestAccount::new();
//!     let bob = TestAccount::new();
//!     let registry = registry_with(&[&alice, &bob]);
//!
//!     let chain = space_with_members(&alice, &[&bob], &registry).await;
//!     assert_eq!(chain.state.members.len(), 2);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use space_ledger_testkit::generators::{message, signature_keypair};
//!
//! proptest! {
//!     #[test]
//!     fn signatures_verify(keypair in signature_keypair(), msg in message(64)) {
//!         let sig = keypair.sign(&msg).unwrap();
//!         prop_assert!(keypair.public_key().verify(&msg, &sig));
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    multi_party_accounts, registry_with, space_with_members, SpaceChain, TestAccount,
};
