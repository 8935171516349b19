//! # Space Ledger Keys
//!
//! Distribution of a space's symmetric key, plus the message primitives
//! that build on the same ciphers.
//!
//! ## Encryption Model
//!
//! 1. **Space Key**: a random 32-byte XChaCha20-Poly1305 key per space
//! 2. **Key Boxes**: the space key wrapped for each member via X25519 +
//!    BLAKE2b, one box per recipient
//!
//! Adding a member is a new key box, not a re-encryption of content.
//! Removing a member does not rotate the key.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use space_ledger_keys::{create_key, decrypt_key, EncryptionKeypair};
//!
//! let creator = EncryptionKeypair::generate();
//! let created = create_key(&creator.public_key, &creator.private_key).unwrap();
//! let key = decrypt_key(
//!     &created.key_box_ciphertext,
//!     &created.key_box_nonce,
//!     &creator.public_key,
//!     &creator.private_key,
//! )
//! .unwrap();
//! assert_eq!(key, created.key);
//! ```

pub mod crypto;
pub mod error;
pub mod keybox;
pub mod message;
pub mod sealed;

pub use crypto::{EncryptionKeypair, EncryptionPrivateKey, EphemeralKeyPair, SymmetricKey};
pub use error::{KeysError, Result};
pub use keybox::{
    create_key, decrypt_key, encrypt_key, rewrap_for, CreatedKey, KeyBox, KeyBoxCiphertext,
    SpaceKey,
};
pub use message::{decrypt_message, encrypt_message};
pub use sealed::{open_sealed, seal};
