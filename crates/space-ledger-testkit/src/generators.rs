//! Proptest generators for property-based testing.

use proptest::prelude::*;

use space_ledger_core::{
    AccountAddress, Author, EncryptionPublicKey, EventHash, SignatureKeypair, SpaceId,
};
use space_ledger_keys::{EncryptionKeypair, EncryptionPrivateKey, SpaceKey};

/// Generate a random signing keypair.
pub fn signature_keypair() -> impl Strategy<Value = SignatureKeypair> {
    any::<[u8; 32]>().prop_filter_map("scalar out of range", |bytes| {
        SignatureKeypair::from_bytes(&bytes).ok()
    })
}

/// Generate a random X25519 keypair.
pub fn encryption_keypair() -> impl Strategy<Value = EncryptionKeypair> {
    any::<[u8; 32]>()
        .prop_map(|bytes| EncryptionKeypair::from_private(EncryptionPrivateKey::from_bytes(bytes)))
}

/// Generate a random space key.
pub fn space_key() -> impl Strategy<Value = SpaceKey> {
    any::<[u8; 32]>().prop_map(SpaceKey::from_bytes)
}

/// Generate a random EventHash.
pub fn event_hash() -> impl Strategy<Value = EventHash> {
    any::<[u8; 32]>().prop_map(EventHash)
}

/// Generate a space id.
pub fn space_id() -> impl Strategy<Value = SpaceId> {
    "[a-z0-9-]{1,36}".prop_map(SpaceId::new)
}

/// Generate message bytes of specified max length.
pub fn message(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate an author whose account signer differs from its app key.
pub fn author() -> impl Strategy<Value = Author> {
    (signature_keypair(), signature_keypair(), any::<[u8; 32]>()).prop_filter_map(
        "address derivation failed",
        |(account, app, encryption)| {
            let address = AccountAddress::from_public_key(&account.public_key()).ok()?;
            Some(Author::new(
                address,
                app,
                EncryptionPublicKey::from_bytes(encryption),
            ))
        },
    )
}
