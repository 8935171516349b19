//! Anonymous sealed boxes.
//!
//! The sender generates an ephemeral X25519 key per message, so the
//! ciphertext reveals nothing about who sent it.
//!
//! - key = `BLAKE2b-256(X25519(ephemeral, recipient))`
//! - nonce = `BLAKE2b-192(ephemeral_pk || recipient_pk)`
//! - wire = `ephemeral_pk(32) || ciphertext || tag(16)`

use space_ledger_core::EncryptionPublicKey;

use crate::crypto::{derive_nonce, EncryptionPrivateKey, EphemeralKeyPair, TAG_LEN};
use crate::error::{KeysError, Result};

const EPHEMERAL_LEN: usize = 32;

/// Seal `plaintext` to `recipient_public`.
pub fn seal(plaintext: &[u8], recipient_public: &EncryptionPublicKey) -> Result<Vec<u8>> {
    let ephemeral = EphemeralKeyPair::generate();
    let ephemeral_public = ephemeral.public_key();
    let nonce = derive_nonce(ephemeral_public.as_bytes(), recipient_public.as_bytes());
    let key = ephemeral
        .diffie_hellman(recipient_public)
        .derive_symmetric_key();

    let ciphertext = key.encrypt(plaintext, &nonce)?;

    let mut out = Vec::with_capacity(EPHEMERAL_LEN + ciphertext.len());
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Open a sealed box with the recipient's private key.
pub fn open_sealed(data: &[u8], recipient_private: &EncryptionPrivateKey) -> Result<Vec<u8>> {
    if data.len() < EPHEMERAL_LEN + TAG_LEN {
        return Err(KeysError::Truncated(data.len()));
    }
    let (ephemeral, ciphertext) = data.split_at(EPHEMERAL_LEN);
    let mut ephemeral_bytes = [0u8; EPHEMERAL_LEN];
    ephemeral_bytes.copy_from_slice(ephemeral);
    let ephemeral_public = EncryptionPublicKey::from_bytes(ephemeral_bytes);

    let recipient_public = recipient_private.public_key();
    let nonce = derive_nonce(ephemeral_public.as_bytes(), recipient_public.as_bytes());
    let key = recipient_private
        .diffie_hellman(&ephemeral_public)
        .derive_symmetric_key();

    key.decrypt(ciphertext, &nonce)
}
