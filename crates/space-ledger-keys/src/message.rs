//! Symmetric message encryption.
//!
//! Wire format: `nonce(24) || ciphertext || tag(16)`. The nonce is random
//! per message.

use crate::crypto::{generate_nonce, SymmetricKey, NONCE_LEN, TAG_LEN};
use crate::error::{KeysError, Result};

/// Encrypt `plaintext` under a 32-byte key.
pub fn encrypt_message(plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let key = SymmetricKey::from_slice(key)?;
    let nonce = generate_nonce();
    let ciphertext = key.encrypt(plaintext, &nonce)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt output of [`encrypt_message`].
pub fn decrypt_message(data: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let key = SymmetricKey::from_slice(key)?;
    if data.len() < NONCE_LEN + TAG_LEN {
        return Err(KeysError::Truncated(data.len()));
    }
    let (nonce, ciphertext) = data.split_at(NONCE_LEN);
    key.decrypt(ciphertext, nonce)
}
