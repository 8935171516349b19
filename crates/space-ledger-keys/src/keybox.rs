//! Space keys and the key boxes that distribute them.
//!
//! A space key is a random 32-byte symmetric key. It never travels in the
//! clear: every copy is wrapped for one recipient with
//! `XChaCha20-Poly1305(BLAKE2b-256(X25519(sender, recipient)))`.
//!
//! Key boxes are created by whoever currently holds the plaintext key and
//! are read-only afterwards. Rotation is a fresh key plus a fresh set of
//! boxes; nothing here revokes an already delivered box.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use space_ledger_core::{AccountAddress, EncryptionPublicKey, EventId, Identity, SpaceId};

use crate::crypto::{generate_nonce, EncryptionPrivateKey, KEY_LEN};
use crate::error::{KeysError, Result};

/// The symmetric content key of a space.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SpaceKey([u8; KEY_LEN]);

impl SpaceKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SpaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SpaceKey(..)")
    }
}

/// A wrapped key: ciphertext plus the nonce it was sealed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBoxCiphertext {
    #[serde(with = "hex")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "hex")]
    pub nonce: Vec<u8>,
}

/// A fresh space key and its self-wrapped copy.
#[derive(Debug)]
pub struct CreatedKey {
    pub key: SpaceKey,
    pub key_box_ciphertext: Vec<u8>,
    pub key_box_nonce: Vec<u8>,
}

/// Generate a space key and wrap it to the creator's own public key.
pub fn create_key(
    creator_public: &EncryptionPublicKey,
    creator_private: &EncryptionPrivateKey,
) -> Result<CreatedKey> {
    let key = SpaceKey::generate();
    let boxed = encrypt_key(&key, creator_public, creator_private)?;

    Ok(CreatedKey {
        key,
        key_box_ciphertext: boxed.ciphertext,
        key_box_nonce: boxed.nonce,
    })
}

/// Wrap `key` for `recipient_public` using a fresh random nonce.
pub fn encrypt_key(
    key: &SpaceKey,
    recipient_public: &EncryptionPublicKey,
    sender_private: &EncryptionPrivateKey,
) -> Result<KeyBoxCiphertext> {
    let wrap_key = sender_private
        .diffie_hellman(recipient_public)
        .derive_symmetric_key();
    let nonce = generate_nonce();
    let ciphertext = wrap_key.encrypt(key.as_bytes(), &nonce)?;

    Ok(KeyBoxCiphertext {
        ciphertext,
        nonce: nonce.to_vec(),
    })
}

/// Unwrap a key box. Any tag mismatch or malformed input is an error.
pub fn decrypt_key(
    ciphertext: &[u8],
    nonce: &[u8],
    sender_public: &EncryptionPublicKey,
    recipient_private: &EncryptionPrivateKey,
) -> Result<SpaceKey> {
    let wrap_key = recipient_private
        .diffie_hellman(sender_public)
        .derive_symmetric_key();
    let mut plaintext = wrap_key.decrypt(ciphertext, nonce)?;

    let result = <[u8; KEY_LEN]>::try_from(plaintext.as_slice())
        .map(SpaceKey)
        .map_err(|_| KeysError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: plaintext.len(),
        });
    plaintext.zeroize();
    result
}

/// One wrapped copy of a space key addressed to one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyBox {
    pub id: EventId,
    pub space_id: SpaceId,
    #[serde(with = "hex")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "hex")]
    pub nonce: Vec<u8>,
    /// Encryption public key of the party that sealed the box.
    pub author_public_key: EncryptionPublicKey,
    pub recipient_account_address: AccountAddress,
}

impl KeyBox {
    /// Wrap `key` for `recipient`.
    pub fn seal(
        space_id: &SpaceId,
        key: &SpaceKey,
        recipient: &Identity,
        sender_private: &EncryptionPrivateKey,
    ) -> Result<Self> {
        let boxed = encrypt_key(key, &recipient.encryption_public_key, sender_private)?;

        Ok(Self {
            id: EventId::generate(),
            space_id: space_id.clone(),
            ciphertext: boxed.ciphertext,
            nonce: boxed.nonce,
            author_public_key: sender_private.public_key(),
            recipient_account_address: recipient.account_address.clone(),
        })
    }

    /// Unwrap with the recipient's private key.
    pub fn open(&self, recipient_private: &EncryptionPrivateKey) -> Result<SpaceKey> {
        decrypt_key(
            &self.ciphertext,
            &self.nonce,
            &self.author_public_key,
            recipient_private,
        )
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| KeysError::Serialization(e.to_string()))
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| KeysError::Serialization(e.to_string()))
    }
}

/// Seal one box per recipient, e.g. after an invitation is accepted.
pub fn rewrap_for(
    space_id: &SpaceId,
    key: &SpaceKey,
    recipients: &[Identity],
    sender_private: &EncryptionPrivateKey,
) -> Result<Vec<KeyBox>> {
    recipients
        .iter()
        .map(|recipient| KeyBox::seal(space_id, key, recipient, sender_private))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::EncryptionKeypair;
    use space_ledger_core::SignatureKeypair;

    fn identity(keys: &EncryptionKeypair) -> Identity {
        let signer = SignatureKeypair::generate();
        Identity {
            account_address: AccountAddress::from_public_key(&signer.public_key()).unwrap(),
            signature_public_key: signer.public_key(),
            encryption_public_key: keys.public_key,
        }
    }

    #[test]
    fn test_create_key_self_wraps() {
        let creator = EncryptionKeypair::generate();
        let created = create_key(&creator.public_key, &creator.private_key).unwrap();

        let opened = decrypt_key(
            &created.key_box_ciphertext,
            &created.key_box_nonce,
            &creator.public_key,
            &creator.private_key,
        )
        .unwrap();
        assert_eq!(opened, created.key);
        assert_eq!(created.key_box_nonce.len(), 24);
    }

    #[test]
    fn test_key_roundtrip_between_parties() {
        let alice = EncryptionKeypair::generate();
        let bob = EncryptionKeypair::generate();
        let key = SpaceKey::generate();

        let boxed = encrypt_key(&key, &bob.public_key, &alice.private_key).unwrap();
        let opened =
            decrypt_key(&boxed.ciphertext, &boxed.nonce, &alice.public_key, &bob.private_key)
                .unwrap();
        assert_eq!(opened, key);
    }

    #[test]
    fn test_wrong_recipient_fails() {
        let alice = EncryptionKeypair::generate();
        let bob = EncryptionKeypair::generate();
        let eve = EncryptionKeypair::generate();
        let key = SpaceKey::generate();

        let boxed = encrypt_key(&key, &bob.public_key, &alice.private_key).unwrap();
        let result =
            decrypt_key(&boxed.ciphertext, &boxed.nonce, &alice.public_key, &eve.private_key);
        assert!(matches!(result, Err(KeysError::DecryptionFailed)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let alice = EncryptionKeypair::generate();
        let bob = EncryptionKeypair::generate();
        let key = SpaceKey::generate();

        let mut boxed = encrypt_key(&key, &bob.public_key, &alice.private_key).unwrap();
        boxed.ciphertext[0] ^= 0x01;
        let result =
            decrypt_key(&boxed.ciphertext, &boxed.nonce, &alice.public_key, &bob.private_key);
        assert!(matches!(result, Err(KeysError::DecryptionFailed)));
    }

    #[test]
    fn test_tampered_nonce_fails() {
        let alice = EncryptionKeypair::generate();
        let bob = EncryptionKeypair::generate();
        let key = SpaceKey::generate();

        let mut boxed = encrypt_key(&key, &bob.public_key, &alice.private_key).unwrap();
        boxed.nonce[23] ^= 0x80;
        assert!(decrypt_key(&boxed.ciphertext, &boxed.nonce, &alice.public_key, &bob.private_key)
            .is_err());
    }

    #[test]
    fn test_truncated_inputs_fail() {
        let alice = EncryptionKeypair::generate();
        let bob = EncryptionKeypair::generate();
        let key = SpaceKey::generate();
        let boxed = encrypt_key(&key, &bob.public_key, &alice.private_key).unwrap();

        let result = decrypt_key(&boxed.ciphertext[..10], &boxed.nonce, &alice.public_key, &bob.private_key);
        assert!(matches!(result, Err(KeysError::Truncated(10))));

        let result = decrypt_key(&boxed.ciphertext, &boxed.nonce[..12], &alice.public_key, &bob.private_key);
        assert!(matches!(result, Err(KeysError::InvalidNonceLength { .. })));
    }

    #[test]
    fn test_wrong_plaintext_length_rejected() {
        let alice = EncryptionKeypair::generate();
        let bob = EncryptionKeypair::generate();

        let wrap_key = alice.private_key.diffie_hellman(&bob.public_key).derive_symmetric_key();
        let nonce = generate_nonce();
        let ciphertext = wrap_key.encrypt(&[1u8; 16], &nonce).unwrap();

        let result = decrypt_key(&ciphertext, &nonce, &alice.public_key, &bob.private_key);
        assert!(matches!(result, Err(KeysError::InvalidKeyLength { expected: 32, actual: 16 })));
    }

    #[test]
    fn test_key_box_seal_open_json() {
        let alice = EncryptionKeypair::generate();
        let bob = EncryptionKeypair::generate();
        let bob_identity = identity(&bob);
        let space = SpaceId::new("space");
        let key = SpaceKey::generate();

        let key_box = KeyBox::seal(&space, &key, &bob_identity, &alice.private_key).unwrap();
        assert_eq!(key_box.author_public_key, alice.public_key);
        assert_eq!(key_box.recipient_account_address, bob_identity.account_address);

        let json = key_box.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["nonce"].as_str().unwrap().len(), 48);
        assert!(value["recipientAccountAddress"].is_string());

        let decoded = KeyBox::from_json(&json).unwrap();
        assert_eq!(decoded.open(&bob.private_key).unwrap(), key);
    }

    #[test]
    fn test_rewrap_for_every_recipient() {
        let alice = EncryptionKeypair::generate();
        let members: Vec<EncryptionKeypair> = (0..3).map(|_| EncryptionKeypair::generate()).collect();
        let identities: Vec<Identity> = members.iter().map(identity).collect();
        let space = SpaceId::new("space");
        let key = SpaceKey::generate();

        let boxes = rewrap_for(&space, &key, &identities, &alice.private_key).unwrap();
        assert_eq!(boxes.len(), 3);
        for (key_box, member) in boxes.iter().zip(&members) {
            assert_eq!(key_box.open(&member.private_key).unwrap(), key);
        }
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = SpaceKey::from_bytes([0xaa; 32]);
        assert!(!format!("{:?}", key).contains("aa"));
    }
}
