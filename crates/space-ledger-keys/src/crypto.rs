//! Cryptographic utilities for key distribution.
//!
//! Provides X25519 key agreement, BLAKE2b key derivation and
//! XChaCha20-Poly1305 authenticated encryption.

use blake2::digest::consts::{U24, U32};
use blake2::{Blake2b, Digest};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use std::fmt;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use space_ledger_core::EncryptionPublicKey;

use crate::error::{KeysError, Result};

/// XChaCha20-Poly1305 nonce length.
pub const NONCE_LEN: usize = 24;

/// Symmetric key length.
pub const KEY_LEN: usize = 32;

/// Poly1305 tag length.
pub const TAG_LEN: usize = 16;

type Blake2b256 = Blake2b<U32>;
type Blake2b192 = Blake2b<U24>;

/// An X25519 private key used for key agreement.
pub struct EncryptionPrivateKey(StaticSecret);

impl EncryptionPrivateKey {
    /// Generate a new random secret.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let secret = Self(StaticSecret::from(bytes));
        bytes.zeroize();
        secret
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Get the raw secret bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Derive the public key.
    pub fn public_key(&self) -> EncryptionPublicKey {
        EncryptionPublicKey::from_bytes(*PublicKey::from(&self.0).as_bytes())
    }

    /// Perform key agreement with a peer's public key.
    pub fn diffie_hellman(&self, peer_public: &EncryptionPublicKey) -> SharedKey {
        let shared = self.0.diffie_hellman(&PublicKey::from(*peer_public.as_bytes()));
        SharedKey(*shared.as_bytes())
    }
}

impl Clone for EncryptionPrivateKey {
    fn clone(&self) -> Self {
        Self::from_bytes(self.to_bytes())
    }
}

impl fmt::Debug for EncryptionPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionPrivateKey({:?})", self.public_key())
    }
}

/// An X25519 keypair belonging to an account.
#[derive(Debug, Clone)]
pub struct EncryptionKeypair {
    pub private_key: EncryptionPrivateKey,
    pub public_key: EncryptionPublicKey,
}

impl EncryptionKeypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        Self::from_private(EncryptionPrivateKey::generate())
    }

    pub fn from_private(private_key: EncryptionPrivateKey) -> Self {
        let public_key = private_key.public_key();
        Self {
            private_key,
            public_key,
        }
    }
}

/// One-shot X25519 key for anonymous senders.
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: EncryptionPublicKey,
}

impl EphemeralKeyPair {
    /// Generate a new ephemeral key pair.
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let public = EncryptionPublicKey::from_bytes(*PublicKey::from(&secret).as_bytes());
        Self { secret, public }
    }

    pub fn public_key(&self) -> EncryptionPublicKey {
        self.public
    }

    /// Consumes the secret.
    pub fn diffie_hellman(self, peer_public: &EncryptionPublicKey) -> SharedKey {
        let shared = self
            .secret
            .diffie_hellman(&PublicKey::from(*peer_public.as_bytes()));
        SharedKey(*shared.as_bytes())
    }
}

/// Raw X25519 output. Never used as a cipher key directly.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedKey([u8; 32]);

impl SharedKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// `BLAKE2b-256(shared)`.
    pub fn derive_symmetric_key(&self) -> SymmetricKey {
        let digest = Blake2b256::digest(self.0);
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&digest);
        SymmetricKey(key)
    }
}

/// `BLAKE2b-192(first || second)`, used to derive sealed-box nonces.
pub fn derive_nonce(first: &[u8], second: &[u8]) -> [u8; NONCE_LEN] {
    let mut hasher = Blake2b192::new();
    hasher.update(first);
    hasher.update(second);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&hasher.finalize());
    nonce
}

/// Generate a random XChaCha20 nonce.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}

/// A 256-bit XChaCha20-Poly1305 key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_LEN]);

impl SymmetricKey {
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Accept only exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_LEN] = bytes.try_into().map_err(|_| KeysError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Encrypt with an explicit nonce. Output carries the 16-byte tag.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &[u8]) -> Result<Vec<u8>> {
        let nonce = check_nonce(nonce)?;
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&self.0));
        cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| KeysError::EncryptionFailed)
    }

    pub fn decrypt(&self, ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>> {
        let nonce = check_nonce(nonce)?;
        if ciphertext.len() < TAG_LEN {
            return Err(KeysError::Truncated(ciphertext.len()));
        }
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&self.0));
        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| KeysError::DecryptionFailed)
    }
}

fn check_nonce(nonce: &[u8]) -> Result<&XNonce> {
    if nonce.len() != NONCE_LEN {
        return Err(KeysError::InvalidNonceLength {
            expected: NONCE_LEN,
            actual: nonce.len(),
        });
    }
    Ok(XNonce::from_slice(nonce))
}
