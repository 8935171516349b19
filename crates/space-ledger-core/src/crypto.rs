//! Cryptographic primitives for the space ledger.
//!
//! Wraps secp256k1 recoverable ECDSA and BLAKE3 hashing with strong types.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{CoreError, Result};

/// A 32-byte BLAKE3 digest of a canonically encoded event.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventHash(pub [u8; 32]);

impl EventHash {
    /// Compute the BLAKE3 hash of the given data.
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CoreError::Decoding(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CoreError::Decoding("event hash must be 32 bytes".into()))?;
        Ok(Self(arr))
    }
}

impl_hex_serde!(EventHash);

impl fmt::Debug for EventHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for EventHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// A secp256k1 public key in 33-byte SEC1 compressed form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignaturePublicKey(pub [u8; 33]);

impl SignaturePublicKey {
    /// Create from compressed SEC1 bytes, checking the point is on the curve.
    pub fn from_bytes(bytes: [u8; 33]) -> Result<Self> {
        VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| CoreError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|_| CoreError::InvalidPublicKey)?;
        let arr: [u8; 33] = bytes.try_into().map_err(|_| CoreError::InvalidPublicKey)?;
        Self::from_bytes(arr)
    }

    /// Convert to a k256 verifying key.
    pub fn to_verifying_key(&self) -> Result<VerifyingKey> {
        VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)
    }

    /// The 65-byte uncompressed SEC1 encoding (used for address derivation).
    pub fn to_uncompressed(&self) -> Result<Vec<u8>> {
        let vk = self.to_verifying_key()?;
        Ok(vk.to_encoded_point(false).as_bytes().to_vec())
    }

    /// Verify a recoverable signature over a message.
    pub fn verify(&self, message: &[u8], signature: &RecoverableSignature) -> bool {
        verify(message, signature, self)
    }
}

impl_hex_serde!(SignaturePublicKey);

impl From<&VerifyingKey> for SignaturePublicKey {
    fn from(vk: &VerifyingKey) -> Self {
        let point = vk.to_encoded_point(true);
        let mut arr = [0u8; 33];
        arr.copy_from_slice(point.as_bytes());
        Self(arr)
    }
}

impl fmt::Debug for SignaturePublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigPub({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for SignaturePublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// A compact ECDSA signature plus the recovery indicator needed to
/// recover the signer's public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverableSignature {
    /// 64-byte `r || s`, hex encoded.
    pub hex: String,
    /// Recovery indicator, 0 or 1.
    pub recovery: u8,
}

impl RecoverableSignature {
    /// Parse into k256 signature parts.
    fn to_parts(&self) -> Result<(Signature, RecoveryId)> {
        if self.recovery > 1 {
            return Err(CoreError::InvalidSignature);
        }
        let bytes = hex::decode(&self.hex).map_err(|_| CoreError::InvalidSignature)?;
        if bytes.len() != 64 {
            return Err(CoreError::InvalidSignature);
        }
        let signature = Signature::from_slice(&bytes).map_err(|_| CoreError::InvalidSignature)?;
        let recovery_id = RecoveryId::from_byte(self.recovery).ok_or(CoreError::InvalidSignature)?;
        Ok((signature, recovery_id))
    }
}

/// Sign the SHA-256 digest of `message`.
pub fn sign(message: &[u8], private_key: &SigningKey) -> Result<RecoverableSignature> {
    let digest = Sha256::digest(message);
    let (signature, recovery_id) = private_key
        .sign_prehash_recoverable(&digest)
        .map_err(|_| CoreError::InvalidSignature)?;

    Ok(RecoverableSignature {
        hex: hex::encode(signature.to_bytes()),
        recovery: recovery_id.to_byte(),
    })
}

/// Recover the public key that produced `signature` over `message`.
pub fn recover_public_key(
    message: &[u8],
    signature: &RecoverableSignature,
) -> Result<SignaturePublicKey> {
    let (sig, recovery_id) = signature.to_parts()?;
    let digest = Sha256::digest(message);
    let vk = VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id)
        .map_err(|_| CoreError::InvalidSignature)?;
    Ok(SignaturePublicKey::from(&vk))
}

/// Check that `signature` over `message` recovers to `public_key`.
pub fn verify(
    message: &[u8],
    signature: &RecoverableSignature,
    public_key: &SignaturePublicKey,
) -> bool {
    match recover_public_key(message, signature) {
        Ok(recovered) => recovered == *public_key,
        Err(_) => false,
    }
}

/// A secp256k1 keypair used for signing events and identity proofs.
#[derive(Clone)]
pub struct SignatureKeypair {
    signing_key: SigningKey,
}

impl SignatureKeypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::rngs::OsRng);
        Self { signing_key }
    }

    /// Create from a 32-byte secret scalar.
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self> {
        let signing_key =
            SigningKey::from_bytes(secret.into()).map_err(|_| CoreError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Get the compressed public key.
    pub fn public_key(&self) -> SignaturePublicKey {
        SignaturePublicKey::from(self.signing_key.verifying_key())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Result<RecoverableSignature> {
        sign(message, &self.signing_key)
    }

    /// Get the raw secret bytes.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }
}

impl fmt::Debug for SignatureKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureKeypair({:?})", self.public_key())
    }
}
