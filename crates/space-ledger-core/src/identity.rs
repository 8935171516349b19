//! Account identities and the proofs that bind an app key to an account.
//!
//! An account is addressed by the Ethereum-style address of its primary
//! signer. Before an app signature key is trusted for that account, two
//! independent proofs must verify:
//!
//! - the account proof, signed by the primary signer, naming the app key;
//! - the key proof, signed by the app key, naming the account.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

use crate::crypto::{recover_public_key, RecoverableSignature, SignatureKeypair, SignaturePublicKey};
use crate::error::{CoreError, Result};
use crate::types::EncryptionPublicKey;

/// A `0x`-prefixed, lower-case, 20-byte hex account address.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountAddress(String);

impl AccountAddress {
    /// Derive the address controlled by a secp256k1 public key.
    ///
    /// Last 20 bytes of Keccak-256 over the uncompressed point without its
    /// `0x04` prefix.
    pub fn from_public_key(public_key: &SignaturePublicKey) -> Result<Self> {
        let uncompressed = public_key.to_uncompressed()?;
        let digest = Keccak256::digest(&uncompressed[1..]);
        Ok(Self(format!("0x{}", hex::encode(&digest[12..]))))
    }

    /// Parse and normalize an address string.
    pub fn parse(s: &str) -> Result<Self> {
        let body = s
            .strip_prefix("0x")
            .ok_or_else(|| CoreError::InvalidAccountAddress(s.to_string()))?;
        if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidAccountAddress(s.to_string()));
        }
        Ok(Self(format!("0x{}", body.to_ascii_lowercase())))
    }

    /// Borrow the address text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountAddress {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<AccountAddress> for String {
    fn from(address: AccountAddress) -> Self {
        address.0
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account({})", self.0)
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The verified public identity of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub account_address: AccountAddress,
    pub signature_public_key: SignaturePublicKey,
    pub encryption_public_key: EncryptionPublicKey,
}

/// Message signed by the account's primary signer.
pub fn account_proof_message(
    account_address: &AccountAddress,
    signature_public_key: &SignaturePublicKey,
) -> String {
    format!(
        "The app key {} is controlled by account {}",
        signature_public_key, account_address
    )
}

/// Message signed by the app signature key.
pub fn key_proof_message(
    account_address: &AccountAddress,
    signature_public_key: &SignaturePublicKey,
) -> String {
    format!(
        "The account {} controls app key {}",
        account_address, signature_public_key
    )
}

/// The pair of signatures binding an app key to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProofs {
    pub account_proof: RecoverableSignature,
    pub key_proof: RecoverableSignature,
}

impl IdentityProofs {
    /// Produce both proofs for `app_key` acting on behalf of `account_signer`.
    pub fn create(account_signer: &SignatureKeypair, app_key: &SignatureKeypair) -> Result<Self> {
        let account_address = AccountAddress::from_public_key(&account_signer.public_key())?;
        let app_public = app_key.public_key();

        let account_proof =
            account_signer.sign(account_proof_message(&account_address, &app_public).as_bytes())?;
        let key_proof = app_key.sign(key_proof_message(&account_address, &app_public).as_bytes())?;

        Ok(Self {
            account_proof,
            key_proof,
        })
    }

    /// Check both proofs against the claimed address and key.
    pub fn verify(
        &self,
        account_address: &AccountAddress,
        signature_public_key: &SignaturePublicKey,
    ) -> Result<()> {
        let account_message = account_proof_message(account_address, signature_public_key);
        let account_signer = recover_public_key(account_message.as_bytes(), &self.account_proof)
            .map_err(|_| CoreError::InvalidProof("account proof signature malformed".into()))?;
        if AccountAddress::from_public_key(&account_signer)? != *account_address {
            return Err(CoreError::InvalidProof(
                "account proof not signed by the account".into(),
            ));
        }

        let key_message = key_proof_message(account_address, signature_public_key);
        let key_signer = recover_public_key(key_message.as_bytes(), &self.key_proof)
            .map_err(|_| CoreError::InvalidProof("key proof signature malformed".into()))?;
        if key_signer != *signature_public_key {
            return Err(CoreError::InvalidProof("key proof not signed by the app key".into()));
        }

        Ok(())
    }
}
