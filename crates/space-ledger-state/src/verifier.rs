//! Identity verification capability.
//!
//! The reducer never trusts an `(account, key)` pair on its own. It asks an
//! injected [`IdentityVerifier`], which checks previously registered
//! proofs and returns the account's public identity.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use space_ledger_core::{AccountAddress, Identity, IdentityProofs, SignaturePublicKey};

use crate::error::{Result, StateError};

/// What the caller knows about the key it wants verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityKey {
    SignaturePublicKey(SignaturePublicKey),
    AppId(String),
}

/// Resolves and verifies an account's identity.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Return the verified identity, or `StateError::InvalidIdentity`.
    async fn verify(&self, account_address: &AccountAddress, key: &IdentityKey)
        -> Result<Identity>;
}

#[async_trait]
impl<T: IdentityVerifier + ?Sized> IdentityVerifier for Arc<T> {
    async fn verify(
        &self,
        account_address: &AccountAddress,
        key: &IdentityKey,
    ) -> Result<Identity> {
        (**self).verify(account_address, key).await
    }
}

/// Run a verification with a deadline. Elapsing is a failed verification.
pub async fn verify_with_timeout<V: IdentityVerifier + ?Sized>(
    verifier: &V,
    account_address: &AccountAddress,
    key: &IdentityKey,
    timeout: Duration,
) -> Result<Identity> {
    match tokio::time::timeout(timeout, verifier.verify(account_address, key)).await {
        Ok(result) => result,
        Err(_) => {
            debug!(account = %account_address, ?timeout, "identity verification timed out");
            Err(StateError::InvalidIdentity(format!(
                "verification of {} timed out",
                account_address
            )))
        }
    }
}

#[derive(Debug, Clone)]
struct Registration {
    identity: Identity,
    proofs: IdentityProofs,
    app_id: Option<String>,
}

/// In-process verifier backed by registered identity proofs.
///
/// Proofs are checked when registered and again on every lookup.
#[derive(Debug, Default)]
pub struct ProofRegistry {
    entries: RwLock<HashMap<AccountAddress, Vec<Registration>>>,
}

impl ProofRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an app key for an account after checking both proofs.
    pub fn register(
        &self,
        identity: Identity,
        proofs: IdentityProofs,
        app_id: Option<String>,
    ) -> Result<()> {
        proofs
            .verify(&identity.account_address, &identity.signature_public_key)
            .map_err(|e| StateError::InvalidIdentity(e.to_string()))?;

        let mut entries = self
            .entries
            .write()
            .map_err(|_| StateError::InvalidIdentity("registry lock poisoned".into()))?;
        let registrations = entries.entry(identity.account_address.clone()).or_default();
        registrations.retain(|r| r.identity.signature_public_key != identity.signature_public_key);
        registrations.push(Registration {
            identity,
            proofs,
            app_id,
        });
        Ok(())
    }

    /// Number of registered keys across all accounts.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .map(|entries| entries.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, account_address: &AccountAddress, key: &IdentityKey) -> Result<Registration> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StateError::InvalidIdentity("registry lock poisoned".into()))?;
        let registrations = entries.get(account_address).ok_or_else(|| {
            StateError::InvalidIdentity(format!("no identity registered for {}", account_address))
        })?;

        let found = registrations.iter().find(|r| match key {
            IdentityKey::SignaturePublicKey(pk) => r.identity.signature_public_key == *pk,
            IdentityKey::AppId(app_id) => r.app_id.as_deref() == Some(app_id.as_str()),
        });

        found.cloned().ok_or_else(|| {
            StateError::InvalidIdentity(format!("key not registered for {}", account_address))
        })
    }
}

#[async_trait]
impl IdentityVerifier for ProofRegistry {
    async fn verify(
        &self,
        account_address: &AccountAddress,
        key: &IdentityKey,
    ) -> Result<Identity> {
        let registration = self.lookup(account_address, key)?;
        let identity = registration.identity;

        if identity.account_address != *account_address {
            return Err(StateError::InvalidIdentity("account mismatch".into()));
        }
        registration
            .proofs
            .verify(account_address, &identity.signature_public_key)
            .map_err(|e| StateError::InvalidIdentity(e.to_string()))?;

        Ok(identity)
    }
}
