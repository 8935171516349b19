//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: accounts with registered
//! identity proofs and valid event chains.

use space_ledger_core::{
    accept_invitation, create_invitation, create_space, AccountAddress, Author, Identity,
    IdentityProofs, SignatureKeypair, SpaceEvent, SpaceId, SpaceTransaction,
};
use space_ledger_keys::{EncryptionKeypair, EncryptionPrivateKey};
use space_ledger_state::{apply_event, ProofRegistry, SpaceState};

/// An account with its own signer, an app signing key and an encryption
/// keypair.
pub struct TestAccount {
    /// Controls the account address.
    pub account_signer: SignatureKeypair,
    /// Signs events on behalf of the account.
    pub app_key: SignatureKeypair,
    pub encryption: EncryptionKeypair,
    pub app_id: String,
}

impl TestAccount {
    /// Create an account with random keys.
    pub fn new() -> Self {
        Self {
            account_signer: SignatureKeypair::generate(),
            app_key: SignatureKeypair::generate(),
            encryption: EncryptionKeypair::generate(),
            app_id: "test-app".into(),
        }
    }

    /// Create with deterministic keys from seed.
    pub fn with_seed(seed: u8) -> Self {
        Self {
            account_signer: seeded_signer(0x11, seed),
            app_key: seeded_signer(0x22, seed),
            encryption: EncryptionKeypair::from_private(EncryptionPrivateKey::from_bytes(
                seeded(0x33, seed),
            )),
            app_id: "test-app".into(),
        }
    }

    pub fn address(&self) -> AccountAddress {
        AccountAddress::from_public_key(&self.account_signer.public_key())
            .expect("valid public key")
    }

    /// The acting party for event constructors.
    pub fn author(&self) -> Author {
        Author::new(
            self.address(),
            self.app_key.clone(),
            self.encryption.public_key,
        )
    }

    pub fn identity(&self) -> Identity {
        self.author().identity()
    }

    pub fn proofs(&self) -> IdentityProofs {
        IdentityProofs::create(&self.account_signer, &self.app_key).expect("signing proofs")
    }

    pub fn private_key(&self) -> &EncryptionPrivateKey {
        &self.encryption.private_key
    }

    /// Register this account's app key with `registry`.
    pub fn register(&self, registry: &ProofRegistry) {
        registry
            .register(self.identity(), self.proofs(), Some(self.app_id.clone()))
            .expect("registering own proofs");
    }
}

impl Default for TestAccount {
    fn default() -> Self {
        Self::new()
    }
}

fn seeded(tag: u8, seed: u8) -> [u8; 32] {
    let mut bytes = [tag; 32];
    bytes[31] = seed;
    bytes
}

fn seeded_signer(tag: u8, seed: u8) -> SignatureKeypair {
    SignatureKeypair::from_bytes(&seeded(tag, seed)).expect("seed below curve order")
}

/// Create multiple accounts for multi-party tests.
pub fn multi_party_accounts(count: usize) -> Vec<TestAccount> {
    (0..count)
        .map(|i| TestAccount::with_seed(i as u8))
        .collect()
}

/// A registry with every account registered.
pub fn registry_with(accounts: &[&TestAccount]) -> ProofRegistry {
    let registry = ProofRegistry::new();
    for account in accounts {
        account.register(&registry);
    }
    registry
}

/// A valid chain plus the state it folds to.
pub struct SpaceChain {
    pub space_id: SpaceId,
    pub events: Vec<SpaceEvent>,
    pub state: SpaceState,
}

impl SpaceChain {
    /// Fold `event` onto the chain through the reducer.
    pub async fn push(&mut self, event: SpaceEvent, registry: &ProofRegistry) {
        self.state = apply_event(Some(&self.state), &event, registry)
            .await
            .expect("fixture event applies");
        self.events.push(event);
    }
}

/// `admin` creates a space, then invites each of `members`, who accept.
///
/// All accounts must be registered in `registry`.
pub async fn space_with_members(
    admin: &TestAccount,
    members: &[&TestAccount],
    registry: &ProofRegistry,
) -> SpaceChain {
    let admin_author = admin.author();
    let genesis = create_space(&admin_author).expect("signing genesis");
    let space_id = match &genesis.transaction {
        SpaceTransaction::CreateSpace { id, .. } => id.clone(),
        _ => unreachable!("create_space builds a genesis event"),
    };
    let state = apply_event(None, &genesis, registry)
        .await
        .expect("genesis applies");

    let mut chain = SpaceChain {
        space_id,
        events: vec![genesis],
        state,
    };

    for member in members {
        let invite = create_invitation(
            &admin_author,
            chain.state.last_event_hash,
            &member.identity(),
        )
        .expect("signing invitation");
        chain.push(invite, registry).await;

        let accept = accept_invitation(&member.author(), chain.state.last_event_hash)
            .expect("signing acceptance");
        chain.push(accept, registry).await;
    }
    chain
}
