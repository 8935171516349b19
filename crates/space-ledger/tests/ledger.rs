//! End-to-end tests for the ledger over both store backends.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use space_ledger::core::{builder, InboxAuthPolicy, InboxId, SpaceEvent};
use space_ledger::keys::{decrypt_message, encrypt_message, EncryptionKeypair};
use space_ledger::state::{apply_event, IdentityKey, ProofRegistry, Role, SpaceState, StateError};
use space_ledger::store::{
    EventStore, EventStoreExt, MemoryStore, SqliteStore, StoreError, StoredEvent,
};
use space_ledger::{
    AccountAddress, Identity, IdentityVerifier, LedgerConfig, LedgerError, NewInbox, SpaceId,
    SpaceKey, SpaceLedger,
};
use space_ledger_testkit::{registry_with, TestAccount};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn memory_ledger(accounts: &[&TestAccount]) -> SpaceLedger<MemoryStore, ProofRegistry> {
    SpaceLedger::new(
        MemoryStore::new(),
        registry_with(accounts),
        LedgerConfig::default(),
    )
}

#[tokio::test]
async fn test_alice_bob_scenario() {
    init_tracing();
    let alice = TestAccount::new();
    let bob = TestAccount::new();
    let ledger = memory_ledger(&[&alice, &bob]);

    let space = ledger.create_space(&alice.author()).await.unwrap();
    let space_id = space.space_id.clone();

    let invited = ledger
        .create_invitation(&space_id, &alice.author(), &bob.identity())
        .await
        .unwrap();
    assert_eq!(invited.counter, 2);
    assert_eq!(invited.state.invitations.len(), 1);

    let accepted = ledger.accept_invitation(&space_id, &bob.author()).await.unwrap();
    assert_eq!(accepted.counter, 3);
    assert!(accepted.state.invitations.is_empty());
    assert_eq!(accepted.state.members.len(), 2);
    assert_eq!(accepted.state.member(&bob.address()).unwrap().role, Role::Member);

    // Alice wraps a space key for both members.
    let key = SpaceKey::generate();
    let boxes = ledger
        .distribute_key(
            &space_id,
            &key,
            &[alice.identity(), bob.identity()],
            alice.private_key(),
        )
        .await
        .unwrap();
    assert_eq!(boxes.len(), 2);

    let bobs_key = ledger
        .open_key_box(&space_id, &bob.address(), bob.private_key())
        .await
        .unwrap();
    assert_eq!(bobs_key, key);

    let sealed = encrypt_message(b"Hello, World!", bobs_key.as_bytes()).unwrap();
    assert_eq!(sealed.len(), 24 + 13 + 16);
    let opened = decrypt_message(&sealed, key.as_bytes()).unwrap();
    assert_eq!(opened, b"Hello, World!");

    // The stored head matches a full re-verification of the chain.
    let replayed = ledger.replay(&space_id).await.unwrap();
    assert_eq!(replayed, accepted.state);

    let deleted = ledger.delete_space(&space_id, &alice.author()).await.unwrap();
    assert!(deleted.state.members.is_empty());
    assert_eq!(deleted.state.removed_members.len(), 2);
    assert!(deleted.state.removed_members.contains_key(&bob.address()));
}

#[tokio::test]
async fn test_member_cannot_invite() {
    let alice = TestAccount::new();
    let bob = TestAccount::new();
    let carol = TestAccount::new();
    let ledger = memory_ledger(&[&alice, &bob, &carol]);

    let space = ledger.create_space(&alice.author()).await.unwrap();
    ledger
        .create_invitation(&space.space_id, &alice.author(), &bob.identity())
        .await
        .unwrap();
    ledger
        .accept_invitation(&space.space_id, &bob.author())
        .await
        .unwrap();

    let result = ledger
        .create_invitation(&space.space_id, &bob.author(), &carol.identity())
        .await;
    assert!(matches!(
        result,
        Err(LedgerError::State(StateError::InvalidEvent(_)))
    ));
    assert_eq!(ledger.store().head_counter(&space.space_id).await.unwrap(), 3);
}

#[tokio::test]
async fn test_cannot_reinvite_member_or_accept_twice() {
    let alice = TestAccount::new();
    let bob = TestAccount::new();
    let ledger = memory_ledger(&[&alice, &bob]);
    let space = ledger.create_space(&alice.author()).await.unwrap();
    let space_id = space.space_id;

    ledger
        .create_invitation(&space_id, &alice.author(), &bob.identity())
        .await
        .unwrap();
    ledger.accept_invitation(&space_id, &bob.author()).await.unwrap();

    let again = ledger.accept_invitation(&space_id, &bob.author()).await;
    assert!(again.unwrap_err().is_rejection());

    let reinvite = ledger
        .create_invitation(&space_id, &alice.author(), &bob.identity())
        .await;
    assert!(reinvite.unwrap_err().is_rejection());
}

#[tokio::test]
async fn test_delete_space_ends_chain() {
    let alice = TestAccount::new();
    let bob = TestAccount::new();
    let ledger = memory_ledger(&[&alice, &bob]);
    let space = ledger.create_space(&alice.author()).await.unwrap();
    let space_id = space.space_id;

    let deleted = ledger.delete_space(&space_id, &alice.author()).await.unwrap();
    assert!(deleted.state.members.is_empty());
    assert!(deleted.state.removed_members.contains_key(&alice.address()));

    let result = ledger
        .create_invitation(&space_id, &alice.author(), &bob.identity())
        .await;
    assert!(result.unwrap_err().is_rejection());
}

#[tokio::test]
async fn test_create_space_inbox() {
    let alice = TestAccount::new();
    let ledger = memory_ledger(&[&alice]);
    let space = ledger.create_space(&alice.author()).await.unwrap();

    let inbox = NewInbox {
        id: InboxId::generate(),
        encryption_public_key: EncryptionKeypair::generate().public_key,
        secret_key: "00ff".into(),
        is_public: true,
        auth_policy: InboxAuthPolicy::Anonymous,
    };
    let committed = ledger
        .create_space_inbox(&space.space_id, &alice.author(), &inbox)
        .await
        .unwrap();

    let stored = committed.state.inboxes.get(&inbox.id).unwrap();
    assert!(stored.is_public);
    assert_eq!(stored.created_by, alice.address());

    // The same inbox id cannot be created twice.
    let again = ledger
        .create_space_inbox(&space.space_id, &alice.author(), &inbox)
        .await;
    assert!(again.unwrap_err().is_rejection());
}

#[tokio::test]
async fn test_distribute_key_requires_membership() {
    let alice = TestAccount::new();
    let mallory = TestAccount::new();
    let ledger = memory_ledger(&[&alice, &mallory]);
    let space = ledger.create_space(&alice.author()).await.unwrap();

    let result = ledger
        .distribute_key(
            &space.space_id,
            &SpaceKey::generate(),
            &[mallory.identity()],
            alice.private_key(),
        )
        .await;
    assert!(matches!(result, Err(LedgerError::NotMember { .. })));

    let result = ledger
        .open_key_box(&space.space_id, &mallory.address(), mallory.private_key())
        .await;
    assert!(matches!(result, Err(LedgerError::NoKeyBox { .. })));
}

#[tokio::test]
async fn test_distribute_key_rejects_substituted_encryption_key() {
    let alice = TestAccount::new();
    let bob = TestAccount::new();
    let mallory = EncryptionKeypair::generate();
    let ledger = memory_ledger(&[&alice, &bob]);
    let space = ledger.create_space(&alice.author()).await.unwrap();
    ledger
        .create_invitation(&space.space_id, &alice.author(), &bob.identity())
        .await
        .unwrap();
    ledger
        .accept_invitation(&space.space_id, &bob.author())
        .await
        .unwrap();

    // Bob's address and signing key, someone else's encryption key.
    let substituted = Identity {
        encryption_public_key: mallory.public_key,
        ..bob.identity()
    };
    let result = ledger
        .distribute_key(
            &space.space_id,
            &SpaceKey::generate(),
            &[alice.identity(), substituted],
            alice.private_key(),
        )
        .await;
    assert!(matches!(
        result,
        Err(LedgerError::State(StateError::InvalidIdentity(_)))
    ));

    // Nothing was stored, not even Alice's box.
    for (account, private_key) in [
        (alice.address(), alice.private_key()),
        (bob.address(), &mallory.private_key),
    ] {
        let result = ledger
            .open_key_box(&space.space_id, &account, private_key)
            .await;
        assert!(matches!(result, Err(LedgerError::NoKeyBox { .. })));
    }
}

#[tokio::test]
async fn test_key_box_for_wrong_private_key() {
    let alice = TestAccount::new();
    let ledger = memory_ledger(&[&alice]);
    let space = ledger.create_space(&alice.author()).await.unwrap();

    ledger
        .distribute_key(
            &space.space_id,
            &SpaceKey::generate(),
            &[alice.identity()],
            alice.private_key(),
        )
        .await
        .unwrap();

    let stranger = EncryptionKeypair::generate();
    let result = ledger
        .open_key_box(&space.space_id, &alice.address(), &stranger.private_key)
        .await;
    assert!(matches!(result, Err(LedgerError::Keys(_))));
}

#[tokio::test]
async fn test_ingest_external_chain() {
    let alice = TestAccount::new();
    let bob = TestAccount::new();
    let registry = registry_with(&[&alice, &bob]);
    let chain = space_ledger_testkit::space_with_members(&alice, &[&bob], &registry).await;

    let ledger = SpaceLedger::new(MemoryStore::new(), registry, LedgerConfig::default());
    for (i, event) in chain.events.iter().enumerate() {
        let committed = ledger.ingest(&chain.space_id, event).await.unwrap();
        assert_eq!(committed.counter, i as u64 + 1);
    }
    assert_eq!(
        ledger.state(&chain.space_id).await.unwrap().unwrap(),
        chain.state
    );

    // Re-ingesting an already applied event no longer links to the head.
    let result = ledger.ingest(&chain.space_id, &chain.events[1]).await;
    assert!(matches!(
        result,
        Err(LedgerError::State(StateError::InvalidEvent(_)))
    ));
}

#[tokio::test]
async fn test_forged_signature_rejected() {
    let alice = TestAccount::new();
    let ledger = memory_ledger(&[&alice]);
    let space = ledger.create_space(&alice.author()).await.unwrap();

    let mut event = builder::delete_space(
        &alice.author(),
        &space.space_id,
        space.state.last_event_hash,
    )
    .unwrap();
    // Someone else signs Alice's transaction.
    let mallory = TestAccount::new().author();
    event.author.signature = builder::sign_transaction(&mallory, event.transaction.clone())
        .unwrap()
        .author
        .signature;

    let result = ledger.ingest(&space.space_id, &event).await;
    assert!(matches!(
        result,
        Err(LedgerError::State(StateError::VerifySignature(_)))
    ));
}

/// Never answers.
struct Stalled;

#[async_trait::async_trait]
impl IdentityVerifier for Stalled {
    async fn verify(
        &self,
        _: &AccountAddress,
        _: &IdentityKey,
    ) -> space_ledger::state::Result<Identity> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_verifier_timeout_rejects() {
    let alice = TestAccount::new();
    let config = LedgerConfig {
        verify_timeout: Duration::from_millis(50),
        ..LedgerConfig::default()
    };
    let ledger = SpaceLedger::new(MemoryStore::new(), Stalled, config);

    let result = ledger.create_space(&alice.author()).await;
    assert!(matches!(
        result,
        Err(LedgerError::State(StateError::InvalidIdentity(_)))
    ));
    assert!(ledger.list_spaces().await.unwrap().is_empty());
}

/// Lets another writer win the next append race.
struct Interloper<S> {
    inner: S,
    pending: Mutex<Option<(SpaceEvent, SpaceState)>>,
}

#[async_trait::async_trait]
impl<S: EventStore> EventStore for Interloper<S> {
    async fn append_event(
        &self,
        space_id: &SpaceId,
        event: &SpaceEvent,
        counter: u64,
        state: &SpaceState,
    ) -> space_ledger::store::Result<()> {
        let pending = self.pending.lock().unwrap().take();
        if let Some((theirs, their_state)) = pending {
            self.inner
                .append_event(space_id, &theirs, counter, &their_state)
                .await?;
        }
        self.inner.append_event(space_id, event, counter, state).await
    }

    async fn get_latest_event(
        &self,
        space_id: &SpaceId,
    ) -> space_ledger::store::Result<Option<StoredEvent>> {
        self.inner.get_latest_event(space_id).await
    }

    async fn list_events(
        &self,
        space_id: &SpaceId,
    ) -> space_ledger::store::Result<Vec<SpaceEvent>> {
        self.inner.list_events(space_id).await
    }

    async fn list_spaces(&self) -> space_ledger::store::Result<Vec<SpaceId>> {
        self.inner.list_spaces().await
    }

    async fn put_key_boxes(
        &self,
        boxes: &[space_ledger::KeyBox],
    ) -> space_ledger::store::Result<()> {
        self.inner.put_key_boxes(boxes).await
    }

    async fn key_boxes_for(
        &self,
        space_id: &SpaceId,
        recipient: &AccountAddress,
    ) -> space_ledger::store::Result<Vec<space_ledger::KeyBox>> {
        self.inner.key_boxes_for(space_id, recipient).await
    }
}

#[tokio::test]
async fn test_lost_race_retries_against_new_head() {
    init_tracing();
    let alice = TestAccount::new();
    let bob = TestAccount::new();
    let carol = TestAccount::new();
    let registry = Arc::new(registry_with(&[&alice, &bob, &carol]));
    let store = Arc::new(MemoryStore::new());

    let first = SpaceLedger::new(store.clone(), registry.clone(), LedgerConfig::default());
    let space = first.create_space(&alice.author()).await.unwrap();

    // A competing writer invites Carol against the same head.
    let theirs = builder::create_invitation(
        &alice.author(),
        space.state.last_event_hash,
        &carol.identity(),
    )
    .unwrap();
    let their_state = apply_event(Some(&space.state), &theirs, &registry).await.unwrap();

    let racing = SpaceLedger::new(
        Interloper {
            inner: store.clone(),
            pending: Mutex::new(Some((theirs.clone(), their_state))),
        },
        registry.clone(),
        LedgerConfig::default(),
    );

    let ours = racing
        .create_invitation(&space.space_id, &alice.author(), &bob.identity())
        .await
        .unwrap();
    assert_eq!(ours.counter, 3);
    assert_eq!(
        ours.event.transaction.previous_event_hash(),
        Some(&theirs.hash().unwrap())
    );
    assert!(ours.state.invitation_for(&bob.address()).is_some());
    assert!(ours.state.invitation_for(&carol.address()).is_some());

    let replayed = first.replay(&space.space_id).await.unwrap();
    assert_eq!(replayed, ours.state);
}

#[tokio::test]
async fn test_conflict_exhausts_retries() {
    let alice = TestAccount::new();
    let bob = TestAccount::new();
    let registry = registry_with(&[&alice, &bob]);

    /// Every append loses.
    struct AlwaysBehind(MemoryStore);

    #[async_trait::async_trait]
    impl EventStore for AlwaysBehind {
        async fn append_event(
            &self,
            space_id: &SpaceId,
            event: &SpaceEvent,
            counter: u64,
            state: &SpaceState,
        ) -> space_ledger::store::Result<()> {
            if counter == 1 {
                return self.0.append_event(space_id, event, counter, state).await;
            }
            Err(StoreError::Conflict {
                space_id: space_id.to_string(),
                expected: counter + 1,
                actual: counter,
            })
        }

        async fn get_latest_event(
            &self,
            space_id: &SpaceId,
        ) -> space_ledger::store::Result<Option<StoredEvent>> {
            self.0.get_latest_event(space_id).await
        }

        async fn list_events(
            &self,
            space_id: &SpaceId,
        ) -> space_ledger::store::Result<Vec<SpaceEvent>> {
            self.0.list_events(space_id).await
        }

        async fn list_spaces(&self) -> space_ledger::store::Result<Vec<SpaceId>> {
            self.0.list_spaces().await
        }

        async fn put_key_boxes(
            &self,
            boxes: &[space_ledger::KeyBox],
        ) -> space_ledger::store::Result<()> {
            self.0.put_key_boxes(boxes).await
        }

        async fn key_boxes_for(
            &self,
            space_id: &SpaceId,
            recipient: &AccountAddress,
        ) -> space_ledger::store::Result<Vec<space_ledger::KeyBox>> {
            self.0.key_boxes_for(space_id, recipient).await
        }
    }

    let config = LedgerConfig {
        max_retries: 2,
        retry_backoff: Duration::from_millis(1),
        ..LedgerConfig::default()
    };
    let ledger = SpaceLedger::new(AlwaysBehind(MemoryStore::new()), registry, config);
    let space = ledger.create_space(&alice.author()).await.unwrap();

    let result = ledger
        .create_invitation(&space.space_id, &alice.author(), &bob.identity())
        .await;
    assert!(matches!(result, Err(LedgerError::Conflict { attempts: 3, .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_writers_converge() {
    let alice = TestAccount::new();
    let guests: Vec<TestAccount> = (0..6).map(|_| TestAccount::new()).collect();
    let mut all: Vec<&TestAccount> = vec![&alice];
    all.extend(guests.iter());
    let registry = Arc::new(registry_with(&all));
    let store = Arc::new(MemoryStore::new());
    let config = LedgerConfig {
        max_retries: 10,
        retry_backoff: Duration::from_millis(1),
        ..LedgerConfig::default()
    };

    let setup = SpaceLedger::new(store.clone(), registry.clone(), config.clone());
    let space = setup.create_space(&alice.author()).await.unwrap();

    let mut handles = Vec::new();
    for batch in guests.chunks(3) {
        let ledger = SpaceLedger::new(store.clone(), registry.clone(), config.clone());
        let space_id = space.space_id.clone();
        let author = alice.author();
        let invitees: Vec<Identity> = batch.iter().map(|g| g.identity()).collect();
        handles.push(tokio::spawn(async move {
            for invitee in &invitees {
                ledger
                    .create_invitation(&space_id, &author, invitee)
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let state = setup.state(&space.space_id).await.unwrap().unwrap();
    assert_eq!(state.invitations.len(), guests.len());
    assert_eq!(setup.store().head_counter(&space.space_id).await.unwrap(), 7);
    assert_eq!(setup.replay(&space.space_id).await.unwrap(), state);
}

async fn assert_conflict_detected<S: EventStore>(store: S) {
    let alice = TestAccount::new();
    let bob = TestAccount::new();
    let registry = registry_with(&[&alice, &bob]);
    let ledger = SpaceLedger::new(store, registry, LedgerConfig::default());

    let space = ledger.create_space(&alice.author()).await.unwrap();
    let invite = ledger
        .create_invitation(&space.space_id, &alice.author(), &bob.identity())
        .await
        .unwrap();

    // A writer still holding counter 1 as its head.
    let stale = ledger
        .store()
        .append_event(&space.space_id, &invite.event, 2, &invite.state)
        .await;
    assert!(matches!(
        stale,
        Err(StoreError::Conflict { expected: 3, actual: 2, .. })
    ));
    assert_eq!(ledger.store().list_events(&space.space_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_conflict_parity_memory() {
    assert_conflict_detected(MemoryStore::new()).await;
}

#[tokio::test]
async fn test_conflict_parity_sqlite() {
    assert_conflict_detected(SqliteStore::open_memory().unwrap()).await;
}

#[tokio::test]
async fn test_sqlite_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let alice = TestAccount::with_seed(1);
    let bob = TestAccount::with_seed(2);

    let (space_id, expected) = {
        let ledger = SpaceLedger::new(
            SqliteStore::open(&path).unwrap(),
            registry_with(&[&alice, &bob]),
            LedgerConfig::default(),
        );
        let space = ledger.create_space(&alice.author()).await.unwrap();
        ledger
            .create_invitation(&space.space_id, &alice.author(), &bob.identity())
            .await
            .unwrap();
        let accepted = ledger
            .accept_invitation(&space.space_id, &bob.author())
            .await
            .unwrap();
        ledger
            .distribute_key(
                &space.space_id,
                &SpaceKey::from_bytes([9; 32]),
                &[bob.identity()],
                alice.private_key(),
            )
            .await
            .unwrap();
        (space.space_id, accepted.state)
    };

    let ledger = SpaceLedger::new(
        SqliteStore::open(&path).unwrap(),
        registry_with(&[&alice, &bob]),
        LedgerConfig::default(),
    );
    assert_eq!(ledger.state(&space_id).await.unwrap().unwrap(), expected);
    assert_eq!(ledger.replay(&space_id).await.unwrap(), expected);

    let key = ledger
        .open_key_box(&space_id, &bob.address(), bob.private_key())
        .await
        .unwrap();
    assert_eq!(key, SpaceKey::from_bytes([9; 32]));
}
