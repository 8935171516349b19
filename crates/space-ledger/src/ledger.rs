//! The ledger: unified API over the reducer, a store and a verifier.
//!
//! Every local write follows the same optimistic cycle:
//!
//! 1. read the head of the space (`counter`, `last_event_hash`)
//! 2. build and sign the event against that head
//! 3. apply it through the reducer
//! 4. append it at `counter + 1`
//!
//! If another writer took `counter + 1` first, the store reports a
//! conflict and the cycle restarts from a fresh head. Reducer rejections
//! are returned immediately and nothing is persisted.

use std::time::Duration;

use tracing::{debug, info, warn};

use space_ledger_core::{
    builder, AccountAddress, Author, EncryptionPublicKey, Identity, InboxAuthPolicy, InboxId,
    SpaceEvent, SpaceId, SpaceTransaction,
};
use space_ledger_keys::{rewrap_for, EncryptionPrivateKey, KeyBox, KeysError, SpaceKey};
use space_ledger_state::{
    apply_event_with_timeout, verify_with_timeout, IdentityKey, IdentityVerifier, SpaceState,
    StateError,
};
use space_ledger_store::{EventStore, EventStoreExt};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};

/// An event the ledger has applied and persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedEvent {
    pub space_id: SpaceId,
    pub counter: u64,
    pub event: SpaceEvent,
    /// State after the event.
    pub state: SpaceState,
}

/// Parameters of a new space inbox.
#[derive(Debug, Clone)]
pub struct NewInbox {
    pub id: InboxId,
    pub encryption_public_key: EncryptionPublicKey,
    /// The inbox secret, already wrapped for the space.
    pub secret_key: String,
    pub is_public: bool,
    pub auth_policy: InboxAuthPolicy,
}

/// The main ledger struct.
///
/// Cheap to share across tasks when `S` is an `Arc` store: several ledgers
/// over one store behave like independent writers racing for the head.
pub struct SpaceLedger<S: EventStore, V: IdentityVerifier> {
    store: S,
    verifier: V,
    config: LedgerConfig,
}

impl<S: EventStore, V: IdentityVerifier> SpaceLedger<S, V> {
    /// Create a new ledger.
    pub fn new(store: S, verifier: V, config: LedgerConfig) -> Self {
        Self {
            store,
            verifier,
            config,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Write Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new space owned by `author`.
    pub async fn create_space(&self, author: &Author) -> Result<CommittedEvent> {
        let event = builder::create_space(author)?;
        let space_id = genesis_space_id(&event)?;
        self.ingest(&space_id, &event).await
    }

    pub async fn delete_space(
        &self,
        space_id: &SpaceId,
        author: &Author,
    ) -> Result<CommittedEvent> {
        self.submit(space_id, |state| {
            builder::delete_space(author, space_id, state.last_event_hash)
        })
        .await
    }

    /// Invite `invitee`. Only admins may invite.
    pub async fn create_invitation(
        &self,
        space_id: &SpaceId,
        author: &Author,
        invitee: &Identity,
    ) -> Result<CommittedEvent> {
        self.submit(space_id, |state| {
            builder::create_invitation(author, state.last_event_hash, invitee)
        })
        .await
    }

    /// Accept the pending invitation addressed to `author`.
    pub async fn accept_invitation(
        &self,
        space_id: &SpaceId,
        author: &Author,
    ) -> Result<CommittedEvent> {
        self.submit(space_id, |state| {
            builder::accept_invitation(author, state.last_event_hash)
        })
        .await
    }

    pub async fn create_space_inbox(
        &self,
        space_id: &SpaceId,
        author: &Author,
        inbox: &NewInbox,
    ) -> Result<CommittedEvent> {
        self.submit(space_id, |state| {
            builder::create_space_inbox(
                author,
                space_id,
                inbox.id.clone(),
                inbox.encryption_public_key,
                inbox.secret_key.clone(),
                inbox.is_public,
                inbox.auth_policy,
                state.last_event_hash,
            )
        })
        .await
    }

    /// Build, apply and append an event against the current head.
    ///
    /// `build` may be called more than once: after a lost race it is
    /// called again with the new head.
    pub async fn submit<F>(&self, space_id: &SpaceId, build: F) -> Result<CommittedEvent>
    where
        F: Fn(&SpaceState) -> space_ledger_core::Result<SpaceEvent> + Send + Sync,
    {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;

            let head = self
                .store
                .get_latest_event(space_id)
                .await?
                .ok_or_else(|| LedgerError::SpaceNotFound(space_id.clone()))?;

            let event = build(&head.state)?;
            let state = self.apply(Some(&head.state), &event).await?;
            let counter = head.counter + 1;

            match self
                .store
                .append_event(space_id, &event, counter, &state)
                .await
            {
                Ok(()) => {
                    info!(
                        space = %space_id,
                        counter,
                        kind = event.transaction.kind(),
                        attempts,
                        "event committed"
                    );
                    return Ok(CommittedEvent {
                        space_id: space_id.clone(),
                        counter,
                        event,
                        state,
                    });
                }
                Err(e) if e.is_conflict() => {
                    if attempts > self.config.max_retries {
                        warn!(space = %space_id, attempts, "giving up after repeated conflicts");
                        return Err(LedgerError::Conflict {
                            space_id: space_id.clone(),
                            attempts,
                        });
                    }
                    let delay = self.backoff(attempts);
                    warn!(
                        space = %space_id,
                        counter,
                        attempts,
                        ?delay,
                        "head moved, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Apply and persist an event built elsewhere, e.g. received from a
    /// peer. The event must extend the current head; it is not rebuilt
    /// on conflict.
    pub async fn ingest(&self, space_id: &SpaceId, event: &SpaceEvent) -> Result<CommittedEvent> {
        if event.transaction.is_genesis() {
            let actual = genesis_space_id(event)?;
            if actual != *space_id {
                return Err(LedgerError::SpaceMismatch {
                    expected: space_id.clone(),
                    actual,
                });
            }
        }

        let head = self.store.get_latest_event(space_id).await?;
        let (prior, counter) = match &head {
            Some(h) => (Some(&h.state), h.counter + 1),
            None => (None, 1),
        };

        let state = self.apply(prior, event).await?;
        self.store
            .append_event(space_id, event, counter, &state)
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    LedgerError::Conflict {
                        space_id: space_id.clone(),
                        attempts: 1,
                    }
                } else {
                    e.into()
                }
            })?;

        info!(
            space = %space_id,
            counter,
            kind = event.transaction.kind(),
            "event ingested"
        );
        Ok(CommittedEvent {
            space_id: space_id.clone(),
            counter,
            event: event.clone(),
            state,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the current state of a space.
    pub async fn state(&self, space_id: &SpaceId) -> Result<Option<SpaceState>> {
        Ok(self.store.get_state(space_id).await?)
    }

    /// List all known spaces.
    pub async fn list_spaces(&self) -> Result<Vec<SpaceId>> {
        Ok(self.store.list_spaces().await?)
    }

    /// Rebuild the state of a space by re-verifying its whole chain.
    pub async fn replay(&self, space_id: &SpaceId) -> Result<SpaceState> {
        let events = self.store.list_events(space_id).await?;

        let mut state: Option<SpaceState> = None;
        for event in &events {
            state = Some(self.apply(state.as_ref(), event).await?);
        }
        let state = state.ok_or_else(|| LedgerError::SpaceNotFound(space_id.clone()))?;

        if let Some(stored) = self.store.get_state(space_id).await? {
            if stored != state {
                warn!(space = %space_id, "replayed state differs from stored head");
            }
        }
        Ok(state)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Key Distribution
    // ─────────────────────────────────────────────────────────────────────────

    /// Wrap `key` for each recipient and persist the boxes.
    ///
    /// Every recipient must be a current member of the space, and its
    /// keys must match what the verifier reports for that account.
    pub async fn distribute_key(
        &self,
        space_id: &SpaceId,
        key: &SpaceKey,
        recipients: &[Identity],
        sender: &EncryptionPrivateKey,
    ) -> Result<Vec<KeyBox>> {
        let state = self
            .store
            .get_state(space_id)
            .await?
            .ok_or_else(|| LedgerError::SpaceNotFound(space_id.clone()))?;

        if let Some(outsider) = recipients
            .iter()
            .find(|r| !state.is_member(&r.account_address))
        {
            return Err(LedgerError::NotMember {
                space_id: space_id.clone(),
                account: outsider.account_address.clone(),
            });
        }

        for recipient in recipients {
            let verified = verify_with_timeout(
                &self.verifier,
                &recipient.account_address,
                &IdentityKey::SignaturePublicKey(recipient.signature_public_key),
                self.config.verify_timeout,
            )
            .await?;
            if verified != *recipient {
                warn!(
                    space = %space_id,
                    account = %recipient.account_address,
                    "recipient keys do not match verified identity"
                );
                return Err(StateError::InvalidIdentity(format!(
                    "keys supplied for {} do not match its verified identity",
                    recipient.account_address
                ))
                .into());
            }
        }

        let boxes = rewrap_for(space_id, key, recipients, sender)?;
        self.store.put_key_boxes(&boxes).await?;

        info!(space = %space_id, recipients = boxes.len(), "key distributed");
        Ok(boxes)
    }

    /// Open the newest key box addressed to `account`.
    pub async fn open_key_box(
        &self,
        space_id: &SpaceId,
        account: &AccountAddress,
        private_key: &EncryptionPrivateKey,
    ) -> Result<SpaceKey> {
        let boxes = self.store.key_boxes_for(space_id, account).await?;

        let mut last_error: Option<KeysError> = None;
        for key_box in boxes.iter().rev() {
            match key_box.open(private_key) {
                Ok(key) => return Ok(key),
                Err(e) => {
                    debug!(
                        space = %space_id,
                        key_box = %key_box.id,
                        error = %e,
                        "key box did not open"
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e.into()),
            None => Err(LedgerError::NoKeyBox {
                space_id: space_id.clone(),
                account: account.clone(),
            }),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    async fn apply(&self, state: Option<&SpaceState>, event: &SpaceEvent) -> Result<SpaceState> {
        let verify_timeout = self.config.verify_timeout;
        Ok(apply_event_with_timeout(state, event, &self.verifier, verify_timeout).await?)
    }

    fn backoff(&self, attempts: u32) -> Duration {
        self.config.retry_backoff.saturating_mul(attempts)
    }
}

fn genesis_space_id(event: &SpaceEvent) -> Result<SpaceId> {
    match &event.transaction {
        SpaceTransaction::CreateSpace { id, .. } => Ok(id.clone()),
        other => Err(LedgerError::State(StateError::InvalidEvent(format!(
            "{} is not a genesis event",
            other.kind()
        )))),
    }
}
