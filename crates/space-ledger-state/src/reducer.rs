//! The event reducer.
//!
//! `apply_event(state, event, verifier)` folds one event into the state of
//! a space. Every event goes through the same checks, in order:
//!
//! 1. the transaction variant must fit the phase of the space
//! 2. `previous_event_hash` must equal the current chain head
//! 3. the signature must recover to the claimed author key
//! 4. the author's account/key binding must verify
//! 5. per-variant authorization and invariants
//!
//! A failing check rejects the whole event. On success the new state's
//! `last_event_hash` is the hash of the applied event.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;

use space_ledger_core::{
    hash_event, AccountAddress, EncryptionPublicKey, EventHash, Identity, InboxAuthPolicy,
    InboxId, InvitationId, SignaturePublicKey, SpaceEvent, SpaceId, SpaceTransaction,
};

use crate::error::{Result, StateError};
use crate::state::{Role, SpaceInbox, SpaceInvitation, SpaceMember, SpacePhase, SpaceState};
use crate::verifier::{verify_with_timeout, IdentityKey, IdentityVerifier};

/// Deadline for a single identity verification.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Apply one event using [`DEFAULT_VERIFY_TIMEOUT`].
pub async fn apply_event<V: IdentityVerifier + ?Sized>(
    state: Option<&SpaceState>,
    event: &SpaceEvent,
    verifier: &V,
) -> Result<SpaceState> {
    apply_event_with_timeout(state, event, verifier, DEFAULT_VERIFY_TIMEOUT).await
}

/// Apply one event, bounding identity verification by `verify_timeout`.
pub async fn apply_event_with_timeout<V: IdentityVerifier + ?Sized>(
    state: Option<&SpaceState>,
    event: &SpaceEvent,
    verifier: &V,
    verify_timeout: Duration,
) -> Result<SpaceState> {
    let result = reduce(state, event, verifier, verify_timeout).await;
    if let Err(ref e) = result {
        debug!(
            kind = event.transaction.kind(),
            author = %event.author.account_address,
            error = %e,
            "event rejected"
        );
    }
    result
}

/// Fold a full chain starting from an uninitialized space.
pub async fn apply_events<V: IdentityVerifier + ?Sized>(
    events: &[SpaceEvent],
    verifier: &V,
) -> Result<SpaceState> {
    let mut state: Option<SpaceState> = None;
    for event in events {
        state = Some(apply_event(state.as_ref(), event, verifier).await?);
    }
    state.ok_or_else(|| StateError::InvalidEvent("empty event chain".into()))
}

async fn reduce<V: IdentityVerifier + ?Sized>(
    state: Option<&SpaceState>,
    event: &SpaceEvent,
    verifier: &V,
    verify_timeout: Duration,
) -> Result<SpaceState> {
    let transaction = &event.transaction;

    // 1. phase
    let state = match (state, transaction.is_genesis()) {
        (None, true) => None,
        (None, false) => {
            return Err(StateError::InvalidEvent(format!(
                "{} applied to an uninitialized space",
                transaction.kind()
            )))
        }
        (Some(_), true) => {
            return Err(StateError::InvalidEvent(
                "create-space applied to an existing space".into(),
            ))
        }
        (Some(s), false) => {
            if s.phase() == SpacePhase::Deleted {
                return Err(StateError::InvalidEvent(format!(
                    "{} applied to a deleted space",
                    transaction.kind()
                )));
            }
            Some(s)
        }
    };

    // 2. chain link
    if let (Some(s), Some(prev)) = (state, transaction.previous_event_hash()) {
        if *prev != s.last_event_hash {
            return Err(StateError::InvalidEvent(format!(
                "previous event hash {} does not match head {}",
                prev, s.last_event_hash
            )));
        }
    }

    // 3. signature
    event
        .verify_signature()
        .map_err(|e| StateError::VerifySignature(e.to_string()))?;

    // 4. identity
    let author = &event.author;
    let identity = verify_with_timeout(
        verifier,
        &author.account_address,
        &IdentityKey::SignaturePublicKey(author.public_key),
        verify_timeout,
    )
    .await?;
    if identity.account_address != author.account_address
        || identity.signature_public_key != author.public_key
    {
        return Err(StateError::InvalidIdentity(
            "verified identity does not match event author".into(),
        ));
    }

    // 5. transition
    let hash = hash_event(event).map_err(|e| StateError::InvalidEvent(e.to_string()))?;
    match (state, transaction) {
        (
            None,
            SpaceTransaction::CreateSpace {
                id,
                creator_account_address,
                creator_signature_public_key,
                creator_encryption_public_key,
            },
        ) => create_space(
            &identity,
            id,
            creator_account_address,
            creator_signature_public_key,
            creator_encryption_public_key,
            hash,
        ),
        (Some(s), SpaceTransaction::DeleteSpace { id, .. }) => delete_space(s, &identity, id, hash),
        (
            Some(s),
            SpaceTransaction::CreateInvitation {
                id,
                invitee_account_address,
                signature_public_key,
                encryption_public_key,
                ..
            },
        ) => create_invitation(
            s,
            &identity,
            id,
            invitee_account_address,
            signature_public_key,
            encryption_public_key,
            hash,
        ),
        (Some(s), SpaceTransaction::AcceptInvitation { .. }) => {
            accept_invitation(s, &identity, hash)
        }
        (
            Some(s),
            SpaceTransaction::CreateSpaceInbox {
                id,
                space_id,
                encryption_public_key,
                secret_key,
                is_public,
                auth_policy,
                ..
            },
        ) => create_space_inbox(
            s,
            &identity,
            InboxParams {
                id,
                space_id,
                encryption_public_key,
                secret_key,
                is_public: *is_public,
                auth_policy: *auth_policy,
            },
            hash,
        ),
        // Phase check above rules out every other pairing.
        (_, other) => Err(StateError::InvalidEvent(format!(
            "{} does not fit the space phase",
            other.kind()
        ))),
    }
}

fn create_space(
    author: &Identity,
    id: &SpaceId,
    creator_account_address: &AccountAddress,
    creator_signature_public_key: &SignaturePublicKey,
    creator_encryption_public_key: &EncryptionPublicKey,
    hash: EventHash,
) -> Result<SpaceState> {
    if *creator_account_address != author.account_address
        || *creator_signature_public_key != author.signature_public_key
    {
        return Err(StateError::InvalidEvent(
            "creator does not match event author".into(),
        ));
    }
    if *creator_encryption_public_key != author.encryption_public_key {
        return Err(StateError::InvalidEvent(
            "creator encryption key does not match verified identity".into(),
        ));
    }

    let mut members = BTreeMap::new();
    members.insert(
        author.account_address.clone(),
        SpaceMember {
            account_address: author.account_address.clone(),
            role: Role::Admin,
        },
    );

    Ok(SpaceState {
        id: id.clone(),
        members,
        removed_members: BTreeMap::new(),
        invitations: BTreeMap::new(),
        inboxes: BTreeMap::new(),
        last_event_hash: hash,
    })
}

fn delete_space(
    state: &SpaceState,
    author: &Identity,
    id: &SpaceId,
    hash: EventHash,
) -> Result<SpaceState> {
    if *id != state.id {
        return Err(StateError::InvalidEvent(format!(
            "delete-space names {} but the space is {}",
            id, state.id
        )));
    }
    // Any current member may delete, not only admins.
    if !state.is_member(&author.account_address) {
        return Err(StateError::InvalidEvent(
            "only members can delete a space".into(),
        ));
    }

    let mut next = state.clone();
    let members = std::mem::take(&mut next.members);
    next.removed_members.extend(members);
    next.invitations.clear();
    next.last_event_hash = hash;
    Ok(next)
}

fn create_invitation(
    state: &SpaceState,
    author: &Identity,
    id: &InvitationId,
    invitee_account_address: &AccountAddress,
    invitee_signature_public_key: &SignaturePublicKey,
    invitee_encryption_public_key: &EncryptionPublicKey,
    hash: EventHash,
) -> Result<SpaceState> {
    if !state.is_admin(&author.account_address) {
        return Err(StateError::InvalidEvent(
            "only admins can create invitations".into(),
        ));
    }
    if state.is_member(invitee_account_address) {
        return Err(StateError::InvalidEvent(format!(
            "{} is already a member",
            invitee_account_address
        )));
    }
    if state.invitations.contains_key(id) {
        return Err(StateError::InvalidEvent(format!(
            "invitation {} already exists",
            id
        )));
    }
    if state.invitation_for(invitee_account_address).is_some() {
        return Err(StateError::InvalidEvent(format!(
            "{} already has a pending invitation",
            invitee_account_address
        )));
    }

    let mut next = state.clone();
    next.invitations.insert(
        id.clone(),
        SpaceInvitation {
            id: id.clone(),
            invitee_account_address: invitee_account_address.clone(),
            invitee_signature_public_key: *invitee_signature_public_key,
            invitee_encryption_public_key: *invitee_encryption_public_key,
        },
    );
    next.last_event_hash = hash;
    Ok(next)
}

fn accept_invitation(
    state: &SpaceState,
    author: &Identity,
    hash: EventHash,
) -> Result<SpaceState> {
    if state.is_member(&author.account_address) {
        return Err(StateError::InvalidEvent(format!(
            "{} is already a member",
            author.account_address
        )));
    }
    let invitation_id = state
        .invitation_for(&author.account_address)
        .map(|inv| inv.id.clone())
        .ok_or_else(|| {
            StateError::InvalidEvent(format!(
                "no pending invitation for {}",
                author.account_address
            ))
        })?;

    let mut next = state.clone();
    next.invitations.remove(&invitation_id);
    next.removed_members.remove(&author.account_address);
    next.members.insert(
        author.account_address.clone(),
        SpaceMember {
            account_address: author.account_address.clone(),
            role: Role::Member,
        },
    );
    next.last_event_hash = hash;
    Ok(next)
}

struct InboxParams<'a> {
    id: &'a InboxId,
    space_id: &'a SpaceId,
    encryption_public_key: &'a EncryptionPublicKey,
    secret_key: &'a str,
    is_public: bool,
    auth_policy: InboxAuthPolicy,
}

fn create_space_inbox(
    state: &SpaceState,
    author: &Identity,
    inbox: InboxParams<'_>,
    hash: EventHash,
) -> Result<SpaceState> {
    if *inbox.space_id != state.id {
        return Err(StateError::InvalidEvent(format!(
            "inbox targets space {} but the space is {}",
            inbox.space_id, state.id
        )));
    }
    if !state.is_member(&author.account_address) {
        return Err(StateError::InvalidEvent(
            "only members can create inboxes".into(),
        ));
    }
    if state.inboxes.contains_key(inbox.id) {
        return Err(StateError::InvalidEvent(format!(
            "inbox {} already exists",
            inbox.id
        )));
    }

    let mut next = state.clone();
    next.inboxes.insert(
        inbox.id.clone(),
        SpaceInbox {
            id: inbox.id.clone(),
            encryption_public_key: *inbox.encryption_public_key,
            secret_key: inbox.secret_key.to_string(),
            is_public: inbox.is_public,
            auth_policy: inbox.auth_policy,
            created_by: author.account_address.clone(),
        },
    );
    next.last_event_hash = hash;
    Ok(next)
}
