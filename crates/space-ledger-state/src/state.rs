//! Space state.
//!
//! State is never mutated in place by the reducer: each applied event
//! yields a new value. Maps are ordered so two replicas that fold the same
//! chain serialize byte-identically.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use space_ledger_core::{
    AccountAddress, EncryptionPublicKey, EventHash, Identity, InboxAuthPolicy, InboxId,
    InvitationId, SignaturePublicKey, SpaceId,
};

/// Role of a member within a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Member,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceMember {
    pub account_address: AccountAddress,
    pub role: Role,
}

/// A pending invitation. Consumed exactly once by `accept-invitation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceInvitation {
    pub id: InvitationId,
    pub invitee_account_address: AccountAddress,
    pub invitee_signature_public_key: SignaturePublicKey,
    pub invitee_encryption_public_key: EncryptionPublicKey,
}

impl SpaceInvitation {
    /// The invitee's public identity, as recorded by the inviter.
    pub fn invitee(&self) -> Identity {
        Identity {
            account_address: self.invitee_account_address.clone(),
            signature_public_key: self.invitee_signature_public_key,
            encryption_public_key: self.invitee_encryption_public_key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceInbox {
    pub id: InboxId,
    pub encryption_public_key: EncryptionPublicKey,
    /// The inbox secret, already wrapped for the space.
    pub secret_key: String,
    pub is_public: bool,
    pub auth_policy: InboxAuthPolicy,
    pub created_by: AccountAddress,
}

/// Lifecycle phase of an existing space.
///
/// `Uninitialized` has no value: it is the absence of state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpacePhase {
    Active,
    Deleted,
}

/// Folded state of one space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceState {
    pub id: SpaceId,
    pub members: BTreeMap<AccountAddress, SpaceMember>,
    pub removed_members: BTreeMap<AccountAddress, SpaceMember>,
    pub invitations: BTreeMap<InvitationId, SpaceInvitation>,
    #[serde(default)]
    pub inboxes: BTreeMap<InboxId, SpaceInbox>,
    /// Hash of the most recently applied event.
    pub last_event_hash: EventHash,
}

impl SpaceState {
    /// A space with no members left has been deleted; creation always
    /// seeds one admin and nothing else removes members.
    pub fn phase(&self) -> SpacePhase {
        if self.members.is_empty() {
            SpacePhase::Deleted
        } else {
            SpacePhase::Active
        }
    }

    pub fn member(&self, account: &AccountAddress) -> Option<&SpaceMember> {
        self.members.get(account)
    }

    pub fn is_member(&self, account: &AccountAddress) -> bool {
        self.members.contains_key(account)
    }

    pub fn is_admin(&self, account: &AccountAddress) -> bool {
        matches!(self.member(account), Some(m) if m.role == Role::Admin)
    }

    /// First pending invitation addressed to `account`, in id order.
    pub fn invitation_for(&self, account: &AccountAddress) -> Option<&SpaceInvitation> {
        self.invitations
            .values()
            .find(|inv| &inv.invitee_account_address == account)
    }

    /// Current members in address order.
    pub fn member_addresses(&self) -> impl Iterator<Item = &AccountAddress> {
        self.members.keys()
    }
}
