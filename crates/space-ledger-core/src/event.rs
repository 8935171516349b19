//! Space events: the signed, hash-chained records that drive a space.
//!
//! An event is immutable once created. Each non-genesis transaction names
//! the hash of the event before it, forming a singly-linked chain.

use serde::{Deserialize, Serialize};

use crate::canonical::canonicalize;
use crate::crypto::{verify, EventHash, RecoverableSignature, SignaturePublicKey};
use crate::error::{CoreError, Result};
use crate::identity::AccountAddress;
use crate::types::{EncryptionPublicKey, EventId, InboxId, InvitationId, SpaceId};

/// Who may post to a space inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboxAuthPolicy {
    /// Senders stay anonymous.
    Anonymous,
    /// Senders may identify themselves.
    OptionalAuth,
    /// Senders must identify themselves.
    RequiresAuth,
}

/// The state change an event carries, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SpaceTransaction {
    /// Genesis event of a space.
    #[serde(rename_all = "camelCase")]
    CreateSpace {
        id: SpaceId,
        creator_account_address: AccountAddress,
        creator_signature_public_key: SignaturePublicKey,
        creator_encryption_public_key: EncryptionPublicKey,
    },

    #[serde(rename_all = "camelCase")]
    DeleteSpace {
        id: SpaceId,
        previous_event_hash: EventHash,
    },

    /// Admin invites an account. `ciphertext` and `nonce` carry an optional
    /// out-of-band invite secret and may be empty.
    #[serde(rename_all = "camelCase")]
    CreateInvitation {
        id: InvitationId,
        invitee_account_address: AccountAddress,
        signature_public_key: SignaturePublicKey,
        encryption_public_key: EncryptionPublicKey,
        ciphertext: String,
        nonce: String,
        previous_event_hash: EventHash,
    },

    /// Authored by the invitee.
    #[serde(rename_all = "camelCase")]
    AcceptInvitation {
        id: EventId,
        previous_event_hash: EventHash,
    },

    /// Records an inbox and its already key-boxed secret.
    #[serde(rename_all = "camelCase")]
    CreateSpaceInbox {
        id: InboxId,
        space_id: SpaceId,
        encryption_public_key: EncryptionPublicKey,
        secret_key: String,
        is_public: bool,
        auth_policy: InboxAuthPolicy,
        previous_event_hash: EventHash,
    },
}

impl SpaceTransaction {
    /// The wire tag of this transaction.
    pub fn kind(&self) -> &'static str {
        match self {
            SpaceTransaction::CreateSpace { .. } => "create-space",
            SpaceTransaction::DeleteSpace { .. } => "delete-space",
            SpaceTransaction::CreateInvitation { .. } => "create-invitation",
            SpaceTransaction::AcceptInvitation { .. } => "accept-invitation",
            SpaceTransaction::CreateSpaceInbox { .. } => "create-space-inbox",
        }
    }

    /// The predecessor hash, absent only for the genesis transaction.
    pub fn previous_event_hash(&self) -> Option<&EventHash> {
        match self {
            SpaceTransaction::CreateSpace { .. } => None,
            SpaceTransaction::DeleteSpace { previous_event_hash, .. }
            | SpaceTransaction::CreateInvitation { previous_event_hash, .. }
            | SpaceTransaction::AcceptInvitation { previous_event_hash, .. }
            | SpaceTransaction::CreateSpaceInbox { previous_event_hash, .. } => {
                Some(previous_event_hash)
            }
        }
    }

    /// Check if this is the genesis transaction.
    pub fn is_genesis(&self) -> bool {
        matches!(self, SpaceTransaction::CreateSpace { .. })
    }
}

/// The author block attached to every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAuthor {
    pub account_address: AccountAddress,
    pub public_key: SignaturePublicKey,
    /// Signature over the canonical transaction bytes.
    pub signature: RecoverableSignature,
}

/// A complete event: transaction plus signed author block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceEvent {
    pub transaction: SpaceTransaction,
    pub author: EventAuthor,
}

impl SpaceEvent {
    /// The bytes the author signed: canonical transaction only.
    pub fn signed_message(&self) -> Result<Vec<u8>> {
        canonicalize(&self.transaction)
    }

    /// Check that the signature recovers to `author.public_key`.
    pub fn verify_signature(&self) -> Result<()> {
        let message = self.signed_message()?;
        if verify(&message, &self.author.signature, &self.author.public_key) {
            Ok(())
        } else {
            Err(CoreError::InvalidSignature)
        }
    }

    /// Chain-link hash of the whole event.
    pub fn hash(&self) -> Result<EventHash> {
        hash_event(self)
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CoreError::Encoding(e.to_string()))
    }

    /// Parse from the JSON wire form.
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| CoreError::Decoding(e.to_string()))
    }
}

/// `blake3(canonicalize(event))`.
pub fn hash_event(event: &SpaceEvent) -> Result<EventHash> {
    let bytes = canonicalize(event)?;
    Ok(EventHash::hash(&bytes))
}
