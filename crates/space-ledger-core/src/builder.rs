//! Event constructors.
//!
//! One builder per transaction type. Each canonicalizes its transaction,
//! signs it with the author's signature key and wraps the result into a
//! [`SpaceEvent`]. Builders are synchronous and never touch I/O.

use crate::canonical::canonicalize;
use crate::crypto::{EventHash, SignatureKeypair};
use crate::error::Result;
use crate::event::{EventAuthor, InboxAuthPolicy, SpaceEvent, SpaceTransaction};
use crate::identity::{AccountAddress, Identity};
use crate::types::{EncryptionPublicKey, EventId, InboxId, InvitationId, SpaceId};

/// The acting party: an account plus the app keys it signs with.
#[derive(Debug, Clone)]
pub struct Author {
    pub account_address: AccountAddress,
    pub signature_keypair: SignatureKeypair,
    pub encryption_public_key: EncryptionPublicKey,
}

impl Author {
    /// Create a new author.
    pub fn new(
        account_address: AccountAddress,
        signature_keypair: SignatureKeypair,
        encryption_public_key: EncryptionPublicKey,
    ) -> Self {
        Self {
            account_address,
            signature_keypair,
            encryption_public_key,
        }
    }

    /// The public identity this author claims.
    pub fn identity(&self) -> Identity {
        Identity {
            account_address: self.account_address.clone(),
            signature_public_key: self.signature_keypair.public_key(),
            encryption_public_key: self.encryption_public_key,
        }
    }
}

/// Sign `transaction` as `author`.
pub fn sign_transaction(author: &Author, transaction: SpaceTransaction) -> Result<SpaceEvent> {
    let message = canonicalize(&transaction)?;
    let signature = author.signature_keypair.sign(&message)?;

    Ok(SpaceEvent {
        transaction,
        author: EventAuthor {
            account_address: author.account_address.clone(),
            public_key: author.signature_keypair.public_key(),
            signature,
        },
    })
}

/// Genesis event with a fresh space id.
pub fn create_space(author: &Author) -> Result<SpaceEvent> {
    sign_transaction(
        author,
        SpaceTransaction::CreateSpace {
            id: SpaceId::generate(),
            creator_account_address: author.account_address.clone(),
            creator_signature_public_key: author.signature_keypair.public_key(),
            creator_encryption_public_key: author.encryption_public_key,
        },
    )
}

pub fn delete_space(
    author: &Author,
    space_id: &SpaceId,
    previous_event_hash: EventHash,
) -> Result<SpaceEvent> {
    sign_transaction(
        author,
        SpaceTransaction::DeleteSpace {
            id: space_id.clone(),
            previous_event_hash,
        },
    )
}

/// Invite `invitee` with empty invite-secret fields.
pub fn create_invitation(
    author: &Author,
    previous_event_hash: EventHash,
    invitee: &Identity,
) -> Result<SpaceEvent> {
    create_invitation_with_secret(author, previous_event_hash, invitee, String::new(), String::new())
}

/// Invite `invitee`, carrying an out-of-band invite secret.
///
/// `ciphertext` and `nonce` are opaque to the ledger and are typically hex.
pub fn create_invitation_with_secret(
    author: &Author,
    previous_event_hash: EventHash,
    invitee: &Identity,
    ciphertext: String,
    nonce: String,
) -> Result<SpaceEvent> {
    sign_transaction(
        author,
        SpaceTransaction::CreateInvitation {
            id: InvitationId::generate(),
            invitee_account_address: invitee.account_address.clone(),
            signature_public_key: invitee.signature_public_key,
            encryption_public_key: invitee.encryption_public_key,
            ciphertext,
            nonce,
            previous_event_hash,
        },
    )
}

/// Accept a pending invitation. `author` is the invitee.
pub fn accept_invitation(author: &Author, previous_event_hash: EventHash) -> Result<SpaceEvent> {
    sign_transaction(
        author,
        SpaceTransaction::AcceptInvitation {
            id: EventId::generate(),
            previous_event_hash,
        },
    )
}

#[allow(clippy::too_many_arguments)]
pub fn create_space_inbox(
    author: &Author,
    space_id: &SpaceId,
    inbox_id: InboxId,
    encryption_public_key: EncryptionPublicKey,
    secret_key: String,
    is_public: bool,
    auth_policy: InboxAuthPolicy,
    previous_event_hash: EventHash,
) -> Result<SpaceEvent> {
    sign_transaction(
        author,
        SpaceTransaction::CreateSpaceInbox {
            id: inbox_id,
            space_id: space_id.clone(),
            encryption_public_key,
            secret_key,
            is_public,
            auth_policy,
            previous_event_hash,
        },
    )
}
