//! Fixtures shared by the backend tests.

use std::collections::BTreeMap;

use space_ledger_core::{
    create_space, delete_space, AccountAddress, Author, EncryptionPublicKey, SignatureKeypair,
    SpaceEvent, SpaceId, SpaceTransaction,
};
use space_ledger_keys::{EncryptionKeypair, KeyBox, SpaceKey};
use space_ledger_state::{Role, SpaceMember, SpaceState};

fn author() -> Author {
    let signer = SignatureKeypair::generate();
    Author::new(
        AccountAddress::from_public_key(&signer.public_key()).unwrap(),
        signer,
        EncryptionPublicKey::from_bytes([2; 32]),
    )
}

/// `len` linked events with hand-built states. Not reducer-valid beyond
/// the chain links; stores do not validate.
pub fn chain_of(len: usize) -> (SpaceId, Vec<(SpaceEvent, SpaceState)>) {
    let alice = author();
    let genesis = create_space(&alice).unwrap();
    let space_id = match &genesis.transaction {
        SpaceTransaction::CreateSpace { id, .. } => id.clone(),
        _ => unreachable!(),
    };

    let mut members = BTreeMap::new();
    members.insert(
        alice.account_address.clone(),
        SpaceMember {
            account_address: alice.account_address.clone(),
            role: Role::Admin,
        },
    );
    let mut state = SpaceState {
        id: space_id.clone(),
        members,
        removed_members: BTreeMap::new(),
        invitations: BTreeMap::new(),
        inboxes: BTreeMap::new(),
        last_event_hash: genesis.hash().unwrap(),
    };

    let mut out = vec![(genesis, state.clone())];
    while out.len() < len {
        let event = delete_space(&alice, &space_id, state.last_event_hash).unwrap();
        state.last_event_hash = event.hash().unwrap();
        out.push((event, state.clone()));
    }
    (space_id, out)
}

pub fn key_box_for(space_id: &SpaceId) -> (KeyBox, AccountAddress) {
    let sender = EncryptionKeypair::generate();
    let recipient = EncryptionKeypair::generate();
    let mut identity = author().identity();
    identity.encryption_public_key = recipient.public_key;

    let key_box = KeyBox::seal(space_id, &SpaceKey::generate(), &identity, &sender.private_key)
        .unwrap();
    (key_box, identity.account_address)
}
