//! EventStore trait: the abstract interface for space persistence.
//!
//! Implementations include SQLite (primary) and in-memory (for tests).

use std::sync::Arc;

use async_trait::async_trait;

use space_ledger_core::{AccountAddress, SpaceEvent, SpaceId};
use space_ledger_keys::KeyBox;
use space_ledger_state::SpaceState;

use crate::error::Result;

/// The newest persisted event of a space with the state it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    pub event: SpaceEvent,
    /// Position in the chain, starting at 1 for `create-space`.
    pub counter: u64,
    pub state: SpaceState,
}

/// Async interface for event persistence.
///
/// # Design Notes
///
/// - **Single writer per position**: `append_event` only accepts
///   `counter == latest + 1` (or `1` for a new space). Anything else is
///   `StoreError::Conflict`, leaving the store untouched.
/// - **Atomic append**: the event and the state it produced are written
///   together or not at all.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append `event` at position `counter` together with the resulting state.
    async fn append_event(
        &self,
        space_id: &SpaceId,
        event: &SpaceEvent,
        counter: u64,
        state: &SpaceState,
    ) -> Result<()>;

    /// Get the head of a space, if it exists.
    async fn get_latest_event(&self, space_id: &SpaceId) -> Result<Option<StoredEvent>>;

    /// All events of a space ordered by counter.
    async fn list_events(&self, space_id: &SpaceId) -> Result<Vec<SpaceEvent>>;

    /// All spaces with at least one event.
    async fn list_spaces(&self) -> Result<Vec<SpaceId>>;

    /// Persist key boxes. Boxes with an existing id are ignored.
    async fn put_key_boxes(&self, boxes: &[KeyBox]) -> Result<()>;

    /// Key boxes addressed to `recipient` within a space, oldest first.
    async fn key_boxes_for(
        &self,
        space_id: &SpaceId,
        recipient: &AccountAddress,
    ) -> Result<Vec<KeyBox>>;
}

#[async_trait]
impl<T: EventStore + ?Sized> EventStore for Arc<T> {
    async fn append_event(
        &self,
        space_id: &SpaceId,
        event: &SpaceEvent,
        counter: u64,
        state: &SpaceState,
    ) -> Result<()> {
        (**self).append_event(space_id, event, counter, state).await
    }

    async fn get_latest_event(&self, space_id: &SpaceId) -> Result<Option<StoredEvent>> {
        (**self).get_latest_event(space_id).await
    }

    async fn list_events(&self, space_id: &SpaceId) -> Result<Vec<SpaceEvent>> {
        (**self).list_events(space_id).await
    }

    async fn list_spaces(&self) -> Result<Vec<SpaceId>> {
        (**self).list_spaces().await
    }

    async fn put_key_boxes(&self, boxes: &[KeyBox]) -> Result<()> {
        (**self).put_key_boxes(boxes).await
    }

    async fn key_boxes_for(
        &self,
        space_id: &SpaceId,
        recipient: &AccountAddress,
    ) -> Result<Vec<KeyBox>> {
        (**self).key_boxes_for(space_id, recipient).await
    }
}

/// Extension methods over any [`EventStore`].
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Current state of a space, if it exists.
    async fn get_state(&self, space_id: &SpaceId) -> Result<Option<SpaceState>> {
        Ok(self.get_latest_event(space_id).await?.map(|s| s.state))
    }

    /// Counter of the head event, 0 for an unknown space.
    async fn head_counter(&self, space_id: &SpaceId) -> Result<u64> {
        Ok(self
            .get_latest_event(space_id)
            .await?
            .map(|s| s.counter)
            .unwrap_or(0))
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}
