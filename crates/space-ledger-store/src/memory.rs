//! In-memory implementation of the EventStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::trace;

use space_ledger_core::{AccountAddress, EventId, SpaceEvent, SpaceId};
use space_ledger_keys::KeyBox;
use space_ledger_state::SpaceState;

use crate::error::{Result, StoreError};
use crate::traits::{EventStore, StoredEvent};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Events per space, index `counter - 1`.
    chains: BTreeMap<SpaceId, Vec<StoredEvent>>,

    key_boxes: Vec<KeyBox>,

    /// Index of `key_boxes` by id.
    key_box_ids: HashMap<EventId, usize>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Internal(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Internal(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn append_event(
        &self,
        space_id: &SpaceId,
        event: &SpaceEvent,
        counter: u64,
        state: &SpaceState,
    ) -> Result<()> {
        let mut inner = self.write()?;

        let expected = inner.chains.get(space_id).map_or(0, Vec::len) as u64 + 1;
        if counter != expected {
            return Err(StoreError::Conflict {
                space_id: space_id.to_string(),
                expected,
                actual: counter,
            });
        }

        inner.chains.entry(space_id.clone()).or_default().push(StoredEvent {
            event: event.clone(),
            counter,
            state: state.clone(),
        });
        trace!(space = %space_id, counter, "appended event");
        Ok(())
    }

    async fn get_latest_event(&self, space_id: &SpaceId) -> Result<Option<StoredEvent>> {
        let inner = self.read()?;
        Ok(inner
            .chains
            .get(space_id)
            .and_then(|chain| chain.last())
            .cloned())
    }

    async fn list_events(&self, space_id: &SpaceId) -> Result<Vec<SpaceEvent>> {
        let inner = self.read()?;
        Ok(inner
            .chains
            .get(space_id)
            .map(|chain| chain.iter().map(|s| s.event.clone()).collect())
            .unwrap_or_default())
    }

    async fn list_spaces(&self) -> Result<Vec<SpaceId>> {
        let inner = self.read()?;
        Ok(inner.chains.keys().cloned().collect())
    }

    async fn put_key_boxes(&self, boxes: &[KeyBox]) -> Result<()> {
        let mut inner = self.write()?;
        for key_box in boxes {
            if inner.key_box_ids.contains_key(&key_box.id) {
                continue;
            }
            let index = inner.key_boxes.len();
            inner.key_box_ids.insert(key_box.id.clone(), index);
            inner.key_boxes.push(key_box.clone());
        }
        Ok(())
    }

    async fn key_boxes_for(
        &self,
        space_id: &SpaceId,
        recipient: &AccountAddress,
    ) -> Result<Vec<KeyBox>> {
        let inner = self.read()?;
        Ok(inner
            .key_boxes
            .iter()
            .filter(|b| &b.space_id == space_id && &b.recipient_account_address == recipient)
            .cloned()
            .collect())
    }
}
