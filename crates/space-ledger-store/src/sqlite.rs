//! SQLite implementation of the EventStore trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.
//!
//! Events are stored as canonical JSON, state snapshots as CBOR.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::trace;

use space_ledger_core::{canonicalize, AccountAddress, SpaceEvent, SpaceId};
use space_ledger_keys::KeyBox;
use space_ledger_state::SpaceState;

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{EventStore, StoredEvent};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Internal(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Internal(format!("spawn_blocking failed: {}", e)))?
    }
}

fn encode_state(state: &SpaceState) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(state, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_state(bytes: &[u8]) -> Result<SpaceState> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode_event(bytes: &[u8]) -> Result<SpaceEvent> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn append_event(
        &self,
        space_id: &SpaceId,
        event: &SpaceEvent,
        counter: u64,
        state: &SpaceState,
    ) -> Result<()> {
        let space_id = space_id.clone();
        let event_json =
            canonicalize(event).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let event_hash = event
            .hash()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let state_cbor = encode_state(state)?;

        self.run(move |conn| {
            let tx = conn.transaction()?;

            let head: u64 = tx.query_row(
                "SELECT COALESCE(MAX(counter), 0) FROM space_events WHERE space_id = ?1",
                params![space_id.as_str()],
                |row| row.get::<_, i64>(0),
            )? as u64;

            let expected = head + 1;
            if counter != expected {
                return Err(StoreError::Conflict {
                    space_id: space_id.to_string(),
                    expected,
                    actual: counter,
                });
            }

            tx.execute(
                "INSERT INTO space_events (
                    space_id, counter, event_hash, event_json, state_cbor, appended_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    space_id.as_str(),
                    counter as i64,
                    event_hash.as_bytes().as_slice(),
                    event_json,
                    state_cbor,
                    now_millis(),
                ],
            )?;
            tx.commit()?;

            trace!(space = %space_id, counter, "appended event");
            Ok(())
        })
        .await
    }

    async fn get_latest_event(&self, space_id: &SpaceId) -> Result<Option<StoredEvent>> {
        let space_id = space_id.clone();

        self.run(move |conn| {
            let row = conn
                .query_row(
                    "SELECT counter, event_json, state_cbor FROM space_events
                     WHERE space_id = ?1 ORDER BY counter DESC LIMIT 1",
                    params![space_id.as_str()],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, Vec<u8>>(1)?,
                            row.get::<_, Vec<u8>>(2)?,
                        ))
                    },
                )
                .optional()?;

            match row {
                None => Ok(None),
                Some((counter, event_json, state_cbor)) => Ok(Some(StoredEvent {
                    event: decode_event(&event_json)?,
                    counter: u64::try_from(counter).map_err(|_| {
                        StoreError::InvalidData(format!("negative counter {}", counter))
                    })?,
                    state: decode_state(&state_cbor)?,
                })),
            }
        })
        .await
    }

    async fn list_events(&self, space_id: &SpaceId) -> Result<Vec<SpaceEvent>> {
        let space_id = space_id.clone();

        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT event_json FROM space_events WHERE space_id = ?1 ORDER BY counter ASC",
            )?;
            let rows = stmt.query_map(params![space_id.as_str()], |row| row.get::<_, Vec<u8>>(0))?;

            let mut events = Vec::new();
            for row in rows {
                events.push(decode_event(&row?)?);
            }
            Ok(events)
        })
        .await
    }

    async fn list_spaces(&self) -> Result<Vec<SpaceId>> {
        self.run(|conn| {
            let mut stmt =
                conn.prepare("SELECT DISTINCT space_id FROM space_events ORDER BY space_id")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let spaces = rows
                .map(|r| r.map(SpaceId::new).map_err(StoreError::from))
                .collect::<Result<Vec<_>>>()?;
            Ok(spaces)
        })
        .await
    }

    async fn put_key_boxes(&self, boxes: &[KeyBox]) -> Result<()> {
        let rows = boxes
            .iter()
            .map(|b| {
                let json =
                    serde_json::to_string(b).map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok((
                    b.id.to_string(),
                    b.space_id.to_string(),
                    b.recipient_account_address.to_string(),
                    json,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        self.run(move |conn| {
            let tx = conn.transaction()?;
            let now = now_millis();
            for (id, space_id, recipient, json) in &rows {
                tx.execute(
                    "INSERT OR IGNORE INTO key_boxes (
                        key_box_id, space_id, recipient, key_box_json, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![id, space_id, recipient, json, now],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn key_boxes_for(
        &self,
        space_id: &SpaceId,
        recipient: &AccountAddress,
    ) -> Result<Vec<KeyBox>> {
        let space_id = space_id.clone();
        let recipient = recipient.to_string();

        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT key_box_json FROM key_boxes
                 WHERE space_id = ?1 AND recipient = ?2
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![space_id.as_str(), recipient], |row| {
                row.get::<_, String>(0)
            })?;

            let mut boxes = Vec::new();
            for row in rows {
                let json = row?;
                boxes.push(
                    serde_json::from_str(&json)
                        .map_err(|e| StoreError::Serialization(e.to_string()))?,
                );
            }
            Ok(boxes)
        })
        .await
    }
}
