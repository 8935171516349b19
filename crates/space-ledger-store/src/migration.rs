//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per applied event
        CREATE TABLE space_events (
            space_id TEXT NOT NULL,
            counter INTEGER NOT NULL,         -- 1 for create-space
            event_hash BLOB NOT NULL,         -- 32 bytes, BLAKE3 of canonical event
            event_json BLOB NOT NULL,         -- canonical JSON of the event
            state_cbor BLOB NOT NULL,         -- CBOR of the state after this event
            appended_at INTEGER NOT NULL,     -- local timestamp (Unix ms)

            PRIMARY KEY (space_id, counter)
        );

        -- Wrapped space keys
        CREATE TABLE key_boxes (
            key_box_id TEXT PRIMARY KEY,
            space_id TEXT NOT NULL,
            recipient TEXT NOT NULL,          -- account address
            key_box_json TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX idx_space_events_hash ON space_events(event_hash);
        CREATE INDEX idx_key_boxes_recipient ON key_boxes(space_id, recipient);
        "#,
    )?;

    Ok(())
}

/// Current time in milliseconds. A clock before the epoch reads as 0.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
