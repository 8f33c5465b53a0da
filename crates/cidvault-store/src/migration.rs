//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::traits::now_millis;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 2;

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

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        2 => apply_v2(conn),
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
        -- Registry entries; id doubles as the monotonic counter
        CREATE TABLE entries (
            id INTEGER PRIMARY KEY,           -- dense, starting at 1
            owner BLOB NOT NULL,              -- 20 bytes
            h1 BLOB NOT NULL,                 -- opaque handles
            h2 BLOB NOT NULL,
            h3 BLOB NOT NULL,
            created_at INTEGER NOT NULL       -- Unix ms
        );

        -- Authorization relation (owner is implicit, never stored here)
        CREATE TABLE authorizations (
            entry_id INTEGER NOT NULL REFERENCES entries(id),
            reader BLOB NOT NULL,             -- 20 bytes
            granted_at INTEGER NOT NULL,
            PRIMARY KEY (entry_id, reader)
        );

        -- Append-only event log
        CREATE TABLE events (
            idx INTEGER PRIMARY KEY,          -- starting at 1
            entry_id INTEGER NOT NULL,
            kind INTEGER NOT NULL,            -- EventKind as u8
            body BLOB NOT NULL,               -- CBOR RegistryEvent
            created_at INTEGER NOT NULL
        );

        -- Owner index, in creation order
        CREATE INDEX idx_entries_owner ON entries(owner, id);
        CREATE INDEX idx_events_entry ON events(entry_id, idx);
        "#,
    )?;

    Ok(())
}

/// Migration v2: persistent sender nonces.
fn apply_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE nonces (
            sender BLOB PRIMARY KEY,          -- 20 bytes
            next INTEGER NOT NULL             -- next expected nonce
        );
        "#,
    )?;

    Ok(())
}
