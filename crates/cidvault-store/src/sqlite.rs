//! SQLite implementation of the LedgerStore trait.
//!
//! This is the persistent backend. It uses rusqlite with bundled SQLite;
//! every mutation runs inside one SQLite transaction.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use cidvault_core::{
    EventRecord, Handle, HandleTriple, Identity, RegistryEvent, StorageId, ADDRESS_LEN,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{now_millis, LedgerStore, StoredEntry};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Execute an operation on the connection.
    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        f(&conn)
    }

    /// Execute an operation that needs mutable access (transactions).
    fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        f(&mut conn)
    }
}

fn to_identity(bytes: Vec<u8>, column: &str) -> Result<Identity> {
    let arr: [u8; ADDRESS_LEN] = bytes
        .try_into()
        .map_err(|_| StoreError::InvalidData(format!("{} is not {} bytes", column, ADDRESS_LEN)))?;
    Ok(Identity(arr))
}

fn to_storage_id(raw: i64) -> Result<StorageId> {
    u64::try_from(raw)
        .map(StorageId::new)
        .map_err(|_| StoreError::InvalidData(format!("negative entry id {}", raw)))
}

fn entry_exists(conn: &Connection, id: StorageId) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM entries WHERE id = ?1)",
        params![id.get() as i64],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Append an event inside the caller's transaction.
fn append_event(conn: &Connection, event: RegistryEvent) -> Result<EventRecord> {
    let index: i64 = conn.query_row("SELECT COALESCE(MAX(idx), 0) + 1 FROM events", [], |row| {
        row.get(0)
    })?;
    let now = now_millis();
    let body = event.to_bytes()?;

    conn.execute(
        "INSERT INTO events (idx, entry_id, kind, body, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            index,
            event.storage_id().get() as i64,
            event.kind().to_u8() as i64,
            body,
            now,
        ],
    )?;

    Ok(EventRecord {
        index: index as u64,
        event,
        recorded_at: now,
    })
}

fn collect_events(conn: &Connection, sql: &str, arg: i64) -> Result<Vec<EventRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![arg], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(index, body, recorded_at)| -> Result<EventRecord> {
            Ok(EventRecord {
                index: index as u64,
                event: RegistryEvent::from_bytes(&body)?,
                recorded_at,
            })
        })
        .collect()
}

impl LedgerStore for SqliteStore {
    fn insert_entry(&self, owner: Identity, handles: HandleTriple) -> Result<(StorageId, EventRecord)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let next: i64 = tx.query_row("SELECT COALESCE(MAX(id), 0) + 1 FROM entries", [], |row| {
                row.get(0)
            })?;
            let [h1, h2, h3] = handles.as_array();

            tx.execute(
                "INSERT INTO entries (id, owner, h1, h2, h3, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    next,
                    owner.as_bytes().as_slice(),
                    h1.as_bytes(),
                    h2.as_bytes(),
                    h3.as_bytes(),
                    now_millis(),
                ],
            )?;

            let id = to_storage_id(next)?;
            let record = append_event(&tx, RegistryEvent::Stored { id, owner })?;
            tx.commit()?;

            Ok((id, record))
        })
    }

    fn get_entry(&self, id: StorageId) -> Result<Option<StoredEntry>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT owner, h1, h2, h3, created_at FROM entries WHERE id = ?1",
                    params![id.get() as i64],
                    |row| {
                        Ok((
                            row.get::<_, Vec<u8>>(0)?,
                            row.get::<_, Vec<u8>>(1)?,
                            row.get::<_, Vec<u8>>(2)?,
                            row.get::<_, Vec<u8>>(3)?,
                            row.get::<_, i64>(4)?,
                        ))
                    },
                )
                .optional()?;

            let Some((owner, h1, h2, h3, created_at)) = row else {
                return Ok(None);
            };

            Ok(Some(StoredEntry {
                id,
                owner: to_identity(owner, "owner")?,
                handles: HandleTriple::new(Handle::new(h1), Handle::new(h2), Handle::new(h3)),
                created_at,
            }))
        })
    }

    fn entry_count(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }

    fn entries_owned_by(&self, owner: &Identity) -> Result<Vec<StorageId>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM entries WHERE owner = ?1 ORDER BY id")?;
            let ids = stmt
                .query_map(params![owner.as_bytes().as_slice()], |row| row.get::<_, i64>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids.into_iter().map(to_storage_id).collect()
        })
    }

    fn is_authorized(&self, id: StorageId, reader: &Identity) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM authorizations WHERE entry_id = ?1 AND reader = ?2)",
                params![id.get() as i64, reader.as_bytes().as_slice()],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    fn authorized_readers(&self, id: StorageId) -> Result<Vec<Identity>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT reader FROM authorizations WHERE entry_id = ?1 ORDER BY reader")?;
            let readers = stmt
                .query_map(params![id.get() as i64], |row| row.get::<_, Vec<u8>>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            readers
                .into_iter()
                .map(|bytes| to_identity(bytes, "reader"))
                .collect()
        })
    }

    fn insert_authorization(
        &self,
        id: StorageId,
        reader: Identity,
        actor: Identity,
    ) -> Result<Option<EventRecord>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if !entry_exists(&tx, id)? {
                return Err(StoreError::NotFound(id.to_string()));
            }

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO authorizations (entry_id, reader, granted_at)
                 VALUES (?1, ?2, ?3)",
                params![id.get() as i64, reader.as_bytes().as_slice(), now_millis()],
            )?;
            if inserted == 0 {
                return Ok(None);
            }

            let record = append_event(&tx, RegistryEvent::AccessGranted { id, reader, actor })?;
            tx.commit()?;
            Ok(Some(record))
        })
    }

    fn remove_authorization(
        &self,
        id: StorageId,
        reader: Identity,
        actor: Identity,
    ) -> Result<Option<EventRecord>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if !entry_exists(&tx, id)? {
                return Err(StoreError::NotFound(id.to_string()));
            }

            let removed = tx.execute(
                "DELETE FROM authorizations WHERE entry_id = ?1 AND reader = ?2",
                params![id.get() as i64, reader.as_bytes().as_slice()],
            )?;
            if removed == 0 {
                return Ok(None);
            }

            let record = append_event(&tx, RegistryEvent::AccessRevoked { id, reader, actor })?;
            tx.commit()?;
            Ok(Some(record))
        })
    }

    fn events_since(&self, after: u64) -> Result<Vec<EventRecord>> {
        self.with_conn(|conn| {
            collect_events(
                conn,
                "SELECT idx, body, created_at FROM events WHERE idx > ?1 ORDER BY idx",
                i64::try_from(after).unwrap_or(i64::MAX),
            )
        })
    }

    fn events_for(&self, id: StorageId) -> Result<Vec<EventRecord>> {
        self.with_conn(|conn| {
            collect_events(
                conn,
                "SELECT idx, body, created_at FROM events WHERE entry_id = ?1 ORDER BY idx",
                id.get() as i64,
            )
        })
    }

    fn next_nonce(&self, sender: &Identity) -> Result<u64> {
        self.with_conn(|conn| read_nonce(conn, sender))
    }

    fn consume_nonce(&self, sender: Identity, nonce: u64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let expected = read_nonce(&tx, &sender)?;
            if expected != nonce {
                return Err(StoreError::NonceMismatch {
                    expected,
                    actual: nonce,
                });
            }
            let next = nonce
                .checked_add(1)
                .and_then(|n| i64::try_from(n).ok())
                .ok_or_else(|| StoreError::InvalidData(format!("nonce {} out of range", nonce)))?;

            tx.execute(
                "INSERT INTO nonces (sender, next) VALUES (?1, ?2)
                 ON CONFLICT(sender) DO UPDATE SET next = excluded.next",
                params![sender.as_bytes().as_slice(), next],
            )?;
            tx.commit()?;
            Ok(())
        })
    }
}

fn read_nonce(conn: &Connection, sender: &Identity) -> Result<u64> {
    let next: Option<i64> = conn
        .query_row(
            "SELECT next FROM nonces WHERE sender = ?1",
            params![sender.as_bytes().as_slice()],
            |row| row.get(0),
        )
        .optional()?;
    let next = next.unwrap_or(0);
    u64::try_from(next).map_err(|_| StoreError::InvalidData(format!("negative nonce {}", next)))
}
