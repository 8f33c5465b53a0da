//! LedgerStore trait: the abstract interface for registry persistence.
//!
//! The logical layout is a monotonic counter, a map from id to entry, the
//! authorization relation, an owner index, and an append-only event log.
//! Every mutating method is atomic: the state change and its event are
//! committed together or not at all.

use cidvault_core::{EventRecord, HandleTriple, Identity, StorageId};

use crate::error::Result;

/// A registered entry as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub id: StorageId,
    pub owner: Identity,
    pub handles: HandleTriple,
    /// Commit time (Unix ms).
    pub created_at: i64,
}

/// Synchronous interface for registry state.
///
/// Implementations must be thread-safe. Reads may run concurrently with each
/// other; writes are serialized.
///
/// # Design Notes
///
/// - **Dense ids**: `insert_entry` assigns `entry_count() + 1`.
/// - **Idempotent authorization**: inserting an existing pair or removing an
///   absent one returns `None` and appends no event.
/// - **Persistent nonces**: per-sender nonces live with the rest of the
///   state, so a restarted sequencer cannot accept a replayed transaction.
/// - **Referential integrity**: authorization changes on an unknown id fail
///   with [`StoreError::NotFound`](crate::StoreError::NotFound).
pub trait LedgerStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Entries
    // ─────────────────────────────────────────────────────────────────────────

    /// Allocate the next id, persist the entry, index it under `owner`, and
    /// append its `Stored` event.
    fn insert_entry(&self, owner: Identity, handles: HandleTriple) -> Result<(StorageId, EventRecord)>;

    /// Get an entry by id.
    fn get_entry(&self, id: StorageId) -> Result<Option<StoredEntry>>;

    /// Number of entries ever created (also the latest id, or 0).
    fn entry_count(&self) -> Result<u64>;

    /// Ids created by `owner`, in creation order.
    fn entries_owned_by(&self, owner: &Identity) -> Result<Vec<StorageId>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Authorization relation
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether `(id, reader)` is in the authorization relation.
    ///
    /// Does not consider ownership.
    fn is_authorized(&self, id: StorageId, reader: &Identity) -> Result<bool>;

    /// Explicit readers of an entry, ordered by identity bytes.
    fn authorized_readers(&self, id: StorageId) -> Result<Vec<Identity>>;

    /// Add `(id, reader)` and append an `AccessGranted` event.
    fn insert_authorization(
        &self,
        id: StorageId,
        reader: Identity,
        actor: Identity,
    ) -> Result<Option<EventRecord>>;

    /// Remove `(id, reader)` and append an `AccessRevoked` event.
    fn remove_authorization(
        &self,
        id: StorageId,
        reader: Identity,
        actor: Identity,
    ) -> Result<Option<EventRecord>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Event log
    // ─────────────────────────────────────────────────────────────────────────

    /// Events with `index > after`, in log order.
    fn events_since(&self, after: u64) -> Result<Vec<EventRecord>>;

    /// Events concerning one entry, in log order.
    fn events_for(&self, id: StorageId) -> Result<Vec<EventRecord>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Sender nonces
    // ─────────────────────────────────────────────────────────────────────────

    /// The nonce the next transaction from `sender` must carry (0 if unseen).
    fn next_nonce(&self, sender: &Identity) -> Result<u64>;

    /// Consume `nonce` for `sender` if it is the expected one.
    ///
    /// Fails with [`StoreError::NonceMismatch`](crate::StoreError::NonceMismatch)
    /// and changes nothing otherwise.
    fn consume_nonce(&self, sender: Identity, nonce: u64) -> Result<()>;
}

/// Current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
