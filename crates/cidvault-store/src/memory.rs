//! In-memory implementation of the LedgerStore trait.
//!
//! Same semantics as SQLite, no persistence. Each instance is an
//! independent registry state, so tests can run many side by side.

use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use cidvault_core::{EventRecord, HandleTriple, Identity, RegistryEvent, StorageId};

use crate::error::{Result, StoreError};
use crate::traits::{now_millis, LedgerStore, StoredEntry};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Entries in id order; entry `n` lives at index `n - 1`.
    entries: Vec<StoredEntry>,

    /// Owner index: owner -> ids in creation order.
    by_owner: HashMap<Identity, Vec<StorageId>>,

    /// Authorization relation.
    readers: HashMap<StorageId, BTreeSet<Identity>>,

    /// Event log; record `n` lives at index `n - 1`.
    events: Vec<EventRecord>,

    /// Next expected nonce per sender.
    nonces: HashMap<Identity, u64>,
}

impl MemoryStoreInner {
    fn contains(&self, id: StorageId) -> bool {
        id.get() >= 1 && id.get() <= self.entries.len() as u64
    }

    fn append_event(&mut self, event: RegistryEvent) -> EventRecord {
        let record = EventRecord {
            index: self.events.len() as u64 + 1,
            event,
            recorded_at: now_millis(),
        };
        self.events.push(record.clone());
        record
    }
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
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for MemoryStore {
    fn insert_entry(&self, owner: Identity, handles: HandleTriple) -> Result<(StorageId, EventRecord)> {
        let mut inner = self.write()?;

        let id = StorageId::new(inner.entries.len() as u64 + 1);
        inner.entries.push(StoredEntry {
            id,
            owner,
            handles,
            created_at: now_millis(),
        });
        inner.by_owner.entry(owner).or_default().push(id);
        let record = inner.append_event(RegistryEvent::Stored { id, owner });

        Ok((id, record))
    }

    fn get_entry(&self, id: StorageId) -> Result<Option<StoredEntry>> {
        let inner = self.read()?;
        if !inner.contains(id) {
            return Ok(None);
        }
        Ok(inner.entries.get(id.get() as usize - 1).cloned())
    }

    fn entry_count(&self) -> Result<u64> {
        Ok(self.read()?.entries.len() as u64)
    }

    fn entries_owned_by(&self, owner: &Identity) -> Result<Vec<StorageId>> {
        let inner = self.read()?;
        Ok(inner.by_owner.get(owner).cloned().unwrap_or_default())
    }

    fn is_authorized(&self, id: StorageId, reader: &Identity) -> Result<bool> {
        let inner = self.read()?;
        Ok(inner
            .readers
            .get(&id)
            .map(|set| set.contains(reader))
            .unwrap_or(false))
    }

    fn authorized_readers(&self, id: StorageId) -> Result<Vec<Identity>> {
        let inner = self.read()?;
        Ok(inner
            .readers
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    fn insert_authorization(
        &self,
        id: StorageId,
        reader: Identity,
        actor: Identity,
    ) -> Result<Option<EventRecord>> {
        let mut inner = self.write()?;

        if !inner.contains(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }

        if !inner.readers.entry(id).or_default().insert(reader) {
            return Ok(None);
        }

        Ok(Some(inner.append_event(RegistryEvent::AccessGranted {
            id,
            reader,
            actor,
        })))
    }

    fn remove_authorization(
        &self,
        id: StorageId,
        reader: Identity,
        actor: Identity,
    ) -> Result<Option<EventRecord>> {
        let mut inner = self.write()?;

        if !inner.contains(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let removed = inner
            .readers
            .get_mut(&id)
            .map(|set| set.remove(&reader))
            .unwrap_or(false);
        if !removed {
            return Ok(None);
        }

        Ok(Some(inner.append_event(RegistryEvent::AccessRevoked {
            id,
            reader,
            actor,
        })))
    }

    fn events_since(&self, after: u64) -> Result<Vec<EventRecord>> {
        let inner = self.read()?;
        let start = (after as usize).min(inner.events.len());
        Ok(inner.events[start..].to_vec())
    }

    fn events_for(&self, id: StorageId) -> Result<Vec<EventRecord>> {
        let inner = self.read()?;
        Ok(inner
            .events
            .iter()
            .filter(|r| r.event.storage_id() == id)
            .cloned()
            .collect())
    }

    fn next_nonce(&self, sender: &Identity) -> Result<u64> {
        Ok(self.read()?.nonces.get(sender).copied().unwrap_or(0))
    }

    fn consume_nonce(&self, sender: Identity, nonce: u64) -> Result<()> {
        let mut inner = self.write()?;
        let next = inner.nonces.entry(sender).or_insert(0);
        if *next != nonce {
            return Err(StoreError::NonceMismatch {
                expected: *next,
                actual: nonce,
            });
        }
        *next += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cidvault_core::Handle;
    use proptest::prelude::*;

    fn handles(tag: u8) -> HandleTriple {
        HandleTriple::new(
            Handle::new(vec![tag, 1]),
            Handle::new(vec![tag, 2]),
            Handle::new(vec![tag, 3]),
        )
    }

    fn identity(tag: u8) -> Identity {
        Identity::from_bytes([tag; 20])
    }

    #[test]
    fn test_insert_and_get_entry() {
        let store = MemoryStore::new();
        let owner = identity(0xaa);

        let (id, record) = store.insert_entry(owner, handles(1)).unwrap();
        assert_eq!(id, StorageId::FIRST);
        assert_eq!(record.index, 1);
        assert_eq!(record.event, RegistryEvent::Stored { id, owner });

        let entry = store.get_entry(id).unwrap().unwrap();
        assert_eq!(entry.owner, owner);
        assert_eq!(entry.handles, handles(1));

        assert!(store.get_entry(StorageId::new(0)).unwrap().is_none());
        assert!(store.get_entry(StorageId::new(2)).unwrap().is_none());
    }

    #[test]
    fn test_authorization_idempotent() {
        let store = MemoryStore::new();
        let owner = identity(0xaa);
        let reader = identity(0xbb);
        let (id, _) = store.insert_entry(owner, handles(1)).unwrap();

        assert!(store.insert_authorization(id, reader, owner).unwrap().is_some());
        assert!(store.insert_authorization(id, reader, owner).unwrap().is_none());
        assert!(store.is_authorized(id, &reader).unwrap());

        assert!(store.remove_authorization(id, reader, owner).unwrap().is_some());
        assert!(store.remove_authorization(id, reader, owner).unwrap().is_none());
        assert!(!store.is_authorized(id, &reader).unwrap());

        // Stored + granted + revoked
        assert_eq!(store.events_for(id).unwrap().len(), 3);
    }

    #[test]
    fn test_authorization_requires_entry() {
        let store = MemoryStore::new();
        let result = store.insert_authorization(StorageId::new(9), identity(1), identity(2));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_events_since_cursor() {
        let store = MemoryStore::new();
        store.insert_entry(identity(1), handles(1)).unwrap();
        store.insert_entry(identity(2), handles(2)).unwrap();

        assert_eq!(store.events_since(0).unwrap().len(), 2);
        let tail = store.events_since(1).unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].index, 2);
        assert!(store.events_since(10).unwrap().is_empty());
    }

    #[test]
    fn test_nonces_advance_strictly() {
        let store = MemoryStore::new();
        let sender = identity(0xaa);

        assert_eq!(store.next_nonce(&sender).unwrap(), 0);
        store.consume_nonce(sender, 0).unwrap();
        store.consume_nonce(sender, 1).unwrap();

        assert!(matches!(
            store.consume_nonce(sender, 1),
            Err(StoreError::NonceMismatch {
                expected: 2,
                actual: 1
            })
        ));
        assert!(store.consume_nonce(sender, 5).is_err());
        assert_eq!(store.next_nonce(&sender).unwrap(), 2);
        assert_eq!(store.next_nonce(&identity(0xbb)).unwrap(), 0);
    }

    proptest! {
        #[test]
        fn prop_ids_dense_and_indexed(owners in prop::collection::vec(0u8..4, 1..40)) {
            let store = MemoryStore::new();
            for (n, tag) in owners.iter().enumerate() {
                let (id, _) = store.insert_entry(identity(*tag), handles(*tag)).unwrap();
                prop_assert_eq!(id.get(), n as u64 + 1);
            }
            prop_assert_eq!(store.entry_count().unwrap(), owners.len() as u64);

            for tag in 0u8..4 {
                let expected: Vec<StorageId> = owners
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| **t == tag)
                    .map(|(n, _)| StorageId::new(n as u64 + 1))
                    .collect();
                prop_assert_eq!(store.entries_owned_by(&identity(tag)).unwrap(), expected);
            }
        }
    }
}
