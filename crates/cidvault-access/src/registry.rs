//! The access-controlled registry.
//!
//! A [`Registry`] maps dense [`StorageId`]s to an owner and three opaque
//! handles, and keeps the set of readers each owner has authorized. It
//! validates every request, drives the [`EncryptionProvider`], and delegates
//! the state change itself to a [`LedgerStore`].

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use cidvault_core::{EventRecord, HandleTriple, Identity, StorageId};
use cidvault_store::{LedgerStore, StoredEntry};

use crate::error::{RegistryError, Result};
use crate::provider::{EncryptionProvider, SealContext, SealedTriple};

/// How lookups on unknown ids are reported to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisclosurePolicy {
    /// `NotFound` and `Forbidden` are distinct.
    #[default]
    Distinct,
    /// Unknown ids are reported as `Forbidden` on actor-checked operations,
    /// so callers cannot probe which ids exist.
    Uniform,
}

/// Configuration for a [`Registry`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub disclosure: DisclosurePolicy,
}

/// An access-controlled registry of sealed identifier triples.
pub struct Registry<S: LedgerStore, P: EncryptionProvider> {
    /// The registry's own identity; the provider context for all handles.
    identity: Identity,
    store: S,
    provider: P,
    config: RegistryConfig,
}

impl<S: LedgerStore, P: EncryptionProvider> Registry<S, P> {
    /// Create a registry over a store and provider.
    pub fn new(identity: Identity, store: S, provider: P, config: RegistryConfig) -> Self {
        Self {
            identity,
            store,
            provider,
            config,
        }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The context a submitter should seal under for this registry.
    pub fn seal_context(&self, submitter: Identity) -> SealContext {
        SealContext {
            registry: self.identity,
            submitter,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a new entry owned by `owner`.
    ///
    /// The registry and the owner are authorized on every handle before the
    /// entry is committed. Handle content is not inspected.
    pub fn register(&self, owner: Identity, handles: HandleTriple) -> Result<StorageId> {
        for handle in &handles {
            self.provider.authorize(handle, &self.identity, &self.identity)?;
            self.provider.authorize(handle, &self.identity, &owner)?;
        }

        let (id, record) = self.store.insert_entry(owner, handles)?;
        debug!(%id, %owner, event = record.index, "registered entry");
        Ok(id)
    }

    /// Verify the provider's proof for `sealed`, then register its handles.
    pub fn register_sealed(&self, owner: Identity, sealed: &SealedTriple) -> Result<StorageId> {
        if let Err(e) = self.provider.verify(sealed, &self.seal_context(owner)) {
            warn!(%owner, error = %e, "rejected sealed registration");
            return Err(e.into());
        }
        self.register(owner, sealed.handles.clone())
    }

    /// Authorize `reader` on entry `id`. Only the owner may grant.
    ///
    /// Granting to a reader who already has access is a no-op.
    pub fn grant_access(&self, actor: Identity, id: StorageId, reader: Identity) -> Result<()> {
        let entry = self.load_owned(actor, id, "grant")?;

        if reader.is_zero() {
            return Err(self.reject(
                "grant",
                RegistryError::InvalidReader {
                    reader,
                    reason: "null identity",
                },
            ));
        }
        if reader == entry.owner || self.store.is_authorized(id, &reader)? {
            debug!(%id, %reader, "reader already authorized");
            return Ok(());
        }

        for handle in &entry.handles {
            self.provider.authorize(handle, &self.identity, &reader)?;
        }

        if let Some(record) = self.store.insert_authorization(id, reader, actor)? {
            debug!(%id, %reader, event = record.index, "granted access");
        }
        Ok(())
    }

    /// Remove `reader` from entry `id`. Only the owner may revoke.
    ///
    /// This is registry-level only: provider permissions already extended
    /// to `reader` are not withdrawn. Revoking a reader without access is a
    /// no-op.
    pub fn revoke_access(&self, actor: Identity, id: StorageId, reader: Identity) -> Result<()> {
        let entry = self.load_owned(actor, id, "revoke")?;

        if reader.is_zero() {
            return Err(self.reject(
                "revoke",
                RegistryError::InvalidReader {
                    reader,
                    reason: "null identity",
                },
            ));
        }
        if reader == entry.owner {
            return Err(self.reject(
                "revoke",
                RegistryError::InvalidReader {
                    reader,
                    reason: "the owner cannot be revoked",
                },
            ));
        }

        match self.store.remove_authorization(id, reader, actor)? {
            Some(record) => debug!(%id, %reader, event = record.index, "revoked access"),
            None => debug!(%id, %reader, "reader was not authorized"),
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// The handles of entry `id`, for its owner or an authorized reader.
    pub fn get_handles(&self, actor: Identity, id: StorageId) -> Result<HandleTriple> {
        let entry = self.load_checked(actor, id, "get_handles")?;

        if actor != entry.owner && !self.store.is_authorized(id, &actor)? {
            return Err(self.reject("get_handles", RegistryError::Forbidden { id, actor }));
        }
        Ok(entry.handles)
    }

    /// Whether `who` may read entry `id`. False for unknown ids.
    pub fn has_access(&self, id: StorageId, who: &Identity) -> Result<bool> {
        match self.store.get_entry(id)? {
            None => Ok(false),
            Some(entry) if entry.owner == *who => Ok(true),
            Some(_) => Ok(self.store.is_authorized(id, who)?),
        }
    }

    /// The owner of entry `id`.
    ///
    /// Always reports unknown ids as `NotFound`, whatever the disclosure
    /// policy: ownership is public.
    pub fn owner_of(&self, id: StorageId) -> Result<Identity> {
        self.store
            .get_entry(id)?
            .map(|entry| entry.owner)
            .ok_or(RegistryError::NotFound(id))
    }

    /// Ids registered by `who`, in creation order.
    pub fn entries_owned_by(&self, who: &Identity) -> Result<Vec<StorageId>> {
        Ok(self.store.entries_owned_by(who)?)
    }

    /// Number of entries ever registered; also the most recent id.
    pub fn current_count(&self) -> Result<u64> {
        Ok(self.store.entry_count()?)
    }

    /// Explicit readers of entry `id`. Owner only; the owner is not listed.
    pub fn authorized_readers(&self, actor: Identity, id: StorageId) -> Result<Vec<Identity>> {
        self.load_owned(actor, id, "authorized_readers")?;
        Ok(self.store.authorized_readers(id)?)
    }

    /// Events with index greater than `cursor`, in commit order.
    pub fn events_since(&self, cursor: u64) -> Result<Vec<EventRecord>> {
        Ok(self.store.events_since(cursor)?)
    }

    /// Events concerning entry `id`, in commit order.
    pub fn events_for(&self, id: StorageId) -> Result<Vec<EventRecord>> {
        Ok(self.store.events_for(id)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    /// Load an entry for an actor-checked operation, applying the
    /// disclosure policy to unknown ids.
    fn load_checked(&self, actor: Identity, id: StorageId, op: &'static str) -> Result<StoredEntry> {
        match self.store.get_entry(id)? {
            Some(entry) => Ok(entry),
            None => {
                let err = match self.config.disclosure {
                    DisclosurePolicy::Distinct => RegistryError::NotFound(id),
                    DisclosurePolicy::Uniform => RegistryError::Forbidden { id, actor },
                };
                Err(self.reject(op, err))
            }
        }
    }

    /// Load an entry and require `actor` to own it.
    fn load_owned(&self, actor: Identity, id: StorageId, op: &'static str) -> Result<StoredEntry> {
        let entry = self.load_checked(actor, id, op)?;
        if entry.owner != actor {
            return Err(self.reject(op, RegistryError::Forbidden { id, actor }));
        }
        Ok(entry)
    }

    fn reject(&self, op: &'static str, err: RegistryError) -> RegistryError {
        warn!(registry = %self.identity, op, error = %err, "rejected");
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cidvault_core::{codec, Handle, Keypair, RegistryEvent};
    use cidvault_store::MemoryStore;

    use crate::error::ProviderError;
    use crate::plaintext::PlaintextProvider;
    use crate::provider::OpenRequest;

    const EXAMPLE: &[u8] = b"QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

    type TestRegistry = Registry<MemoryStore, PlaintextProvider>;

    fn registry_with(config: RegistryConfig) -> TestRegistry {
        Registry::new(
            Identity::from_bytes([0xee; 20]),
            MemoryStore::new(),
            PlaintextProvider::new(),
            config,
        )
    }

    fn registry() -> TestRegistry {
        registry_with(RegistryConfig::default())
    }

    fn party(seed: u8) -> Keypair {
        Keypair::from_seed(&[seed; 32])
    }

    fn handles(tag: u8) -> HandleTriple {
        HandleTriple::new(
            Handle::new(vec![tag; 20]),
            Handle::new(vec![tag.wrapping_add(1); 20]),
            Handle::new(vec![tag.wrapping_add(2); 20]),
        )
    }

    fn event_count(registry: &TestRegistry) -> usize {
        registry.events_since(0).unwrap().len()
    }

    #[test]
    fn test_ids_are_dense_from_one() {
        let registry = registry();
        let a = party(1).identity();
        let b = party(2).identity();

        assert_eq!(registry.current_count().unwrap(), 0);
        assert_eq!(registry.register(a, handles(1)).unwrap(), StorageId(1));
        assert_eq!(registry.register(b, handles(2)).unwrap(), StorageId(2));
        assert_eq!(registry.register(a, handles(3)).unwrap(), StorageId(3));
        assert_eq!(registry.current_count().unwrap(), 3);

        assert_eq!(
            registry.entries_owned_by(&a).unwrap(),
            vec![StorageId(1), StorageId(3)]
        );
        assert_eq!(registry.entries_owned_by(&b).unwrap(), vec![StorageId(2)]);
        assert!(registry
            .entries_owned_by(&party(3).identity())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_register_emits_stored_event() {
        let registry = registry();
        let a = party(1).identity();
        let id = registry.register(a, handles(1)).unwrap();

        let events = registry.events_since(0).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].index, 1);
        assert_eq!(events[0].event, RegistryEvent::Stored { id, owner: a });
    }

    #[test]
    fn test_register_authorizes_registry_and_owner() {
        let registry = registry();
        let a = party(1).identity();
        let triple = handles(1);
        registry.register(a, triple.clone()).unwrap();

        for handle in &triple {
            let grantees = registry
                .provider()
                .grantees(&registry.identity(), handle)
                .unwrap();
            assert!(grantees.contains(&registry.identity()));
            assert!(grantees.contains(&a));
        }
    }

    #[test]
    fn test_owner_has_implicit_access() {
        let registry = registry();
        let a = party(1).identity();
        let id = registry.register(a, handles(1)).unwrap();

        assert!(registry.has_access(id, &a).unwrap());
        assert_eq!(registry.owner_of(id).unwrap(), a);
        assert_eq!(registry.get_handles(a, id).unwrap(), handles(1));
        assert!(registry.authorized_readers(a, id).unwrap().is_empty());
    }

    #[test]
    fn test_grant_then_revoke() {
        let registry = registry();
        let a = party(1).identity();
        let b = party(2).identity();
        let id = registry.register(a, handles(1)).unwrap();

        assert!(!registry.has_access(id, &b).unwrap());

        registry.grant_access(a, id, b).unwrap();
        assert!(registry.has_access(id, &b).unwrap());
        assert_eq!(registry.get_handles(b, id).unwrap(), handles(1));
        assert_eq!(registry.authorized_readers(a, id).unwrap(), vec![b]);

        registry.revoke_access(a, id, b).unwrap();
        assert!(!registry.has_access(id, &b).unwrap());
        assert!(matches!(
            registry.get_handles(b, id),
            Err(RegistryError::Forbidden { .. })
        ));

        let kinds: Vec<_> = registry
            .events_for(id)
            .unwrap()
            .into_iter()
            .map(|r| r.event)
            .collect();
        assert_eq!(
            kinds,
            vec![
                RegistryEvent::Stored { id, owner: a },
                RegistryEvent::AccessGranted {
                    id,
                    reader: b,
                    actor: a
                },
                RegistryEvent::AccessRevoked {
                    id,
                    reader: b,
                    actor: a
                },
            ]
        );
    }

    #[test]
    fn test_grant_is_idempotent() {
        let registry = registry();
        let a = party(1).identity();
        let b = party(2).identity();
        let id = registry.register(a, handles(1)).unwrap();

        registry.grant_access(a, id, b).unwrap();
        let after_first = event_count(&registry);
        registry.grant_access(a, id, b).unwrap();
        assert_eq!(event_count(&registry), after_first);

        // Granting to the owner is a no-op too.
        registry.grant_access(a, id, a).unwrap();
        assert_eq!(event_count(&registry), after_first);
        assert!(registry.authorized_readers(a, id).unwrap() == vec![b]);
    }

    #[test]
    fn test_revoke_absent_reader_is_noop() {
        let registry = registry();
        let a = party(1).identity();
        let id = registry.register(a, handles(1)).unwrap();

        registry.revoke_access(a, id, party(2).identity()).unwrap();
        assert_eq!(event_count(&registry), 1);
    }

    #[test]
    fn test_non_owner_cannot_grant_or_revoke() {
        let registry = registry();
        let a = party(1).identity();
        let b = party(2).identity();
        let c = party(3).identity();
        let id = registry.register(a, handles(1)).unwrap();
        registry.grant_access(a, id, b).unwrap();
        let before = event_count(&registry);

        // Even an authorized reader cannot re-share.
        assert!(matches!(
            registry.grant_access(b, id, c),
            Err(RegistryError::Forbidden { actor, .. }) if actor == b
        ));
        assert!(matches!(
            registry.revoke_access(c, id, b),
            Err(RegistryError::Forbidden { .. })
        ));
        assert!(!registry.has_access(id, &c).unwrap());
        assert!(registry.has_access(id, &b).unwrap());
        assert_eq!(event_count(&registry), before);
    }

    #[test]
    fn test_stranger_cannot_read_handles() {
        let registry = registry();
        let a = party(1).identity();
        let id = registry.register(a, handles(1)).unwrap();

        assert!(matches!(
            registry.get_handles(party(9).identity(), id),
            Err(RegistryError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_invalid_readers() {
        let registry = registry();
        let a = party(1).identity();
        let id = registry.register(a, handles(1)).unwrap();

        assert!(matches!(
            registry.grant_access(a, id, Identity::ZERO),
            Err(RegistryError::InvalidReader { .. })
        ));
        assert!(matches!(
            registry.revoke_access(a, id, Identity::ZERO),
            Err(RegistryError::InvalidReader { .. })
        ));
        assert!(matches!(
            registry.revoke_access(a, id, a),
            Err(RegistryError::InvalidReader { .. })
        ));
        assert!(registry.has_access(id, &a).unwrap());
        assert_eq!(event_count(&registry), 1);
    }

    #[test]
    fn test_nonexistent_ids() {
        let registry = registry();
        let a = party(1).identity();
        registry.register(a, handles(1)).unwrap();

        for id in [StorageId(0), StorageId(2), StorageId(u64::MAX)] {
            assert!(!registry.has_access(id, &a).unwrap());
            assert!(matches!(registry.owner_of(id), Err(RegistryError::NotFound(_))));
            assert!(matches!(
                registry.get_handles(a, id),
                Err(RegistryError::NotFound(_))
            ));
            assert!(matches!(
                registry.grant_access(a, id, party(2).identity()),
                Err(RegistryError::NotFound(_))
            ));
            assert!(matches!(
                registry.revoke_access(a, id, party(2).identity()),
                Err(RegistryError::NotFound(_))
            ));
        }
        assert_eq!(registry.current_count().unwrap(), 1);
    }

    #[test]
    fn test_uniform_disclosure() {
        let registry = registry_with(RegistryConfig {
            disclosure: DisclosurePolicy::Uniform,
        });
        let a = party(1).identity();
        let missing = StorageId(7);

        assert!(matches!(
            registry.get_handles(a, missing),
            Err(RegistryError::Forbidden { .. })
        ));
        assert!(matches!(
            registry.grant_access(a, missing, party(2).identity()),
            Err(RegistryError::Forbidden { .. })
        ));
        assert!(matches!(
            registry.revoke_access(a, missing, party(2).identity()),
            Err(RegistryError::Forbidden { .. })
        ));
        assert!(matches!(
            registry.authorized_readers(a, missing),
            Err(RegistryError::Forbidden { .. })
        ));
        // Ownership stays public.
        assert!(matches!(
            registry.owner_of(missing),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn test_grant_extends_provider_permission() {
        let registry = registry();
        let owner = party(1);
        let reader = party(2);
        let ctx = registry.seal_context(owner.identity());
        let triple = codec::encode(EXAMPLE).unwrap();
        let sealed = registry.provider().seal(&triple, &ctx).unwrap();

        let id = registry.register_sealed(owner.identity(), &sealed).unwrap();
        registry
            .grant_access(owner.identity(), id, reader.identity())
            .unwrap();

        let handles = registry.get_handles(reader.identity(), id).unwrap();
        let request = OpenRequest::sign(&reader, registry.identity(), &handles);
        let opened = registry.provider().open(&handles, &request).unwrap();
        assert_eq!(codec::decode(&opened).as_bytes(), EXAMPLE);
    }

    #[test]
    fn test_register_sealed_rejects_foreign_proof() {
        let registry = registry();
        let owner = party(1).identity();
        let triple = codec::encode(EXAMPLE).unwrap();
        // Sealed for a different submitter.
        let sealed = registry
            .provider()
            .seal(&triple, &registry.seal_context(party(5).identity()))
            .unwrap();

        assert!(matches!(
            registry.register_sealed(owner, &sealed),
            Err(RegistryError::Provider(ProviderError::InvalidProof))
        ));
        assert_eq!(registry.current_count().unwrap(), 0);
        assert_eq!(event_count(&registry), 0);
    }

    #[test]
    fn test_registries_are_independent() {
        let first = registry();
        let second = registry();
        let a = party(1).identity();

        first.register(a, handles(1)).unwrap();
        assert_eq!(first.current_count().unwrap(), 1);
        assert_eq!(second.current_count().unwrap(), 0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Register(u8),
            Grant(u8, u64, u8),
            Revoke(u8, u64, u8),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (1u8..5).prop_map(Op::Register),
                (1u8..5, 0u64..8, 0u8..5).prop_map(|(a, id, r)| Op::Grant(a, id, r)),
                (1u8..5, 0u64..8, 0u8..5).prop_map(|(a, id, r)| Op::Revoke(a, id, r)),
            ]
        }

        fn ident(seed: u8) -> Identity {
            if seed == 0 {
                Identity::ZERO
            } else {
                Identity::from_bytes([seed; 20])
            }
        }

        proptest! {
            #[test]
            fn invariants_hold_under_any_sequence(ops in prop::collection::vec(op(), 1..40)) {
                let registry = registry();
                let mut registered = 0u64;

                for op in ops {
                    match op {
                        Op::Register(a) => {
                            let id = registry.register(ident(a), handles(a)).unwrap();
                            registered += 1;
                            prop_assert_eq!(id, StorageId(registered));
                        }
                        Op::Grant(a, id, r) => {
                            let _ = registry.grant_access(ident(a), StorageId(id), ident(r));
                        }
                        Op::Revoke(a, id, r) => {
                            let _ = registry.revoke_access(ident(a), StorageId(id), ident(r));
                        }
                    }
                }

                prop_assert_eq!(registry.current_count().unwrap(), registered);
                let mut owned = 0usize;
                for seed in 1u8..5 {
                    let who = ident(seed);
                    let ids = registry.entries_owned_by(&who).unwrap();
                    prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
                    for id in &ids {
                        prop_assert_eq!(registry.owner_of(*id).unwrap(), who);
                        prop_assert!(registry.has_access(*id, &who).unwrap());
                    }
                    owned += ids.len();
                }
                prop_assert_eq!(owned as u64, registered);
            }
        }
    }
}
