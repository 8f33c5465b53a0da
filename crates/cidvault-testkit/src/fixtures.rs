//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinHandle;

use cidvault_access::{
    EncryptionProvider, PlaintextProvider, Registry, RegistryConfig, SealedBoxProvider,
};
use cidvault_core::{Identity, Keypair};
use cidvault_ledger::{LedgerConfig, LocalLedger};
use cidvault_store::{LedgerStore, MemoryStore, SqliteStore, StoreError};

/// Identity used for test registries.
pub const REGISTRY_IDENTITY: Identity = Identity::from_bytes([0xee; 20]);

/// A named party with a deterministic keypair.
#[derive(Debug, Clone)]
pub struct Party {
    pub name: &'static str,
    pub keypair: Keypair,
}

impl Party {
    /// Create with a keypair derived from `seed`.
    pub fn new(name: &'static str, seed: u8) -> Self {
        Self {
            name,
            keypair: Keypair::from_seed(&[seed; 32]),
        }
    }

    pub fn identity(&self) -> Identity {
        self.keypair.identity()
    }
}

/// Alice, Bob and Carol.
pub fn parties() -> (Party, Party, Party) {
    (
        Party::new("alice", 0xa1),
        Party::new("bob", 0xb0),
        Party::new("carol", 0xc4),
    )
}

/// An in-memory registry with the plaintext provider.
pub fn memory_registry() -> Registry<MemoryStore, PlaintextProvider> {
    memory_registry_with(RegistryConfig::default())
}

/// An in-memory registry with the plaintext provider and a custom config.
pub fn memory_registry_with(config: RegistryConfig) -> Registry<MemoryStore, PlaintextProvider> {
    Registry::new(
        REGISTRY_IDENTITY,
        MemoryStore::new(),
        PlaintextProvider::new(),
        config,
    )
}

/// An in-memory registry with a sealed-box provider.
pub fn sealed_registry(master: [u8; 32]) -> Registry<MemoryStore, SealedBoxProvider> {
    Registry::new(
        REGISTRY_IDENTITY,
        MemoryStore::new(),
        SealedBoxProvider::new(master),
        RegistryConfig::default(),
    )
}

/// A SQLite-backed registry with the plaintext provider.
pub fn sqlite_registry(
    path: impl AsRef<Path>,
) -> Result<Registry<SqliteStore, PlaintextProvider>, StoreError> {
    Ok(Registry::new(
        REGISTRY_IDENTITY,
        SqliteStore::open(path)?,
        PlaintextProvider::new(),
        RegistryConfig::default(),
    ))
}

/// A registry behind a running sequencer.
pub struct LedgerFixture<S: LedgerStore, P: EncryptionProvider> {
    pub registry: Arc<Registry<S, P>>,
    pub ledger: LocalLedger,
    pub task: JoinHandle<()>,
}

impl<S, P> LedgerFixture<S, P>
where
    S: LedgerStore + 'static,
    P: EncryptionProvider + 'static,
{
    /// Spawn a sequencer over `registry`. Requires a tokio runtime.
    pub fn spawn(registry: Registry<S, P>) -> Self {
        let registry = Arc::new(registry);
        let (ledger, task) = LocalLedger::spawn(Arc::clone(&registry), LedgerConfig::default());
        Self {
            registry,
            ledger,
            task,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parties_are_distinct() {
        let (alice, bob, carol) = parties();
        assert_ne!(alice.identity(), bob.identity());
        assert_ne!(bob.identity(), carol.identity());
        assert_ne!(alice.identity(), carol.identity());
        assert!(!alice.identity().is_zero());
    }

    #[test]
    fn test_sqlite_registry_opens() {
        let dir = tempfile::tempdir().unwrap();
        let registry = sqlite_registry(dir.path().join("fixture.db")).unwrap();
        assert_eq!(registry.current_count().unwrap(), 0);
        assert_eq!(registry.identity(), REGISTRY_IDENTITY);
    }
}
