//! The Vault: one party's view of a registry.
//!
//! Writes are signed and go through a [`TransactionSubmitter`]; reads go
//! straight to the registry.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use cidvault_access::{EncryptionProvider, OpenRequest, Registry};
use cidvault_core::{codec, CodecConfig, EventRecord, Identifier, Identity, Keypair, StorageId};
use cidvault_ledger::{Call, LocalLedger, TransactionSubmitter, TxOutcome, TxReceipt};
use cidvault_store::LedgerStore;

use crate::error::{Result, VaultError};

/// Configuration for a [`Vault`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Codec options for [`Vault::store`] and [`Vault::store_bytes`].
    pub codec: CodecConfig,
    /// Reject identifiers outside the base58 alphabet in [`Vault::store`].
    pub require_well_formed: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            codec: CodecConfig::default(),
            require_well_formed: true,
        }
    }
}

/// A party's handle on a registry.
pub struct Vault<S: LedgerStore, P: EncryptionProvider, T: TransactionSubmitter = LocalLedger> {
    keypair: Keypair,
    registry: Arc<Registry<S, P>>,
    submitter: T,
    config: VaultConfig,
}

impl<S, P, T> Vault<S, P, T>
where
    S: LedgerStore,
    P: EncryptionProvider,
    T: TransactionSubmitter,
{
    /// Create a vault for `keypair`.
    pub fn new(keypair: Keypair, registry: Arc<Registry<S, P>>, submitter: T, config: VaultConfig) -> Self {
        Self {
            keypair,
            registry,
            submitter,
            config,
        }
    }

    /// This party's identity.
    pub fn identity(&self) -> Identity {
        self.keypair.identity()
    }

    pub fn registry(&self) -> &Registry<S, P> {
        &self.registry
    }

    pub fn submitter(&self) -> &T {
        &self.submitter
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate, encode, seal and register an identifier string.
    pub async fn store(&self, cid: &str) -> Result<StorageId> {
        if self.config.require_well_formed {
            codec::validate(cid)?;
        }
        self.store_bytes(cid.as_bytes()).await
    }

    /// Encode, seal and register raw identifier bytes.
    pub async fn store_bytes(&self, input: &[u8]) -> Result<StorageId> {
        let triple = codec::encode_with(input, &self.config.codec)?;
        let context = self.registry.seal_context(self.identity());
        let sealed = self.registry.provider().seal(&triple, &context)?;

        let receipt = self
            .submitter
            .submit_call(
                &self.keypair,
                Call::Register {
                    handles: sealed.handles,
                    proof: Some(sealed.proof),
                },
            )
            .await?;

        match receipt.outcome {
            TxOutcome::Registered(id) => {
                debug!(%id, owner = %self.identity(), "stored identifier");
                Ok(id)
            }
            other => Err(VaultError::UnexpectedOutcome(other)),
        }
    }

    /// Let `reader` fetch and open entry `id`.
    pub async fn share(&self, id: StorageId, reader: Identity) -> Result<TxReceipt> {
        Ok(self
            .submitter
            .submit_call(&self.keypair, Call::GrantAccess { id, reader })
            .await?)
    }

    /// Stop serving entry `id` to `reader`.
    ///
    /// Provider permissions already granted are not withdrawn.
    pub async fn unshare(&self, id: StorageId, reader: Identity) -> Result<TxReceipt> {
        Ok(self
            .submitter
            .submit_call(&self.keypair, Call::RevokeAccess { id, reader })
            .await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch, open and decode entry `id`.
    pub fn retrieve(&self, id: StorageId) -> Result<Identifier> {
        let handles = self.registry.get_handles(self.identity(), id)?;
        let request = OpenRequest::sign(&self.keypair, self.registry.identity(), &handles);
        let triple = self.registry.provider().open(&handles, &request)?;
        Ok(codec::decode(&triple))
    }

    /// Entries this party registered, in creation order.
    pub fn my_entries(&self) -> Result<Vec<StorageId>> {
        Ok(self.registry.entries_owned_by(&self.identity())?)
    }

    /// Whether `who` may read entry `id`.
    pub fn has_access(&self, id: StorageId, who: &Identity) -> Result<bool> {
        Ok(self.registry.has_access(id, who)?)
    }

    /// Explicit readers of an entry this party owns.
    pub fn readers(&self, id: StorageId) -> Result<Vec<Identity>> {
        Ok(self.registry.authorized_readers(self.identity(), id)?)
    }

    /// Committed events that involve this party, after `cursor`.
    pub fn my_events(&self, cursor: u64) -> Result<Vec<EventRecord>> {
        let me = self.identity();
        Ok(self
            .registry
            .events_since(cursor)?
            .into_iter()
            .filter(|record| record.event.involves(&me))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cidvault_core::CodecError;
    use cidvault_testkit::{memory_registry, parties, LedgerFixture, EXAMPLE_CID};

    #[tokio::test]
    async fn test_store_rejects_malformed() {
        let fixture = LedgerFixture::spawn(memory_registry());
        let (alice, _, _) = parties();
        let vault = Vault::new(
            alice.keypair,
            Arc::clone(&fixture.registry),
            fixture.ledger.clone(),
            VaultConfig::default(),
        );

        // '0' is outside the base58 alphabet.
        let bad = "0".repeat(46);
        assert!(matches!(
            vault.store(&bad).await,
            Err(VaultError::Codec(CodecError::InvalidFormat(_)))
        ));
        assert!(matches!(
            vault.store("Qm").await,
            Err(VaultError::Codec(_))
        ));
        assert_eq!(fixture.registry.current_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_store_accepts_prefixed() {
        let fixture = LedgerFixture::spawn(memory_registry());
        let (alice, _, _) = parties();
        let vault = Vault::new(
            alice.keypair,
            Arc::clone(&fixture.registry),
            fixture.ledger.clone(),
            VaultConfig::default(),
        );

        let id = vault
            .store(&codec::add_optional_prefix(EXAMPLE_CID))
            .await
            .unwrap();
        assert_eq!(vault.retrieve(id).unwrap().as_str(), Some(EXAMPLE_CID));
    }

    #[tokio::test]
    async fn test_store_bytes_skips_alphabet_check() {
        let fixture = LedgerFixture::spawn(memory_registry());
        let (alice, _, _) = parties();
        let vault = Vault::new(
            alice.keypair,
            Arc::clone(&fixture.registry),
            fixture.ledger.clone(),
            VaultConfig::default(),
        );

        let raw = [0u8; 46];
        let id = vault.store_bytes(&raw).await.unwrap();
        assert_eq!(vault.retrieve(id).unwrap().as_bytes(), &raw);
    }

    #[tokio::test]
    async fn test_strict_codec_rejects_long_input() {
        let fixture = LedgerFixture::spawn(memory_registry());
        let (alice, _, _) = parties();
        let vault = Vault::new(
            alice.keypair,
            Arc::clone(&fixture.registry),
            fixture.ledger.clone(),
            VaultConfig {
                codec: CodecConfig::strict(),
                require_well_formed: false,
            },
        );

        let long = format!("{}z", EXAMPLE_CID);
        assert!(matches!(
            vault.store(&long).await,
            Err(VaultError::Codec(CodecError::InvalidLength { .. }))
        ));
    }
}
