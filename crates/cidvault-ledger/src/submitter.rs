//! The transaction submitter abstraction.
//!
//! Callers submit signed transactions and wait for a receipt. Ordering and
//! commit happen behind this trait; events are observable through a
//! broadcast subscription.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use cidvault_core::{Blake3Hash, EventRecord, Identity, Keypair, StorageId};

use crate::error::Result;
use crate::transaction::{Call, SignedTransaction};

/// What a committed transaction did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxOutcome {
    Registered(StorageId),
    AccessGranted,
    AccessRevoked,
}

/// Proof of commit for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: Blake3Hash,
    /// Position in the ledger's total order, from 1.
    pub sequence: u64,
    pub outcome: TxOutcome,
    /// Events committed by this transaction. Empty for idempotent no-ops.
    pub events: Vec<EventRecord>,
}

impl TxReceipt {
    /// The id created by a `Register` call.
    pub fn storage_id(&self) -> Option<StorageId> {
        match self.outcome {
            TxOutcome::Registered(id) => Some(id),
            _ => None,
        }
    }
}

/// Submits signed transactions and reports their result.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Submit a transaction and wait for its receipt.
    async fn submit(&self, tx: SignedTransaction) -> Result<TxReceipt>;

    /// The nonce the next transaction from `sender` must carry.
    async fn next_nonce(&self, sender: &Identity) -> Result<u64>;

    /// Subscribe to committed events.
    fn subscribe(&self) -> broadcast::Receiver<EventRecord>;

    /// Sign `call` with the sender's next nonce and submit it.
    ///
    /// Concurrent calls from the same keypair may race on the nonce; one of
    /// them then fails with `BadNonce`.
    async fn submit_call(&self, keypair: &Keypair, call: Call) -> Result<TxReceipt> {
        let nonce = self.next_nonce(&keypair.identity()).await?;
        let tx = SignedTransaction::new(keypair, nonce, call)?;
        self.submit(tx).await
    }
}
