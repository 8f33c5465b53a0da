//! A local single-writer sequencer.
//!
//! [`LocalLedger`] owns a registry and applies transactions one at a time in
//! arrival order. Handles are cheap to clone; the sequencer task stops once
//! every handle has been dropped.
//!
//! ## Execution
//!
//! 1. Verify the signature against the declared sender.
//! 2. Consume the sender's nonce in the store; it must be exactly the next
//!    one. Nonces persist with registry state, so a restart cannot reopen
//!    the window for replays.
//! 3. Run the call on a blocking thread (stores may block on I/O).
//! 4. Collect the events the call committed and broadcast them.
//!
//! The sequencer assumes it is the registry's only writer: a receipt carries
//! every event committed while its call ran.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use cidvault_access::{EncryptionProvider, Registry, SealedTriple};
use cidvault_core::{EventRecord, Identity};
use cidvault_store::LedgerStore;

use crate::error::{LedgerError, Result};
use crate::submitter::{TransactionSubmitter, TxOutcome, TxReceipt};
use crate::transaction::{Call, SignedTransaction};

/// Configuration for a [`LocalLedger`].
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Pending transactions buffered before `submit` applies backpressure.
    pub queue_capacity: usize,
    /// Events buffered per subscriber before slow subscribers lag.
    pub event_capacity: usize,
    /// How long `submit` waits for a receipt.
    pub finality_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            event_capacity: 1024,
            finality_timeout: Duration::from_secs(30),
        }
    }
}

enum Command {
    Submit {
        tx: SignedTransaction,
        reply: oneshot::Sender<Result<TxReceipt>>,
    },
    NextNonce {
        sender: Identity,
        reply: oneshot::Sender<Result<u64>>,
    },
}

/// Handle to a running sequencer.
#[derive(Clone)]
pub struct LocalLedger {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<EventRecord>,
    config: LedgerConfig,
}

impl LocalLedger {
    /// Start a sequencer over `registry`.
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn<S, P>(registry: Arc<Registry<S, P>>, config: LedgerConfig) -> (Self, JoinHandle<()>)
    where
        S: LedgerStore + 'static,
        P: EncryptionProvider + 'static,
    {
        let (commands, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        let sequencer = Sequencer {
            registry,
            events: events.clone(),
            sequence: 0,
            cursor: 0,
        };
        let handle = tokio::spawn(sequencer.run(rx));

        (
            Self {
                commands,
                events,
                config,
            },
            handle,
        )
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    async fn request<T>(&self, command: Command, rx: oneshot::Receiver<T>) -> Result<T> {
        self.commands
            .send(command)
            .await
            .map_err(|_| LedgerError::Closed)?;

        match tokio::time::timeout(self.config.finality_timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(LedgerError::Closed),
            Err(_) => Err(LedgerError::Timeout(self.config.finality_timeout)),
        }
    }
}

#[async_trait]
impl TransactionSubmitter for LocalLedger {
    async fn submit(&self, tx: SignedTransaction) -> Result<TxReceipt> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Submit { tx, reply }, rx).await?
    }

    async fn next_nonce(&self, sender: &Identity) -> Result<u64> {
        let (reply, rx) = oneshot::channel();
        self.request(
            Command::NextNonce {
                sender: *sender,
                reply,
            },
            rx,
        )
        .await?
    }

    fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events.subscribe()
    }
}

struct Sequencer<S: LedgerStore, P: EncryptionProvider> {
    registry: Arc<Registry<S, P>>,
    events: broadcast::Sender<EventRecord>,
    sequence: u64,
    /// Index of the last event already attributed to a receipt.
    cursor: u64,
}

impl<S, P> Sequencer<S, P>
where
    S: LedgerStore + 'static,
    P: EncryptionProvider + 'static,
{
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        self.cursor = match self.latest_event_index().await {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, "could not read event log; starting from 0");
                0
            }
        };
        info!(registry = %self.registry.identity(), cursor = self.cursor, "ledger started");

        while let Some(command) = rx.recv().await {
            match command {
                Command::Submit { tx, reply } => {
                    let result = self.execute(tx).await;
                    if let Err(e) = &result {
                        warn!(error = %e, "transaction failed");
                    }
                    // The submitter may have timed out and gone away.
                    let _ = reply.send(result);
                }
                Command::NextNonce { sender, reply } => {
                    let _ = reply.send(self.next_nonce(sender).await);
                }
            }
        }

        info!(registry = %self.registry.identity(), sequence = self.sequence, "ledger stopped");
    }

    async fn execute(&mut self, signed: SignedTransaction) -> Result<TxReceipt> {
        signed.verify()?;
        let tx_hash = signed.tx.hash()?;
        let sender = signed.tx.sender_identity();

        let registry = Arc::clone(&self.registry);
        let cursor = self.cursor;
        let nonce = signed.tx.nonce;
        let call = signed.tx.call;
        let (outcome, events) = tokio::task::spawn_blocking(move || -> Result<_> {
            registry.store().consume_nonce(sender, nonce)?;
            let outcome = apply(&registry, sender, call);
            let events = registry.events_since(cursor);
            Ok((outcome, events))
        })
        .await
        .map_err(|e| LedgerError::Execution(e.to_string()))??;

        self.sequence += 1;
        let sequence = self.sequence;

        let events = events?;
        if let Some(last) = events.last() {
            self.cursor = last.index;
        }
        for record in &events {
            // No subscribers is not an error.
            let _ = self.events.send(record.clone());
        }

        let outcome = outcome?;
        debug!(%tx_hash, sequence, ?outcome, events = events.len(), "committed transaction");
        Ok(TxReceipt {
            tx_hash,
            sequence,
            outcome,
            events,
        })
    }

    async fn next_nonce(&self, sender: Identity) -> Result<u64> {
        let registry = Arc::clone(&self.registry);
        tokio::task::spawn_blocking(move || registry.store().next_nonce(&sender))
            .await
            .map_err(|e| LedgerError::Execution(e.to_string()))?
            .map_err(LedgerError::from)
    }

    async fn latest_event_index(&self) -> Result<u64> {
        let registry = Arc::clone(&self.registry);
        let events = tokio::task::spawn_blocking(move || registry.events_since(0))
            .await
            .map_err(|e| LedgerError::Execution(e.to_string()))??;
        Ok(events.last().map(|r| r.index).unwrap_or(0))
    }
}

fn apply<S: LedgerStore, P: EncryptionProvider>(
    registry: &Registry<S, P>,
    sender: Identity,
    call: Call,
) -> std::result::Result<TxOutcome, cidvault_access::RegistryError> {
    match call {
        Call::Register {
            handles,
            proof: Some(proof),
        } => registry
            .register_sealed(sender, &SealedTriple { handles, proof })
            .map(TxOutcome::Registered),
        Call::Register {
            handles,
            proof: None,
        } => registry.register(sender, handles).map(TxOutcome::Registered),
        Call::GrantAccess { id, reader } => registry
            .grant_access(sender, id, reader)
            .map(|()| TxOutcome::AccessGranted),
        Call::RevokeAccess { id, reader } => registry
            .revoke_access(sender, id, reader)
            .map(|()| TxOutcome::AccessRevoked),
    }
}
