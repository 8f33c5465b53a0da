//! # CID Vault Ledger
//!
//! Signed transactions and ordered commit for a [`Registry`](cidvault_access::Registry).
//!
//! ## Overview
//!
//! Every mutation of the registry travels as a [`SignedTransaction`]: the
//! sender's Ed25519 key authenticates the call and a per-sender nonce
//! prevents replay. [`LocalLedger`] is a single-writer sequencer that
//! executes transactions one at a time, returns a [`TxReceipt`] and
//! publishes committed events to subscribers.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cidvault_access::{PlaintextProvider, Registry, RegistryConfig};
//! use cidvault_core::{Handle, HandleTriple, Identity, Keypair};
//! use cidvault_ledger::{Call, LedgerConfig, LocalLedger, TransactionSubmitter};
//! use cidvault_store::MemoryStore;
//!
//! # async fn example() -> Result<(), cidvault_ledger::LedgerError> {
//! let registry = Arc::new(Registry::new(
//!     Identity::from_bytes([0xee; 20]),
//!     MemoryStore::new(),
//!     PlaintextProvider::new(),
//!     RegistryConfig::default(),
//! ));
//! let (ledger, _task) = LocalLedger::spawn(registry, LedgerConfig::default());
//!
//! let alice = Keypair::generate();
//! let handles = HandleTriple::new(
//!     Handle::new(vec![1u8; 20]),
//!     Handle::new(vec![2u8; 20]),
//!     Handle::new(vec![3u8; 20]),
//! );
//! let receipt = ledger
//!     .submit_call(&alice, Call::Register { handles, proof: None })
//!     .await?;
//! println!("registered {:?}", receipt.storage_id());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod sequencer;
pub mod submitter;
pub mod transaction;

pub use error::{LedgerError, Result};
pub use sequencer::{LedgerConfig, LocalLedger};
pub use submitter::{TransactionSubmitter, TxOutcome, TxReceipt};
pub use transaction::{Call, SignedTransaction, Transaction};
