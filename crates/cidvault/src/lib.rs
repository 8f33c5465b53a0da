//! # CID Vault
//!
//! Register content identifiers as sealed, access-controlled slots, and
//! share them with other parties.
//!
//! ## Overview
//!
//! - **Codec**: a 46-byte identifier packs into three 20-byte slots and back
//! - **Registry**: dense storage ids, owner-controlled reader authorization
//! - **Provider**: seals slots into opaque handles and opens them for
//!   authorized readers
//! - **Ledger**: signed transactions applied in a single total order
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cidvault::{Vault, VaultConfig};
//! use cidvault::access::{PlaintextProvider, Registry, RegistryConfig};
//! use cidvault::core::{Identity, Keypair};
//! use cidvault::ledger::{LedgerConfig, LocalLedger};
//! use cidvault::store::SqliteStore;
//!
//! async fn example() {
//!     let registry = Arc::new(Registry::new(
//!         Identity::from_bytes([0xee; 20]),
//!         SqliteStore::open("registry.db").unwrap(),
//!         PlaintextProvider::new(),
//!         RegistryConfig::default(),
//!     ));
//!     let (ledger, _task) = LocalLedger::spawn(Arc::clone(&registry), LedgerConfig::default());
//!
//!     let alice = Vault::new(Keypair::generate(), Arc::clone(&registry), ledger.clone(), VaultConfig::default());
//!     let bob = Vault::new(Keypair::generate(), registry, ledger, VaultConfig::default());
//!
//!     let id = alice
//!         .store("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG")
//!         .await
//!         .unwrap();
//!     alice.share(id, bob.identity()).await.unwrap();
//!
//!     let cid = bob.retrieve(id).unwrap();
//!     println!("{}", cid);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `cidvault::core` - Codec and primitive types
//! - `cidvault::store` - Storage abstraction, SQLite and in-memory stores
//! - `cidvault::access` - Registry and encryption providers
//! - `cidvault::ledger` - Signed transactions and the local sequencer

pub mod error;
pub mod vault;

// Re-export component crates
pub use cidvault_access as access;
pub use cidvault_core as core;
pub use cidvault_ledger as ledger;
pub use cidvault_store as store;

// Re-export main types for convenience
pub use error::{Result, VaultError};
pub use vault::{Vault, VaultConfig};

// Re-export commonly used types
pub use cidvault_access::{DisclosurePolicy, EncryptionProvider, Registry, RegistryConfig, RegistryError};
pub use cidvault_core::{codec, CodecConfig, Identifier, Identity, Keypair, StorageId, Triple};
pub use cidvault_ledger::{LedgerConfig, LocalLedger, TransactionSubmitter, TxReceipt};
