//! # CID Vault Store
//!
//! Persistence for registry state. Provides the [`LedgerStore`] trait with
//! SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The registry is storage-agnostic: it validates requests and delegates
//! every state change to a [`LedgerStore`], which commits the change and its
//! event atomically.
//!
//! ## Key Types
//!
//! - [`LedgerStore`] - The trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage, one independent state per instance
//! - [`StoredEntry`] - A persisted registry entry
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cidvault_store::{LedgerStore, SqliteStore};
//!
//! let store = SqliteStore::open("registry.db").unwrap();
//! println!("{} entries", store.entry_count().unwrap());
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{LedgerStore, StoredEntry};
