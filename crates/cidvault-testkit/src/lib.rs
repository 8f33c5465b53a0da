//! # CID Vault Testkit
//!
//! Testing utilities for CID Vault.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known codec inputs with their expected slots
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Parties, registries and sequencers for test scenarios
//!
//! ## Golden Vectors
//!
//! ```rust
//! use cidvault_testkit::vectors::all_vectors;
//!
//! for vector in all_vectors() {
//!     vector.check().unwrap();
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use cidvault_core::StorageId;
//! use cidvault_testkit::fixtures::{memory_registry, parties};
//!
//! let (alice, bob, _) = parties();
//! let registry = memory_registry();
//! assert!(registry.entries_owned_by(&alice.identity()).unwrap().is_empty());
//! assert!(!registry.has_access(StorageId(1), &bob.identity()).unwrap());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{memory_registry, parties, LedgerFixture, Party, REGISTRY_IDENTITY};
pub use vectors::EXAMPLE_CID;

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Honors `RUST_LOG`; defaults to `warn`. Safe to call from every test.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
