//! # CID Vault Access
//!
//! The access-controlled registry and the encryption provider it drives.
//!
//! ## Overview
//!
//! An owner seals the [`Triple`](cidvault_core::Triple) derived from an
//! identifier into three opaque handles, registers them, and grants readers.
//! The registry only ever holds handles; reading requires both registry
//! authorization (to fetch the handles) and provider permission (to open
//! them).
//!
//! ## Key Types
//!
//! - [`Registry`] - Validates requests and commits them to a store
//! - [`EncryptionProvider`] - Seal, verify, authorize and open handles
//! - [`PlaintextProvider`] - Identity-mapping provider for tests
//! - [`SealedBoxProvider`] - ChaCha20-Poly1305 provider
//!
//! ## Example
//!
//! ```rust
//! use cidvault_access::{EncryptionProvider, PlaintextProvider, Registry, RegistryConfig};
//! use cidvault_core::{codec, Identity, Keypair};
//! use cidvault_store::MemoryStore;
//!
//! let registry = Registry::new(
//!     Identity::from_bytes([0xee; 20]),
//!     MemoryStore::new(),
//!     PlaintextProvider::new(),
//!     RegistryConfig::default(),
//! );
//!
//! let alice = Keypair::generate();
//! let bob = Keypair::generate();
//!
//! let triple = codec::encode(b"QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG").unwrap();
//! let sealed = registry
//!     .provider()
//!     .seal(&triple, &registry.seal_context(alice.identity()))
//!     .unwrap();
//! let id = registry.register_sealed(alice.identity(), &sealed).unwrap();
//!
//! registry.grant_access(alice.identity(), id, bob.identity()).unwrap();
//! assert!(registry.has_access(id, &bob.identity()).unwrap());
//! ```

pub mod error;
pub mod plaintext;
pub mod provider;
pub mod registry;
pub mod sealed;

pub use error::{ProviderError, RegistryError, Result};
pub use plaintext::PlaintextProvider;
pub use provider::{EncryptionProvider, OpenRequest, PermissionTable, Proof, SealContext, SealedTriple};
pub use registry::{DisclosurePolicy, Registry, RegistryConfig};
pub use sealed::SealedBoxProvider;
