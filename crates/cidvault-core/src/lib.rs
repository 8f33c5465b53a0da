//! # CID Vault Core
//!
//! Pure primitives for CID Vault: the identifier codec, identities, opaque
//! handles, and registry events.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Identifier`] - A 46-byte content identifier
//! - [`Triple`] - The three address-shaped [`Slot`]s derived from an identifier
//! - [`StorageId`] - Registry-assigned entry id
//! - [`Identity`] - A 20-byte party identity, derived from an Ed25519 key
//! - [`Handle`] - An opaque ciphertext handle
//! - [`RegistryEvent`] - Record of a committed registry mutation
//!
//! ## Codec
//!
//! ```rust
//! use cidvault_core::codec::{decode, encode};
//!
//! let cid = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
//! let triple = encode(cid.as_bytes()).unwrap();
//! assert_eq!(decode(&triple).as_str(), Some(cid));
//! ```

pub mod codec;
pub mod crypto;
pub mod error;
pub mod event;
pub mod types;

pub use codec::{CodecConfig, Identifier, Triple};
pub use crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair};
pub use error::{CodecError, CoreError};
pub use event::{EventKind, EventRecord, RegistryEvent};
pub use types::{Handle, HandleTriple, Identity, Slot, StorageId, ADDRESS_LEN};
