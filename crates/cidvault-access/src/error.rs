//! Error types for the access module.

use thiserror::Error;

use cidvault_core::{Identity, StorageId};
use cidvault_store::StoreError;

/// Errors raised by an encryption provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The proof does not bind these handles to this context.
    #[error("invalid proof of well-formedness")]
    InvalidProof,

    /// The requester holds no permission on at least one handle.
    #[error("permission denied for {0}")]
    PermissionDenied(Identity),

    /// The open request signature does not verify.
    #[error("invalid requester signature")]
    InvalidSignature,

    /// A handle is not in the provider's format.
    #[error("malformed handle: {0}")]
    MalformedHandle(String),

    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Decryption error.
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// A lock guarding the permission table was poisoned.
    #[error("permission table poisoned: {0}")]
    Poisoned(String),
}

/// Errors returned by registry operations.
///
/// `NotFound`, `Forbidden` and `InvalidReader` are caller-recoverable and
/// leave the registry untouched.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The entry id was never issued.
    #[error("entry not found: {0}")]
    NotFound(StorageId),

    /// The actor is neither the owner nor, where applicable, an authorized reader.
    #[error("forbidden: {actor} may not access entry {id}")]
    Forbidden { id: StorageId, actor: Identity },

    /// The grantee cannot be granted or revoked.
    #[error("invalid reader {reader}: {reason}")]
    InvalidReader {
        reader: Identity,
        reason: &'static str,
    },

    /// Encryption provider error.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
