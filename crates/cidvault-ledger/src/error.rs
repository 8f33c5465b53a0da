//! Error types for the ledger module.

use std::time::Duration;

use thiserror::Error;

use cidvault_access::RegistryError;
use cidvault_store::StoreError;

/// Errors returned when submitting transactions.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The transaction signature does not verify against its sender.
    #[error("invalid transaction signature")]
    InvalidSignature,

    /// The nonce is not the sender's next nonce.
    #[error("bad nonce: expected {expected}, got {actual}")]
    BadNonce { expected: u64, actual: u64 },

    /// The registry rejected the call. The nonce is still consumed.
    #[error("transaction rejected: {0}")]
    Rejected(#[from] RegistryError),

    /// Nonce bookkeeping failed in the store.
    #[error("store error: {0}")]
    Store(StoreError),

    /// Transaction encoding failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The sequencer has shut down.
    #[error("ledger closed")]
    Closed,

    /// No finality within the configured timeout.
    #[error("timed out after {0:?} waiting for finality")]
    Timeout(Duration),

    /// A blocking registry call panicked or was cancelled.
    #[error("execution failed: {0}")]
    Execution(String),
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NonceMismatch { expected, actual } => {
                LedgerError::BadNonce { expected, actual }
            }
            other => LedgerError::Store(other),
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
