//! Error types for the Vault.

use thiserror::Error;

use cidvault_access::{ProviderError, RegistryError};
use cidvault_core::CodecError;
use cidvault_ledger::{LedgerError, TxOutcome};

/// Errors that can occur during Vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The identifier could not be validated or encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Registry error.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Encryption provider error.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Ledger error.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The ledger reported an outcome that does not match the call.
    #[error("unexpected outcome: {0:?}")]
    UnexpectedOutcome(TxOutcome),
}

impl VaultError {
    /// The registry error behind this failure, whether it was raised
    /// directly or came back from the ledger.
    pub fn registry_error(&self) -> Option<&RegistryError> {
        match self {
            VaultError::Registry(e) => Some(e),
            VaultError::Ledger(LedgerError::Rejected(e)) => Some(e),
            _ => None,
        }
    }
}

/// Result type for Vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
