//! Error types for CID Vault core.

use thiserror::Error;

/// Errors produced by the identifier codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The input does not carry the expected number of significant bytes.
    #[error("invalid length: expected {expected} significant bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// The input failed alphabet or length validation.
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

/// Errors from key handling and event encoding.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}
