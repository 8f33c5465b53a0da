//! Registry events.
//!
//! Events are the only asynchronous record of registrations, grants and
//! revocations. They are append-only and indexed by entry id and by the
//! identities they involve.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{Identity, StorageId};

/// An event emitted by a committed registry mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
    /// A new entry was registered.
    Stored { id: StorageId, owner: Identity },

    /// `actor` (the owner) added `reader` to the entry's authorization set.
    AccessGranted {
        id: StorageId,
        reader: Identity,
        actor: Identity,
    },

    /// `actor` (the owner) removed `reader` from the entry's authorization set.
    AccessRevoked {
        id: StorageId,
        reader: Identity,
        actor: Identity,
    },
}

/// Discriminator for [`RegistryEvent`], stable across storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventKind {
    Stored = 1,
    AccessGranted = 2,
    AccessRevoked = 3,
}

impl EventKind {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Stored),
            2 => Some(Self::AccessGranted),
            3 => Some(Self::AccessRevoked),
            _ => None,
        }
    }
}

impl RegistryEvent {
    /// The entry this event concerns.
    pub fn storage_id(&self) -> StorageId {
        match self {
            Self::Stored { id, .. }
            | Self::AccessGranted { id, .. }
            | Self::AccessRevoked { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Stored { .. } => EventKind::Stored,
            Self::AccessGranted { .. } => EventKind::AccessGranted,
            Self::AccessRevoked { .. } => EventKind::AccessRevoked,
        }
    }

    /// Whether `who` appears in this event as owner, reader or actor.
    pub fn involves(&self, who: &Identity) -> bool {
        match self {
            Self::Stored { owner, .. } => owner == who,
            Self::AccessGranted { reader, actor, .. } | Self::AccessRevoked { reader, actor, .. } => {
                reader == who || actor == who
            }
        }
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
    }
}

/// A committed event together with its position in the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the log, starting at 1.
    pub index: u64,
    pub event: RegistryEvent,
    /// Commit time (Unix ms).
    pub recorded_at: i64,
}
