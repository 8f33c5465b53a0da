//! Identifier codec.
//!
//! Maps a 46-byte content identifier to three address-shaped slots and back.
//!
//! ## Packing
//!
//! The identifier is cut into three windows: bytes `[0, 20)`, `[20, 40)` and
//! `[40, 46)`. Within a window, byte `i` lands at bit position `i * 8`
//! counting from the least significant end of the slot. Slots are stored
//! big-endian, so byte 0 of a window is the last byte of the slot and the
//! 6-byte tail window is left-padded with zeros.
//!
//! Encoding is pure: two parties holding the same identifier always derive
//! the same [`Triple`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::types::{Slot, ADDRESS_LEN};

/// Number of significant identifier bytes.
pub const IDENTIFIER_LEN: usize = 46;

/// Width of the final window.
pub const TAIL_LEN: usize = IDENTIFIER_LEN - 2 * ADDRESS_LEN;

/// Optional human-readable marker in front of an identifier.
pub const PREFIX: &str = "0x";

/// Length of a marker-prefixed identifier.
pub const PREFIXED_LEN: usize = IDENTIFIER_LEN + PREFIX.len();

/// Codec options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Reject inputs carrying more than 46 significant bytes instead of
    /// truncating them.
    pub strict_length: bool,
}

impl CodecConfig {
    /// Exact-length validation.
    pub fn strict() -> Self {
        Self {
            strict_length: true,
        }
    }
}

/// A 46-byte content identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identifier([u8; IDENTIFIER_LEN]);

impl Identifier {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; IDENTIFIER_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; IDENTIFIER_LEN] {
        &self.0
    }

    /// Parse with the default (lenient) codec options.
    pub fn parse(input: &[u8]) -> Result<Self, CodecError> {
        Self::parse_with(input, &CodecConfig::default())
    }

    /// Parse raw input, stripping the optional marker.
    ///
    /// A leading marker is always removed; `'0'` is outside the base58
    /// alphabet, so no well-formed identifier starts with one. What remains
    /// must be at least 46 bytes. Longer inputs are truncated unless
    /// `config.strict_length` is set.
    pub fn parse_with(input: &[u8], config: &CodecConfig) -> Result<Self, CodecError> {
        let body = input.strip_prefix(PREFIX.as_bytes()).unwrap_or(input);

        if body.len() < IDENTIFIER_LEN {
            return Err(CodecError::InvalidLength {
                expected: IDENTIFIER_LEN,
                actual: body.len(),
            });
        }

        if body.len() > IDENTIFIER_LEN {
            if config.strict_length {
                return Err(CodecError::InvalidLength {
                    expected: IDENTIFIER_LEN,
                    actual: body.len(),
                });
            }
            tracing::debug!(
                len = body.len(),
                "identifier longer than {} bytes, ignoring trailing bytes",
                IDENTIFIER_LEN
            );
        }

        let mut bytes = [0u8; IDENTIFIER_LEN];
        bytes.copy_from_slice(&body[..IDENTIFIER_LEN]);
        Ok(Self(bytes))
    }

    /// The identifier as text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Decode a well-formed base58 identifier into its raw multihash bytes.
    pub fn multihash(&self) -> Result<Vec<u8>, CodecError> {
        bs58::decode(&self.0[..])
            .into_vec()
            .map_err(|e| CodecError::InvalidFormat(e.to_string()))
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl FromStr for Identifier {
    type Err = CodecError;

    /// Parse textual input, requiring it to be well formed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate(s)?;
        Self::parse_with(s.as_bytes(), &CodecConfig::strict())
    }
}

impl From<[u8; IDENTIFIER_LEN]> for Identifier {
    fn from(bytes: [u8; IDENTIFIER_LEN]) -> Self {
        Self(bytes)
    }
}

/// The three slots derived from an [`Identifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple(pub [Slot; 3]);

impl Triple {
    /// Create from three slots.
    pub const fn new(v1: Slot, v2: Slot, v3: Slot) -> Self {
        Self([v1, v2, v3])
    }

    /// Pack an identifier into three slots.
    pub fn from_identifier(identifier: &Identifier) -> Self {
        let bytes = identifier.as_bytes();
        Self([
            pack(&bytes[..ADDRESS_LEN]),
            pack(&bytes[ADDRESS_LEN..2 * ADDRESS_LEN]),
            pack(&bytes[2 * ADDRESS_LEN..]),
        ])
    }

    /// Unpack the slots back into the identifier.
    ///
    /// Only the low six bytes of `v3` are significant.
    pub fn to_identifier(&self) -> Identifier {
        let mut bytes = [0u8; IDENTIFIER_LEN];
        unpack(&self.0[0], &mut bytes[..ADDRESS_LEN]);
        unpack(&self.0[1], &mut bytes[ADDRESS_LEN..2 * ADDRESS_LEN]);
        unpack(&self.0[2], &mut bytes[2 * ADDRESS_LEN..]);
        Identifier(bytes)
    }

    /// The slots in order.
    pub fn slots(&self) -> &[Slot; 3] {
        &self.0
    }

    pub fn v1(&self) -> &Slot {
        &self.0[0]
    }

    pub fn v2(&self) -> &Slot {
        &self.0[1]
    }

    pub fn v3(&self) -> &Slot {
        &self.0[2]
    }
}

fn pack(window: &[u8]) -> Slot {
    let mut out = [0u8; ADDRESS_LEN];
    for (i, byte) in window.iter().enumerate() {
        out[ADDRESS_LEN - 1 - i] = *byte;
    }
    Slot(out)
}

fn unpack(slot: &Slot, window: &mut [u8]) {
    for (i, byte) in window.iter_mut().enumerate() {
        *byte = slot.0[ADDRESS_LEN - 1 - i];
    }
}

/// Encode raw input with the default (lenient) options.
pub fn encode(input: &[u8]) -> Result<Triple, CodecError> {
    encode_with(input, &CodecConfig::default())
}

/// Encode raw input with explicit codec options.
pub fn encode_with(input: &[u8], config: &CodecConfig) -> Result<Triple, CodecError> {
    let identifier = Identifier::parse_with(input, config)?;
    Ok(Triple::from_identifier(&identifier))
}

/// Decode a triple back into its identifier.
///
/// Exact inverse of [`encode`] for every input that does not itself start
/// with the marker.
pub fn decode(triple: &Triple) -> Identifier {
    triple.to_identifier()
}

/// Prepend the marker unless it is already present.
pub fn add_optional_prefix(s: &str) -> String {
    if s.starts_with(PREFIX) {
        s.to_string()
    } else {
        format!("{}{}", PREFIX, s)
    }
}

/// Remove the marker if present.
pub fn strip_optional_prefix(s: &str) -> &str {
    s.strip_prefix(PREFIX).unwrap_or(s)
}

/// Check the textual form of an identifier.
///
/// Accepts exactly 46 base58 characters, or the marker followed by exactly
/// 46 base58 characters.
pub fn is_well_formed(candidate: &str) -> bool {
    validate(candidate).is_ok()
}

/// Like [`is_well_formed`], reporting why a candidate was rejected.
pub fn validate(candidate: &str) -> Result<(), CodecError> {
    let body = match candidate.len() {
        PREFIXED_LEN => candidate.strip_prefix(PREFIX).ok_or_else(|| {
            CodecError::InvalidFormat(format!("{}-character form must start with {:?}", PREFIXED_LEN, PREFIX))
        })?,
        IDENTIFIER_LEN => candidate,
        other => {
            return Err(CodecError::InvalidFormat(format!(
                "expected {} or {} characters, got {}",
                IDENTIFIER_LEN, PREFIXED_LEN, other
            )))
        }
    };

    bs58::decode(body)
        .into_vec()
        .map(|_| ())
        .map_err(|e| CodecError::InvalidFormat(e.to_string()))
}
