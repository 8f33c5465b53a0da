//! Strong type definitions for CID Vault.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of an address-shaped value in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Identifier of a registry entry.
///
/// Assigned by the registry, dense and strictly increasing from 1.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageId(pub u64);

impl StorageId {
    /// The first id ever assigned.
    pub const FIRST: Self = Self(1);

    /// Create from a raw counter value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw counter value.
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// The id following this one.
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageId({})", self.0)
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StorageId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A 20-byte, address-shaped party identity.
///
/// [`Identity::ZERO`] is the null identity and is never a valid grantee.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity(pub [u8; ADDRESS_LEN]);

impl Identity {
    /// The null identity.
    pub const ZERO: Self = Self([0u8; ADDRESS_LEN]);

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Whether this is the null identity.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }

    /// Convert to a `0x`-prefixed hex string.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        parse_address_hex(s).map(Self)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", &self.to_hex()[..10])
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Identity {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; ADDRESS_LEN]> for Identity {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

/// One fixed-width value of a [`Triple`](crate::Triple), stored big-endian.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot(pub [u8; ADDRESS_LEN]);

impl Slot {
    /// The all-zero slot.
    pub const ZERO: Self = Self([0u8; ADDRESS_LEN]);

    /// Create from raw big-endian bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw big-endian bytes.
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Convert to a `0x`-prefixed hex string (address form).
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        parse_address_hex(s).map(Self)
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({})", self.to_hex())
    }
}

impl From<[u8; ADDRESS_LEN]> for Slot {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

/// An opaque ciphertext handle produced by an encryption provider.
///
/// Meaningless without the provider's open operation and a matching
/// permission.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle(pub Bytes);

impl Handle {
    /// Wrap raw handle bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the handle carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.0.len().min(8);
        write!(f, "Handle({}.., {} bytes)", hex::encode(&self.0[..shown]), self.0.len())
    }
}

impl AsRef<[u8]> for Handle {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The three handles of one registry entry, in slot order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleTriple(pub [Handle; 3]);

impl HandleTriple {
    /// Create from three handles in slot order.
    pub fn new(h1: Handle, h2: Handle, h3: Handle) -> Self {
        Self([h1, h2, h3])
    }

    /// Iterate over the handles in slot order.
    pub fn iter(&self) -> std::slice::Iter<'_, Handle> {
        self.0.iter()
    }

    /// Borrow the handles as an array.
    pub fn as_array(&self) -> &[Handle; 3] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a HandleTriple {
    type Item = &'a Handle;
    type IntoIter = std::slice::Iter<'a, Handle>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn parse_address_hex(s: &str) -> Result<[u8; ADDRESS_LEN], hex::FromHexError> {
    let body = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let bytes = hex::decode(body)?;
    if bytes.len() != ADDRESS_LEN {
        return Err(hex::FromHexError::InvalidStringLength);
    }
    let mut arr = [0u8; ADDRESS_LEN];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_hex_roundtrip() {
        let id = Identity::from_bytes([0x42; ADDRESS_LEN]);
        let hex = id.to_hex();
        assert!(hex.starts_with("0x"));
        assert_eq!(Identity::from_hex(&hex).unwrap(), id);
        assert_eq!(Identity::from_hex(&hex[2..]).unwrap(), id);
    }

    #[test]
    fn test_identity_zero() {
        assert!(Identity::ZERO.is_zero());
        assert!(!Identity::from_bytes([1; ADDRESS_LEN]).is_zero());
    }

    #[test]
    fn test_slot_rejects_wrong_width() {
        assert!(Slot::from_hex("0x1234").is_err());
    }

    #[test]
    fn test_storage_id_ordering() {
        assert_eq!(StorageId::FIRST.next(), StorageId::new(2));
        assert!(StorageId::new(3) > StorageId::new(2));
        assert_eq!(format!("{}", StorageId::new(7)), "7");
    }

    #[test]
    fn test_handle_debug_is_short() {
        let handle = Handle::new(vec![0xab; 48]);
        let debug = format!("{:?}", handle);
        assert!(debug.contains("48 bytes"));
        assert!(debug.starts_with("Handle(abababab"));
    }
}
