//! Proptest generators for property-based testing.

use proptest::prelude::*;

use cidvault_core::{Handle, HandleTriple, Identity, Keypair, StorageId};

/// The base58 (Bitcoin) alphabet.
pub const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a non-null identity.
pub fn identity() -> impl Strategy<Value = Identity> {
    any::<[u8; 20]>()
        .prop_filter("null identity", |b| b.iter().any(|x| *x != 0))
        .prop_map(Identity::from_bytes)
}

/// Generate arbitrary 46-byte identifier input that does not start with the
/// `0x` marker (which the codec would strip).
pub fn identifier_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 46).prop_filter("leading marker", |b| !b.starts_with(b"0x"))
}

/// Generate a well-formed 46-character base58 identifier.
pub fn base58_identifier() -> impl Strategy<Value = String> {
    "[1-9A-HJ-NP-Za-km-z]{46}".prop_map(String::from)
}

/// Generate input shorter than an identifier.
pub fn short_input() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..46)
}

/// Generate a storage id in a small range, so some ids exist and some do not.
pub fn storage_id(max: u64) -> impl Strategy<Value = StorageId> {
    (0..=max).prop_map(StorageId)
}

/// Generate a handle triple with handles of up to `max_len` bytes.
pub fn handle_triple(max_len: usize) -> impl Strategy<Value = HandleTriple> {
    let handle = || prop::collection::vec(any::<u8>(), 1..=max_len).prop_map(Handle::new);
    (handle(), handle(), handle()).prop_map(|(a, b, c)| HandleTriple::new(a, b, c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cidvault_core::codec;

    proptest! {
        #[test]
        fn base58_identifiers_are_well_formed(s in base58_identifier()) {
            prop_assert!(codec::is_well_formed(&s));
            prop_assert!(s.chars().all(|c| BASE58_ALPHABET.contains(c)));
        }

        #[test]
        fn identities_are_not_null(id in identity()) {
            prop_assert!(!id.is_zero());
        }
    }
}
