//! Encryption provider interface.
//!
//! The registry never sees plaintext. Callers seal a [`Triple`] into three
//! opaque handles plus a proof, the registry asks the provider to extend
//! decrypt permission on those handles, and authorized readers open them
//! outside the registry.
//!
//! ## Permission model
//!
//! Provider permissions are append-only: once an identity may open a handle
//! it keeps that ability. A registry-level revoke stops the registry from
//! serving the handles again but cannot withdraw what was already granted.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use cidvault_core::{
    Ed25519PublicKey, Ed25519Signature, Handle, HandleTriple, Identity, Keypair, Triple,
};

use crate::error::ProviderError;

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

const OPEN_DOMAIN: &[u8] = b"cidvault-open-v1";
const PROOF_DOMAIN: &[u8] = b"cidvault-proof-v1";

/// Scope a triple is sealed under: the registry that will hold the handles
/// and the party submitting them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealContext {
    pub registry: Identity,
    pub submitter: Identity,
}

/// Proof that a set of handles was produced for a given [`SealContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof(pub [u8; 32]);

/// Output of [`EncryptionProvider::seal`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedTriple {
    pub handles: HandleTriple,
    pub proof: Proof,
}

/// A signed request to open handles held by `registry`.
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub registry: Identity,
    pub requester: Ed25519PublicKey,
    pub signature: Ed25519Signature,
}

impl OpenRequest {
    /// The message a requester signs to open `handles`.
    pub fn challenge(registry: &Identity, handles: &HandleTriple) -> Vec<u8> {
        let mut msg = Vec::with_capacity(OPEN_DOMAIN.len() + 20 + 3 * 32);
        msg.extend_from_slice(OPEN_DOMAIN);
        msg.extend_from_slice(registry.as_bytes());
        for handle in handles {
            msg.extend_from_slice(blake3::hash(handle.as_bytes()).as_bytes());
        }
        msg
    }

    /// Build and sign a request.
    pub fn sign(keypair: &Keypair, registry: Identity, handles: &HandleTriple) -> Self {
        let signature = keypair.sign(&Self::challenge(&registry, handles));
        Self {
            registry,
            requester: keypair.public_key(),
            signature,
        }
    }

    /// Check the signature and return the requester's identity.
    pub fn verify(&self, handles: &HandleTriple) -> Result<Identity> {
        self.requester
            .verify(&Self::challenge(&self.registry, handles), &self.signature)
            .map_err(|_| ProviderError::InvalidSignature)?;
        Ok(self.requester.identity())
    }
}

/// The narrow capability interface the registry and its callers consume.
pub trait EncryptionProvider: Send + Sync {
    /// Turn a plaintext triple into opaque handles and a proof.
    fn seal(&self, triple: &Triple, context: &SealContext) -> Result<SealedTriple>;

    /// Check that `sealed.proof` binds its handles to `context`.
    fn verify(&self, sealed: &SealedTriple, context: &SealContext) -> Result<()>;

    /// Extend decrypt permission on `handle`, within `context`, to `grantee`.
    fn authorize(&self, handle: &Handle, context: &Identity, grantee: &Identity) -> Result<()>;

    /// Recover the triple for a requester permitted on all three handles.
    fn open(&self, handles: &HandleTriple, request: &OpenRequest) -> Result<Triple>;
}

/// Compute a proof over a context and handles with the given hasher.
pub(crate) fn bind_proof(
    mut hasher: blake3::Hasher,
    context: &SealContext,
    handles: &HandleTriple,
) -> Proof {
    hasher.update(PROOF_DOMAIN);
    hasher.update(context.registry.as_bytes());
    hasher.update(context.submitter.as_bytes());
    for handle in handles {
        hasher.update(&(handle.len() as u64).to_le_bytes());
        hasher.update(handle.as_bytes());
    }
    Proof(*hasher.finalize().as_bytes())
}

/// Append-only table of decrypt permissions, keyed by context and handle.
#[derive(Debug, Default)]
pub struct PermissionTable {
    inner: RwLock<HashMap<(Identity, Handle), BTreeSet<Identity>>>,
}

impl PermissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Permit `grantee` on `handle` within `context`.
    pub fn allow(&self, context: &Identity, handle: &Handle, grantee: &Identity) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| ProviderError::Poisoned(e.to_string()))?;
        inner
            .entry((*context, handle.clone()))
            .or_default()
            .insert(*grantee);
        Ok(())
    }

    pub fn is_allowed(&self, context: &Identity, handle: &Handle, who: &Identity) -> Result<bool> {
        let inner = self
            .inner
            .read()
            .map_err(|e| ProviderError::Poisoned(e.to_string()))?;
        Ok(inner
            .get(&(*context, handle.clone()))
            .map(|set| set.contains(who))
            .unwrap_or(false))
    }

    /// Everyone permitted on `handle` within `context`.
    pub fn grantees(&self, context: &Identity, handle: &Handle) -> Result<Vec<Identity>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| ProviderError::Poisoned(e.to_string()))?;
        Ok(inner
            .get(&(*context, handle.clone()))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    /// Fail unless `who` is permitted on every handle.
    pub fn require_all(&self, context: &Identity, handles: &HandleTriple, who: &Identity) -> Result<()> {
        for handle in handles {
            if !self.is_allowed(context, handle, who)? {
                return Err(ProviderError::PermissionDenied(*who));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handles() -> HandleTriple {
        HandleTriple::new(
            Handle::new(vec![1u8; 20]),
            Handle::new(vec![2u8; 20]),
            Handle::new(vec![3u8; 20]),
        )
    }

    #[test]
    fn test_open_request_verifies() {
        let keypair = Keypair::from_seed(&[7; 32]);
        let registry = Identity::from_bytes([0xee; 20]);
        let request = OpenRequest::sign(&keypair, registry, &handles());

        assert_eq!(request.verify(&handles()).unwrap(), keypair.identity());
    }

    #[test]
    fn test_open_request_bound_to_handles() {
        let keypair = Keypair::from_seed(&[7; 32]);
        let registry = Identity::from_bytes([0xee; 20]);
        let request = OpenRequest::sign(&keypair, registry, &handles());

        let other = HandleTriple::new(
            Handle::new(vec![9u8; 20]),
            Handle::new(vec![2u8; 20]),
            Handle::new(vec![3u8; 20]),
        );
        assert!(matches!(
            request.verify(&other),
            Err(ProviderError::InvalidSignature)
        ));
    }

    #[test]
    fn test_permission_table_scoped_by_context() {
        let table = PermissionTable::new();
        let ctx_a = Identity::from_bytes([0xa0; 20]);
        let ctx_b = Identity::from_bytes([0xb0; 20]);
        let who = Identity::from_bytes([0x11; 20]);
        let handle = Handle::new(vec![1u8; 20]);

        table.allow(&ctx_a, &handle, &who).unwrap();
        assert!(table.is_allowed(&ctx_a, &handle, &who).unwrap());
        assert!(!table.is_allowed(&ctx_b, &handle, &who).unwrap());
        assert_eq!(table.grantees(&ctx_a, &handle).unwrap(), vec![who]);
    }

    #[test]
    fn test_proof_depends_on_context() {
        let a = SealContext {
            registry: Identity::from_bytes([1; 20]),
            submitter: Identity::from_bytes([2; 20]),
        };
        let b = SealContext {
            submitter: Identity::from_bytes([3; 20]),
            ..a
        };
        assert_ne!(
            bind_proof(blake3::Hasher::new(), &a, &handles()),
            bind_proof(blake3::Hasher::new(), &b, &handles())
        );
    }
}
