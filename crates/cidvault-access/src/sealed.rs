//! Symmetric sealed-box provider.
//!
//! Each slot is encrypted under a key derived from the provider's master
//! secret with ChaCha20-Poly1305, bound to the registry identity as
//! associated data. Proofs are keyed Blake3 MACs, so only the provider can
//! mint handles the registry will accept through `register_sealed`.
//!
//! ## Handle layout
//!
//! ```text
//! version (1) || nonce (12) || ciphertext + tag (20 + 16)
//! ```

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;

use cidvault_core::{Handle, HandleTriple, Identity, Slot, Triple, ADDRESS_LEN};

use crate::error::ProviderError;
use crate::provider::{
    bind_proof, EncryptionProvider, OpenRequest, PermissionTable, Result, SealContext,
    SealedTriple,
};

const HANDLE_VERSION: u8 = 1;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Encoded handle length.
pub const SEALED_HANDLE_LEN: usize = 1 + NONCE_LEN + ADDRESS_LEN + TAG_LEN;

const ENCRYPTION_CONTEXT: &str = "cidvault-sealed-v1 encryption";
const PROOF_CONTEXT: &str = "cidvault-sealed-v1 proof";

/// Provider holding a master secret.
///
/// Permissions are monotonic: revoking at the registry does not stop a
/// previously authorized identity from opening handles it already saw.
pub struct SealedBoxProvider {
    encryption_key: [u8; 32],
    proof_key: [u8; 32],
    permissions: PermissionTable,
}

impl SealedBoxProvider {
    /// Create from a 32-byte master secret.
    pub fn new(master: [u8; 32]) -> Self {
        Self {
            encryption_key: blake3::derive_key(ENCRYPTION_CONTEXT, &master),
            proof_key: blake3::derive_key(PROOF_CONTEXT, &master),
            permissions: PermissionTable::new(),
        }
    }

    /// Create with a random master secret.
    pub fn generate() -> Self {
        let mut master = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut master);
        Self::new(master)
    }

    fn cipher(&self) -> Result<ChaCha20Poly1305> {
        ChaCha20Poly1305::new_from_slice(&self.encryption_key)
            .map_err(|e| ProviderError::EncryptionError(e.to_string()))
    }

    fn seal_slot(&self, cipher: &ChaCha20Poly1305, slot: &Slot, registry: &Identity) -> Result<Handle> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &slot.0,
                    aad: registry.as_bytes(),
                },
            )
            .map_err(|e| ProviderError::EncryptionError(e.to_string()))?;

        let mut out = Vec::with_capacity(SEALED_HANDLE_LEN);
        out.push(HANDLE_VERSION);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(Handle::new(out))
    }

    fn open_slot(&self, cipher: &ChaCha20Poly1305, handle: &Handle, registry: &Identity) -> Result<Slot> {
        let bytes = handle.as_bytes();
        if bytes.len() != SEALED_HANDLE_LEN {
            return Err(ProviderError::MalformedHandle(format!(
                "expected {} bytes, got {}",
                SEALED_HANDLE_LEN,
                bytes.len()
            )));
        }
        if bytes[0] != HANDLE_VERSION {
            return Err(ProviderError::MalformedHandle(format!(
                "unknown handle version {}",
                bytes[0]
            )));
        }

        let (nonce, ciphertext) = bytes[1..].split_at(NONCE_LEN);
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: registry.as_bytes(),
                },
            )
            .map_err(|e| ProviderError::DecryptionError(e.to_string()))?;

        let slot: [u8; ADDRESS_LEN] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| ProviderError::DecryptionError("bad plaintext length".into()))?;
        Ok(Slot(slot))
    }
}

impl std::fmt::Debug for SealedBoxProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedBoxProvider").finish_non_exhaustive()
    }
}

impl EncryptionProvider for SealedBoxProvider {
    fn seal(&self, triple: &Triple, context: &SealContext) -> Result<SealedTriple> {
        let cipher = self.cipher()?;
        let [v1, v2, v3] = triple.slots();
        let handles = HandleTriple::new(
            self.seal_slot(&cipher, v1, &context.registry)?,
            self.seal_slot(&cipher, v2, &context.registry)?,
            self.seal_slot(&cipher, v3, &context.registry)?,
        );
        let proof = bind_proof(blake3::Hasher::new_keyed(&self.proof_key), context, &handles);
        Ok(SealedTriple { handles, proof })
    }

    fn verify(&self, sealed: &SealedTriple, context: &SealContext) -> Result<()> {
        let expected = bind_proof(
            blake3::Hasher::new_keyed(&self.proof_key),
            context,
            &sealed.handles,
        );
        // blake3::Hash compares in constant time
        if blake3::Hash::from(expected.0) != blake3::Hash::from(sealed.proof.0) {
            return Err(ProviderError::InvalidProof);
        }
        Ok(())
    }

    fn authorize(&self, handle: &Handle, context: &Identity, grantee: &Identity) -> Result<()> {
        self.permissions.allow(context, handle, grantee)
    }

    fn open(&self, handles: &HandleTriple, request: &OpenRequest) -> Result<Triple> {
        let requester = request.verify(handles)?;
        self.permissions
            .require_all(&request.registry, handles, &requester)?;

        let cipher = self.cipher()?;
        let [h1, h2, h3] = handles.as_array();
        Ok(Triple::new(
            self.open_slot(&cipher, h1, &request.registry)?,
            self.open_slot(&cipher, h2, &request.registry)?,
            self.open_slot(&cipher, h3, &request.registry)?,
        ))
    }
}
