//! Identity-mapping provider.
//!
//! Handles are the raw slot bytes and proofs are unkeyed hashes, so nothing
//! is confidential. The permission table is real: `open` still requires a
//! prior `authorize` for the requester on every handle.

use cidvault_core::{Handle, HandleTriple, Identity, Slot, Triple, ADDRESS_LEN};

use crate::error::ProviderError;
use crate::provider::{
    bind_proof, EncryptionProvider, OpenRequest, PermissionTable, Result, SealContext,
    SealedTriple,
};

/// Provider that performs no encryption. For tests and local tooling.
#[derive(Debug, Default)]
pub struct PlaintextProvider {
    permissions: PermissionTable,
}

impl PlaintextProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grantees recorded for `handle` within `context`.
    pub fn grantees(&self, context: &Identity, handle: &Handle) -> Result<Vec<Identity>> {
        self.permissions.grantees(context, handle)
    }

    fn to_slot(handle: &Handle) -> Result<Slot> {
        let bytes: [u8; ADDRESS_LEN] = handle.as_bytes().try_into().map_err(|_| {
            ProviderError::MalformedHandle(format!(
                "expected {} bytes, got {}",
                ADDRESS_LEN,
                handle.len()
            ))
        })?;
        Ok(Slot(bytes))
    }
}

impl EncryptionProvider for PlaintextProvider {
    fn seal(&self, triple: &Triple, context: &SealContext) -> Result<SealedTriple> {
        let [v1, v2, v3] = triple.slots();
        let handles = HandleTriple::new(
            Handle::new(v1.0.to_vec()),
            Handle::new(v2.0.to_vec()),
            Handle::new(v3.0.to_vec()),
        );
        let proof = bind_proof(blake3::Hasher::new(), context, &handles);
        Ok(SealedTriple { handles, proof })
    }

    fn verify(&self, sealed: &SealedTriple, context: &SealContext) -> Result<()> {
        if bind_proof(blake3::Hasher::new(), context, &sealed.handles) != sealed.proof {
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

        let [h1, h2, h3] = handles.as_array();
        Ok(Triple::new(
            Self::to_slot(h1)?,
            Self::to_slot(h2)?,
            Self::to_slot(h3)?,
        ))
    }
}
