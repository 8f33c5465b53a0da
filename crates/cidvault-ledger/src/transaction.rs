//! Signed registry transactions.
//!
//! A [`Transaction`] names its sender by Ed25519 public key, carries a
//! per-sender nonce, and wraps one registry [`Call`]. The sender signs the
//! canonical CBOR encoding; the transaction hash is Blake3 over the same
//! bytes.

use serde::{Deserialize, Serialize};

use cidvault_access::Proof;
use cidvault_core::{
    Blake3Hash, Ed25519PublicKey, Ed25519Signature, HandleTriple, Identity, Keypair, StorageId,
};

use crate::error::{LedgerError, Result};

const SIGNING_DOMAIN: &str = "cidvault-tx-v1";

/// A registry mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    /// Register handles owned by the sender. With a proof, the provider
    /// verifies it before the entry is created.
    Register {
        handles: HandleTriple,
        proof: Option<Proof>,
    },
    GrantAccess { id: StorageId, reader: Identity },
    RevokeAccess { id: StorageId, reader: Identity },
}

/// An unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Ed25519PublicKey,
    pub nonce: u64,
    pub call: Call,
}

#[derive(Serialize)]
struct SigningView<'a> {
    domain: &'static str,
    sender: &'a Ed25519PublicKey,
    nonce: u64,
    call: &'a Call,
}

impl Transaction {
    /// Canonical bytes covered by the signature.
    pub fn signing_bytes(&self) -> Result<Vec<u8>> {
        let view = SigningView {
            domain: SIGNING_DOMAIN,
            sender: &self.sender,
            nonce: self.nonce,
            call: &self.call,
        };
        let mut buf = Vec::new();
        ciborium::into_writer(&view, &mut buf).map_err(|e| LedgerError::Encoding(e.to_string()))?;
        Ok(buf)
    }

    /// Blake3 over the signing bytes.
    pub fn hash(&self) -> Result<Blake3Hash> {
        Ok(Blake3Hash::hash(&self.signing_bytes()?))
    }

    /// The sender's registry identity.
    pub fn sender_identity(&self) -> Identity {
        self.sender.identity()
    }

    /// Sign with `keypair`. The keypair must match `sender`.
    pub fn sign(self, keypair: &Keypair) -> Result<SignedTransaction> {
        let signature = keypair.sign(&self.signing_bytes()?);
        Ok(SignedTransaction {
            tx: self,
            signature,
        })
    }
}

/// A transaction with its sender's signature.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub tx: Transaction,
    pub signature: Ed25519Signature,
}

impl SignedTransaction {
    /// Build and sign a transaction from `keypair`.
    pub fn new(keypair: &Keypair, nonce: u64, call: Call) -> Result<Self> {
        Transaction {
            sender: keypair.public_key(),
            nonce,
            call,
        }
        .sign(keypair)
    }

    /// Check the signature against the declared sender.
    pub fn verify(&self) -> Result<()> {
        self.tx
            .sender
            .verify(&self.tx.signing_bytes()?, &self.signature)
            .map_err(|_| LedgerError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cidvault_core::Handle;

    fn grant() -> Call {
        Call::GrantAccess {
            id: StorageId(1),
            reader: Identity::from_bytes([0x22; 20]),
        }
    }

    #[test]
    fn test_sign_verify() {
        let keypair = Keypair::from_seed(&[1; 32]);
        let signed = SignedTransaction::new(&keypair, 0, grant()).unwrap();
        signed.verify().unwrap();
        assert_eq!(signed.tx.sender_identity(), keypair.identity());
    }

    #[test]
    fn test_tampered_nonce_fails() {
        let keypair = Keypair::from_seed(&[1; 32]);
        let mut signed = SignedTransaction::new(&keypair, 0, grant()).unwrap();
        signed.tx.nonce = 1;
        assert!(matches!(signed.verify(), Err(LedgerError::InvalidSignature)));
    }

    #[test]
    fn test_foreign_signature_fails() {
        let alice = Keypair::from_seed(&[1; 32]);
        let mallory = Keypair::from_seed(&[2; 32]);
        let signed = Transaction {
            sender: alice.public_key(),
            nonce: 0,
            call: grant(),
        }
        .sign(&mallory)
        .unwrap();
        assert!(matches!(signed.verify(), Err(LedgerError::InvalidSignature)));
    }

    #[test]
    fn test_hash_covers_call() {
        let keypair = Keypair::from_seed(&[1; 32]);
        let a = Transaction {
            sender: keypair.public_key(),
            nonce: 0,
            call: grant(),
        };
        let b = Transaction {
            call: Call::Register {
                handles: HandleTriple::new(
                    Handle::new(vec![1u8; 20]),
                    Handle::new(vec![2u8; 20]),
                    Handle::new(vec![3u8; 20]),
                ),
                proof: None,
            },
            ..a.clone()
        };
        assert_eq!(a.hash().unwrap(), a.hash().unwrap());
        assert_ne!(a.hash().unwrap(), b.hash().unwrap());
    }
}
