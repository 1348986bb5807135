//! Ed25519 signing and verification for ledger transactions.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rc_02_ledger::SignatureVerifier;
use shared_types::{Hash, Identity, Transaction, TxPayload};

/// This node's signing key, bound to its identity name.
pub struct NodeKey {
    name: String,
    signing_key: SigningKey,
}

impl NodeKey {
    /// Fresh random key.
    pub fn generate(name: impl Into<String>) -> Self {
        Self::from_seed(name, rand::random::<[u8; 32]>())
    }

    pub fn from_seed(name: impl Into<String>, seed: [u8; 32]) -> Self {
        Self {
            name: name.into(),
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Identity registration for this key.
    pub fn identity(&self) -> Identity {
        Identity {
            name: self.name.clone(),
            public_key: self.public_key().to_vec(),
        }
    }

    pub fn sign_hash(&self, content_hash: &Hash) -> Vec<u8> {
        self.signing_key.sign(content_hash).to_bytes().to_vec()
    }

    /// Sign share transactions this node is the expected signer of. Other
    /// transactions are returned unchanged.
    pub fn sign_transaction(&self, tx: Transaction) -> Transaction {
        if tx.signature.is_some() {
            return tx;
        }
        let TxPayload::Share(share) = &tx.payload else {
            return tx;
        };
        if share.expected_signer() != self.name {
            return tx;
        }
        let bytes = self.sign_hash(&tx.payload.content_hash());
        let signer = self.name.clone();
        tx.with_signature(signer, bytes)
    }
}

impl std::fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeKey")
            .field("name", &self.name)
            .field("public_key", &hex::encode(self.public_key()))
            .finish()
    }
}

/// Verifies signatures against registered Ed25519 public keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, public_key: &[u8], content_hash: &Hash, signature: &[u8]) -> bool {
        let Ok(key_bytes) = <[u8; 32]>::try_from(public_key) else {
            return false;
        };
        let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify(content_hash, &signature).is_ok()
    }
}
