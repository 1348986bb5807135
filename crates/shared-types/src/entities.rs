//! # Core Domain Entities
//!
//! Chain entities replicated between nodes: blocks, the transaction sum type
//! and its variants, and the content hashes that identify them.
//!
//! ## Clusters
//!
//! - **Chain**: `Block`, `Transaction`, `TxPayload`
//! - **Ledger payloads**: `FileClaim`, `Identity`, `ShareTx`, `VoteStatement`, `VoteAnswer`
//!
//! Every hash in this module is wire-stable: two nodes built from different
//! revisions must agree on it, so field order and length prefixes are fixed.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// =============================================================================
// CLUSTER A: THE CHAIN
// =============================================================================

/// A 32-byte SHA-256 hash.
pub type Hash = [u8; 32];

/// The all-zero hash referenced by a genesis block.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Render a hash as lowercase hex.
pub fn hash_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

/// A mined block.
///
/// The block hash is its sole identity; there is no height field, the height
/// is implied by walking `prev_hash` links back to genesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Hash of the parent block. All zeros for genesis.
    pub prev_hash: Hash,
    /// Proof-of-work nonce.
    pub nonce: [u8; 32],
    /// Ordered transactions. Order matters for in-block balance replay.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Create a block with the given parent, nonce and transactions.
    pub fn new(prev_hash: Hash, nonce: [u8; 32], transactions: Vec<Transaction>) -> Self {
        Self {
            prev_hash,
            nonce,
            transactions,
        }
    }

    /// `sha256(prev_hash ‖ nonce ‖ u32_le(tx_count) ‖ tx_hash…)`
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.prev_hash);
        hasher.update(self.nonce);
        hasher.update((self.transactions.len() as u32).to_le_bytes());
        for tx in &self.transactions {
            hasher.update(tx.hash());
        }
        hasher.finalize().into()
    }

    /// True when this block claims to start a chain.
    pub fn is_genesis(&self) -> bool {
        self.prev_hash == ZERO_HASH
    }
}

/// Signature attached to a transaction.
///
/// The cryptography itself is an external concern; this is only the
/// claimed signer plus opaque signature bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxSignature {
    /// Identity name claiming authorship.
    pub signer: String,
    /// Raw signature bytes over the payload's content hash.
    pub bytes: Vec<u8>,
}

/// A ledger transaction: exactly one payload plus an optional signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// The populated variant.
    pub payload: TxPayload,
    /// Optional signature over `payload.content_hash()`.
    pub signature: Option<TxSignature>,
}

impl Transaction {
    /// Unsigned transaction.
    pub fn new(payload: TxPayload) -> Self {
        Self {
            payload,
            signature: None,
        }
    }

    /// Builder: attach a signature.
    pub fn with_signature(mut self, signer: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.signature = Some(TxSignature {
            signer: signer.into(),
            bytes,
        });
        self
    }

    /// `sha256(content_hash ‖ signer ‖ signature_bytes)`
    ///
    /// Used for pool de-duplication and as the leaf of the block hash.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.payload.content_hash());
        if let Some(sig) = &self.signature {
            hasher.update(sig.signer.as_bytes());
            hasher.update(&sig.bytes);
        }
        hasher.finalize().into()
    }

    /// Short label of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }
}

/// The five transaction variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxPayload {
    /// Claim of a filename.
    File(FileClaim),
    /// Registration of an identity name.
    Identity(Identity),
    /// Asset mint or transfer.
    Share(ShareTx),
    /// Opening of a vote among holders of an asset.
    VoteStatement(VoteStatement),
    /// Answer to an open vote.
    VoteAnswer(VoteAnswer),
}

impl TxPayload {
    /// Hash of the variant's content, excluding any signature.
    pub fn content_hash(&self) -> Hash {
        match self {
            TxPayload::File(f) => f.hash(),
            TxPayload::Identity(i) => i.hash(),
            TxPayload::Share(s) => s.hash(),
            TxPayload::VoteStatement(v) => v.hash(),
            TxPayload::VoteAnswer(a) => a.hash(),
        }
    }

    /// Short label of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            TxPayload::File(_) => "file",
            TxPayload::Identity(_) => "identity",
            TxPayload::Share(_) => "share",
            TxPayload::VoteStatement(_) => "vote-statement",
            TxPayload::VoteAnswer(_) => "vote-answer",
        }
    }
}

// =============================================================================
// CLUSTER B: LEDGER PAYLOADS
// =============================================================================

/// Claim of a filename bound to the hash of its metafile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileClaim {
    pub name: String,
    pub size: u64,
    pub metafile_hash: Vec<u8>,
}

impl FileClaim {
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update((self.name.len() as u32).to_le_bytes());
        hasher.update(self.name.as_bytes());
        hasher.update(&self.metafile_hash);
        hasher.finalize().into()
    }
}

/// Registration of a name with its public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub public_key: Vec<u8>,
}

impl Identity {
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update((self.name.len() as u32).to_le_bytes());
        hasher.update(self.name.as_bytes());
        hasher.update(&self.public_key);
        hasher.finalize().into()
    }
}

/// Asset transfer between two identities.
///
/// An empty `from` is a mint: the full `amount` is credited to `to` and the
/// asset comes into existence. Assets are never minted twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareTx {
    pub asset: String,
    pub amount: u64,
    pub from: String,
    pub to: String,
}

impl ShareTx {
    /// Mint `amount` units of a new asset to `to`.
    pub fn mint(asset: impl Into<String>, amount: u64, to: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            amount,
            from: String::new(),
            to: to.into(),
        }
    }

    /// Transfer `amount` units of `asset` from one holder to another.
    pub fn transfer(
        asset: impl Into<String>,
        amount: u64,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            asset: asset.into(),
            amount,
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn is_mint(&self) -> bool {
        self.from.is_empty()
    }

    /// The identity whose signature authorizes this transaction.
    pub fn expected_signer(&self) -> &str {
        if self.is_mint() {
            &self.to
        } else {
            &self.from
        }
    }

    /// `sha256(amount_le ‖ asset ‖ from ‖ to)`
    ///
    /// Fields are concatenated without length prefixes to stay hash-compatible
    /// with existing peers, so field boundaries are ambiguous.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.amount.to_le_bytes());
        hasher.update(self.asset.as_bytes());
        hasher.update(self.from.as_bytes());
        hasher.update(self.to.as_bytes());
        hasher.finalize().into()
    }
}

/// A question put to the holders of an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteStatement {
    pub question: String,
    pub origin: String,
    pub asset: String,
}

impl VoteStatement {
    /// `sha256(question ‖ origin ‖ asset)`
    ///
    /// Unprefixed concatenation kept for wire compatibility: ("ab", "c") and
    /// ("a", "bc") splits of question and origin yield the same id.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.question.as_bytes());
        hasher.update(self.origin.as_bytes());
        hasher.update(self.asset.as_bytes());
        hasher.finalize().into()
    }

    /// Hex of the statement hash; answers reference the vote by this id.
    pub fn question_id(&self) -> String {
        hash_hex(&self.hash())
    }
}

/// One holder's answer to a vote. The answer bytes are opaque (possibly
/// encrypted for the vote origin).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteAnswer {
    pub question_id: String,
    pub replier: String,
    pub answer: Vec<u8>,
}

impl VoteAnswer {
    /// `sha256(question_id ‖ replier ‖ answer)`, unprefixed for wire
    /// compatibility.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.question_id.as_bytes());
        hasher.update(self.replier.as_bytes());
        hasher.update(&self.answer);
        hasher.finalize().into()
    }
}
