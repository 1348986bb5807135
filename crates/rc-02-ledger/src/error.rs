//! Error types for the ledger subsystem.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Ledger errors.
///
/// Validation failures cause the offending transaction or block to be
/// dropped with a diagnostic; they never stop the node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Filename already claimed: {0}")]
    FilenameClaimed(String),

    #[error("Identity already claimed: {0}")]
    IdentityClaimed(String),

    #[error("Unknown identity: {0}")]
    UnknownIdentity(String),

    #[error("Signer mismatch: expected {expected}, got {actual}")]
    SignerMismatch { expected: String, actual: String },

    #[error("Missing signature on {0} transaction")]
    MissingSignature(&'static str),

    #[error("Invalid signature from {0}")]
    InvalidSignature(String),

    #[error("Asset already exists: {0}")]
    AssetExists(String),

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("Insufficient balance of {asset} for {holder}: has {available}, needs {required}")]
    InsufficientBalance {
        asset: String,
        holder: String,
        available: u64,
        required: u64,
    },

    #[error("Question already exists: {0}")]
    QuestionExists(String),

    #[error("Unknown question: {0}")]
    UnknownQuestion(String),

    #[error("{holder} holds no shares of {asset}")]
    NoShares { holder: String, asset: String },

    #[error("{replier} already answered question {question_id}")]
    AlreadyAnswered {
        question_id: String,
        replier: String,
    },

    #[error("Identity registered twice in one block: {0}")]
    DuplicateIdentityInBlock(String),

    #[error("Filename claimed twice in one block: {0}")]
    DuplicateFilenameInBlock(String),

    #[error("Parent block unknown: {0}")]
    UnknownParent(String),

    #[error("Proof of work does not meet difficulty {0}")]
    InvalidProofOfWork(u32),

    #[error("Transaction already pooled: {0}")]
    DuplicateTransaction(String),

    #[error("Transaction already on the longest chain: {0}")]
    AlreadyIncluded(String),
}

impl LedgerError {
    /// True when a longer chain can only keep the transaction invalid (a
    /// claimed name stays claimed). The miner evicts these from the pool and
    /// defers the rest, which may pass once other transactions are mined.
    pub fn is_validation_failure(&self) -> bool {
        !matches!(
            self,
            LedgerError::InsufficientBalance { .. }
                | LedgerError::UnknownAsset(_)
                | LedgerError::NoShares { .. }
                | LedgerError::DuplicateIdentityInBlock(_)
                | LedgerError::DuplicateFilenameInBlock(_)
                | LedgerError::InvalidProofOfWork(_)
                | LedgerError::UnknownParent(_)
                | LedgerError::DuplicateTransaction(_)
        )
    }
}
