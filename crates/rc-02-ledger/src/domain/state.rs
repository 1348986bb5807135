//! # Materialized Ledger State
//!
//! Filenames, identities, asset balances and votes as of the tip of the
//! longest chain, plus the hashes of every transaction on that chain.
//!
//! ## Validation Layers
//!
//! 1. `validate_transaction`: rules a single transaction must meet against
//!    the current state (used for pool admission and for every block tx).
//! 2. `validate_block`: aggregate rules over a whole block, checked on a
//!    scratch copy of the balances so nothing leaks into live state.
//!
//! `apply_block` never fails: it is only called with validated blocks or
//! while replaying a chain that was validated when first received.

use serde::Serialize;
use shared_types::{
    hash_hex, Block, FileClaim, Hash, Identity, ShareTx, Transaction, TxPayload, VoteAnswer,
    VoteStatement,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::warn;

use crate::error::{LedgerError, Result};

/// An open vote and the answers received so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteRecord {
    pub statement: VoteStatement,
    /// Replier name -> opaque answer bytes.
    pub answers: BTreeMap<String, Vec<u8>>,
}

/// Holder -> balance for one asset.
pub type Holdings = BTreeMap<String, u64>;

#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    filenames: HashMap<String, FileClaim>,
    identities: HashMap<String, Identity>,
    assets: HashMap<String, Holdings>,
    votes: HashMap<String, VoteRecord>,
    included: HashSet<Hash>,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the state by applying `blocks` oldest first.
    pub fn replay<'a, I>(blocks: I) -> Self
    where
        I: IntoIterator<Item = &'a Block>,
    {
        let mut state = Self::new();
        for block in blocks {
            state.apply_block(block);
        }
        state
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn filename(&self, name: &str) -> Option<&FileClaim> {
        self.filenames.get(name)
    }

    pub fn identity(&self, name: &str) -> Option<&Identity> {
        self.identities.get(name)
    }

    pub fn vote(&self, question_id: &str) -> Option<&VoteRecord> {
        self.votes.get(question_id)
    }

    pub fn balance(&self, asset: &str, holder: &str) -> u64 {
        self.assets
            .get(asset)
            .and_then(|holdings| holdings.get(holder))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all balances of `asset`.
    pub fn supply(&self, asset: &str) -> u64 {
        self.assets
            .get(asset)
            .map(|holdings| holdings.values().sum())
            .unwrap_or(0)
    }

    pub fn is_included(&self, tx_hash: &Hash) -> bool {
        self.included.contains(tx_hash)
    }

    pub fn filenames(&self) -> Vec<String> {
        sorted(self.filenames.keys())
    }

    pub fn identities(&self) -> Vec<String> {
        sorted(self.identities.keys())
    }

    pub fn assets(&self) -> BTreeMap<String, Holdings> {
        self.assets
            .iter()
            .map(|(asset, holdings)| (asset.clone(), holdings.clone()))
            .collect()
    }

    pub fn votes(&self) -> BTreeMap<String, VoteRecord> {
        self.votes
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// Single-transaction rules against the current state.
    ///
    /// Signature bytes are not checked here; only the claimed signer is.
    pub fn validate_transaction(&self, tx: &Transaction) -> Result<()> {
        if self.included.contains(&tx.hash()) {
            return Err(LedgerError::AlreadyIncluded(hash_hex(&tx.hash())));
        }
        match &tx.payload {
            TxPayload::File(file) => {
                if self.filenames.contains_key(&file.name) {
                    return Err(LedgerError::FilenameClaimed(file.name.clone()));
                }
            }
            TxPayload::Identity(identity) => {
                if self.identities.contains_key(&identity.name) {
                    return Err(LedgerError::IdentityClaimed(identity.name.clone()));
                }
            }
            TxPayload::Share(share) => self.validate_share(tx, share)?,
            TxPayload::VoteStatement(vote) => self.validate_vote_statement(vote)?,
            TxPayload::VoteAnswer(answer) => self.validate_vote_answer(answer)?,
        }
        Ok(())
    }

    fn validate_share(&self, tx: &Transaction, share: &ShareTx) -> Result<()> {
        if !share.is_mint() {
            self.require_identity(&share.from)?;
        }
        self.require_identity(&share.to)?;

        let signature = tx
            .signature
            .as_ref()
            .ok_or(LedgerError::MissingSignature(tx.kind()))?;
        if signature.signer != share.expected_signer() {
            return Err(LedgerError::SignerMismatch {
                expected: share.expected_signer().to_string(),
                actual: signature.signer.clone(),
            });
        }

        if share.is_mint() && self.assets.contains_key(&share.asset) {
            return Err(LedgerError::AssetExists(share.asset.clone()));
        }
        Ok(())
    }

    fn validate_vote_statement(&self, vote: &VoteStatement) -> Result<()> {
        let question_id = vote.question_id();
        if self.votes.contains_key(&question_id) {
            return Err(LedgerError::QuestionExists(question_id));
        }
        if !self.assets.contains_key(&vote.asset) {
            return Err(LedgerError::UnknownAsset(vote.asset.clone()));
        }
        if self.balance(&vote.asset, &vote.origin) == 0 {
            return Err(LedgerError::NoShares {
                holder: vote.origin.clone(),
                asset: vote.asset.clone(),
            });
        }
        Ok(())
    }

    fn validate_vote_answer(&self, answer: &VoteAnswer) -> Result<()> {
        let record = self
            .votes
            .get(&answer.question_id)
            .ok_or_else(|| LedgerError::UnknownQuestion(answer.question_id.clone()))?;
        if self.balance(&record.statement.asset, &answer.replier) == 0 {
            return Err(LedgerError::NoShares {
                holder: answer.replier.clone(),
                asset: record.statement.asset.clone(),
            });
        }
        if record.answers.contains_key(&answer.replier) {
            return Err(LedgerError::AlreadyAnswered {
                question_id: answer.question_id.clone(),
                replier: answer.replier.clone(),
            });
        }
        Ok(())
    }

    fn require_identity(&self, name: &str) -> Result<()> {
        if self.identities.contains_key(name) {
            Ok(())
        } else {
            Err(LedgerError::UnknownIdentity(name.to_string()))
        }
    }

    /// Every transaction individually, then the aggregate rules.
    pub fn validate_block(&self, transactions: &[Transaction]) -> Result<()> {
        for tx in transactions {
            self.validate_transaction(tx)?;
        }
        self.validate_block_aggregates(transactions)
    }

    /// Rules that only make sense over a set of transactions: a name is
    /// claimed at most once per block, a question is opened and answered
    /// by each replier at most once per block, and share transfers replayed
    /// in order never overdraw a balance.
    ///
    /// Vote answers are checked against the state before the block, so an
    /// answer to a question opened in the same block is `UnknownQuestion`.
    pub fn validate_block_aggregates(&self, transactions: &[Transaction]) -> Result<()> {
        let mut identities = HashSet::new();
        let mut filenames = HashSet::new();
        let mut questions = HashSet::new();
        let mut answers = HashSet::new();
        for tx in transactions {
            match &tx.payload {
                TxPayload::Identity(identity) => {
                    if !identities.insert(identity.name.as_str()) {
                        return Err(LedgerError::DuplicateIdentityInBlock(identity.name.clone()));
                    }
                }
                TxPayload::File(file) => {
                    if !filenames.insert(file.name.as_str()) {
                        return Err(LedgerError::DuplicateFilenameInBlock(file.name.clone()));
                    }
                }
                TxPayload::VoteStatement(vote) => {
                    let question_id = vote.question_id();
                    if questions.contains(&question_id) {
                        return Err(LedgerError::QuestionExists(question_id));
                    }
                    questions.insert(question_id);
                }
                TxPayload::VoteAnswer(answer) => {
                    let key = (answer.question_id.as_str(), answer.replier.as_str());
                    if !answers.insert(key) {
                        return Err(LedgerError::AlreadyAnswered {
                            question_id: answer.question_id.clone(),
                            replier: answer.replier.clone(),
                        });
                    }
                }
                _ => {}
            }
        }
        self.validate_share_txs(transactions)
    }

    /// Replay the block's share transactions on a scratch copy of the
    /// balances they touch.
    pub fn validate_share_txs(&self, transactions: &[Transaction]) -> Result<()> {
        let mut scratch: HashMap<&str, Holdings> = HashMap::new();

        for share in share_txs(transactions) {
            let asset = share.asset.as_str();
            if !scratch.contains_key(asset) {
                if let Some(holdings) = self.assets.get(asset) {
                    scratch.insert(asset, holdings.clone());
                }
            }

            if share.is_mint() {
                if scratch.contains_key(asset) {
                    return Err(LedgerError::AssetExists(share.asset.clone()));
                }
                let mut holdings = Holdings::new();
                holdings.insert(share.to.clone(), share.amount);
                scratch.insert(asset, holdings);
                continue;
            }

            let holdings = scratch
                .get_mut(asset)
                .ok_or_else(|| LedgerError::UnknownAsset(share.asset.clone()))?;
            transfer(holdings, share)?;
        }
        Ok(())
    }

    // =========================================================================
    // INTEGRATION
    // =========================================================================

    /// Integrate a block's transactions, in order.
    pub fn apply_block(&mut self, block: &Block) {
        for tx in &block.transactions {
            self.apply_transaction(tx);
        }
    }

    fn apply_transaction(&mut self, tx: &Transaction) {
        self.included.insert(tx.hash());
        match &tx.payload {
            TxPayload::File(file) => {
                self.filenames.insert(file.name.clone(), file.clone());
            }
            TxPayload::Identity(identity) => {
                self.identities
                    .insert(identity.name.clone(), identity.clone());
            }
            TxPayload::Share(share) => self.apply_share(share),
            TxPayload::VoteStatement(vote) => {
                self.votes
                    .entry(vote.question_id())
                    .or_insert_with(|| VoteRecord {
                        statement: vote.clone(),
                        answers: BTreeMap::new(),
                    });
            }
            TxPayload::VoteAnswer(answer) => {
                if let Some(record) = self.votes.get_mut(&answer.question_id) {
                    record
                        .answers
                        .entry(answer.replier.clone())
                        .or_insert_with(|| answer.answer.clone());
                }
            }
        }
    }

    fn apply_share(&mut self, share: &ShareTx) {
        if share.is_mint() {
            if self.assets.contains_key(&share.asset) {
                warn!(asset = %share.asset, "Skipping mint of existing asset");
                return;
            }
            let mut holdings = Holdings::new();
            holdings.insert(share.to.clone(), share.amount);
            self.assets.insert(share.asset.clone(), holdings);
            return;
        }

        let Some(holdings) = self.assets.get_mut(&share.asset) else {
            warn!(asset = %share.asset, "Skipping transfer of unknown asset");
            return;
        };
        if let Err(e) = transfer(holdings, share) {
            warn!("Skipping share transfer: {}", e);
        }
    }
}

fn share_txs(transactions: &[Transaction]) -> impl Iterator<Item = &ShareTx> {
    transactions.iter().filter_map(|tx| match &tx.payload {
        TxPayload::Share(share) => Some(share),
        _ => None,
    })
}

/// Move `share.amount` from `share.from` to `share.to`.
fn transfer(holdings: &mut Holdings, share: &ShareTx) -> Result<()> {
    let available = holdings.get(&share.from).copied().unwrap_or(0);
    if available < share.amount {
        return Err(LedgerError::InsufficientBalance {
            asset: share.asset.clone(),
            holder: share.from.clone(),
            available,
            required: share.amount,
        });
    }
    holdings.insert(share.from.clone(), available - share.amount);
    *holdings.entry(share.to.clone()).or_insert(0) += share.amount;
    Ok(())
}

fn sorted<'a>(keys: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut keys: Vec<String> = keys.cloned().collect();
    keys.sort();
    keys
}
