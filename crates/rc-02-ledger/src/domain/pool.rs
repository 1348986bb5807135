//! # Transaction Pool
//!
//! Validated transactions waiting for a block, in arrival order.
//!
//! ## Invariants
//!
//! - No two pooled transactions share a hash (checked in `add()`).
//! - Arrival order is preserved; the miner assembles candidates in it.

use shared_types::{Hash, Transaction};
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct TransactionPool {
    ordered: Vec<Transaction>,
    by_hash: HashSet<Hash>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transaction. Returns false if its hash is already pooled.
    pub fn add(&mut self, tx: Transaction) -> bool {
        if !self.by_hash.insert(tx.hash()) {
            return false;
        }
        self.ordered.push(tx);
        true
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.by_hash.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Copy of the pooled transactions in arrival order.
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.ordered.clone()
    }

    /// Keep only the transactions for which `keep` returns true.
    /// Returns how many were removed.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&Hash, &Transaction) -> bool,
    {
        let before = self.ordered.len();
        let by_hash = &mut self.by_hash;
        self.ordered.retain(|tx| {
            let hash = tx.hash();
            if keep(&hash, tx) {
                true
            } else {
                by_hash.remove(&hash);
                false
            }
        });
        before - self.ordered.len()
    }

    /// Drop every transaction whose hash is in `hashes`.
    pub fn remove_all(&mut self, hashes: &HashSet<Hash>) -> usize {
        self.retain(|hash, _| !hashes.contains(hash))
    }
}
