//! Fork tips and the longest chain.
//!
//! ## Invariants
//!
//! - Every known chain tip appears exactly once, with its length.
//! - When any tip is known, `longest` is set and its length is the maximum.
//! - The longest chain only changes to a strictly longer chain; ties keep
//!   the current one.

use shared_types::Hash;
use std::collections::HashMap;

/// What recording a block did to the fork index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkUpdate {
    /// First chain known to this node.
    Started { length: u64 },
    /// The block extended the current longest chain.
    ExtendedLongest { length: u64 },
    /// A different fork became strictly longer than the previous longest.
    Overtook { length: u64, previous: Hash },
    /// The block extended a fork that is still not the longest.
    ExtendedFork { length: u64 },
    /// The block started a new fork that is not the longest.
    NewFork { length: u64 },
}

impl ForkUpdate {
    pub fn length(&self) -> u64 {
        match *self {
            ForkUpdate::Started { length }
            | ForkUpdate::ExtendedLongest { length }
            | ForkUpdate::Overtook { length, .. }
            | ForkUpdate::ExtendedFork { length }
            | ForkUpdate::NewFork { length } => length,
        }
    }

    /// Whether the longest chain changed.
    pub fn moved_longest(&self) -> bool {
        matches!(
            self,
            ForkUpdate::Started { .. }
                | ForkUpdate::ExtendedLongest { .. }
                | ForkUpdate::Overtook { .. }
        )
    }
}

#[derive(Debug, Default)]
pub struct ForkIndex {
    tips: HashMap<Hash, u64>,
    longest: Option<Hash>,
}

impl ForkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn longest(&self) -> Option<Hash> {
        self.longest
    }

    pub fn longest_length(&self) -> u64 {
        self.longest
            .and_then(|tip| self.tips.get(&tip).copied())
            .unwrap_or(0)
    }

    pub fn length_of(&self, tip: &Hash) -> Option<u64> {
        self.tips.get(tip).copied()
    }

    /// All tips with their lengths, longest first.
    pub fn tips(&self) -> Vec<(Hash, u64)> {
        let mut tips: Vec<(Hash, u64)> = self.tips.iter().map(|(h, l)| (*h, *l)).collect();
        tips.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        tips
    }

    /// Record a newly stored block.
    ///
    /// `walk_length` is only called when `parent` is not a tip, and must
    /// return the length of the chain ending at `hash` in the block store.
    pub fn record<F>(&mut self, hash: Hash, parent: &Hash, walk_length: F) -> ForkUpdate
    where
        F: FnOnce() -> u64,
    {
        if let Some(parent_length) = self.tips.remove(parent) {
            let length = parent_length + 1;
            self.tips.insert(hash, length);
            if self.longest == Some(*parent) {
                self.longest = Some(hash);
                return ForkUpdate::ExtendedLongest { length };
            }
            return self.promote_if_longer(hash, length, ForkUpdate::ExtendedFork { length });
        }

        let length = walk_length();
        self.tips.insert(hash, length);
        if self.longest.is_none() {
            self.longest = Some(hash);
            return ForkUpdate::Started { length };
        }
        self.promote_if_longer(hash, length, ForkUpdate::NewFork { length })
    }

    fn promote_if_longer(&mut self, hash: Hash, length: u64, otherwise: ForkUpdate) -> ForkUpdate {
        match self.longest {
            Some(previous) if length > self.longest_length() => {
                self.longest = Some(hash);
                ForkUpdate::Overtook { length, previous }
            }
            _ => otherwise,
        }
    }
}
