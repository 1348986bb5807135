//! Every block ever accepted, keyed by hash.
//!
//! Blocks are never removed: losing forks stay here so a later extension
//! can still overtake the longest chain. Chains are walked through
//! `prev_hash` links until a block is missing (genesis points at the zero
//! hash, which is never stored).

use shared_types::{Block, Hash};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct BlockStore {
    blocks: HashMap<Hash, Block>,
}

impl BlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, hash: Hash, block: Block) {
        self.blocks.insert(hash, block);
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.blocks.contains_key(hash)
    }

    pub fn get(&self, hash: &Hash) -> Option<&Block> {
        self.blocks.get(hash)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Hashes from `tip` back to the oldest known ancestor.
    pub fn chain_from(&self, tip: &Hash) -> Vec<Hash> {
        let mut chain = Vec::new();
        let mut current = *tip;
        while let Some(block) = self.blocks.get(&current) {
            chain.push(current);
            current = block.prev_hash;
        }
        chain
    }

    /// Number of known blocks on the chain ending at `tip`.
    pub fn chain_length(&self, tip: &Hash) -> u64 {
        self.chain_from(tip).len() as u64
    }

    /// Blocks of the chain ending at `tip`, oldest first.
    pub fn blocks_in_order(&self, tip: &Hash) -> Vec<&Block> {
        let mut chain: Vec<&Block> = self
            .chain_from(tip)
            .iter()
            .filter_map(|hash| self.blocks.get(hash))
            .collect();
        chain.reverse();
        chain
    }

    /// How many blocks of the chain ending at `old_tip` are abandoned when
    /// switching to the chain ending at `new_tip`.
    pub fn rewind_count(&self, new_tip: &Hash, old_tip: &Hash) -> usize {
        let new_chain: HashSet<Hash> = self.chain_from(new_tip).into_iter().collect();
        self.chain_from(old_tip)
            .iter()
            .take_while(|hash| !new_chain.contains(*hash))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ZERO_HASH;

    fn child(store: &mut BlockStore, parent: Hash, tag: u8) -> Hash {
        let block = Block::new(parent, [tag; 32], vec![]);
        let hash = block.hash();
        store.insert(hash, block);
        hash
    }

    #[test]
    fn test_chain_walk() {
        let mut store = BlockStore::new();
        let g = child(&mut store, ZERO_HASH, 1);
        let b1 = child(&mut store, g, 2);
        let b2 = child(&mut store, b1, 3);

        assert_eq!(store.chain_from(&b2), vec![b2, b1, g]);
        assert_eq!(store.chain_length(&b2), 3);
        assert_eq!(store.chain_length(&ZERO_HASH), 0);

        let ordered: Vec<Hash> = store.blocks_in_order(&b2).iter().map(|b| b.hash()).collect();
        assert_eq!(ordered, vec![g, b1, b2]);
    }

    #[test]
    fn test_orphan_counts_only_known_blocks() {
        let mut store = BlockStore::new();
        let orphan = child(&mut store, [0xee; 32], 1);
        assert_eq!(store.chain_length(&orphan), 1);
    }

    #[test]
    fn test_rewind_count() {
        let mut store = BlockStore::new();
        let g = child(&mut store, ZERO_HASH, 1);
        let a1 = child(&mut store, g, 2);
        let a2 = child(&mut store, a1, 3);
        let b1 = child(&mut store, g, 4);
        let b2 = child(&mut store, b1, 5);
        let b3 = child(&mut store, b2, 6);

        assert_eq!(store.rewind_count(&b3, &a2), 2);
        assert_eq!(store.rewind_count(&a2, &a1), 0);
    }
}
