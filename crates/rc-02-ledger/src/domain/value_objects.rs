//! Ledger configuration and read-only views.

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use super::state::{Holdings, VoteRecord};

/// Ledger and miner configuration.
#[derive(Clone, Debug)]
pub struct LedgerSettings {
    /// Required leading zero hex digits of a block hash.
    pub difficulty: u32,
    /// Delay before the miner starts, so a node joining late can adopt an
    /// existing genesis block instead of mining its own.
    pub genesis_wait: Duration,
    /// Hop limit of transactions published from this node.
    pub tx_hop_limit: u32,
    /// Hop limit of blocks mined by this node.
    pub block_hop_limit: u32,
    /// Miner sleep when there is nothing to mine.
    pub idle_backoff: Duration,
    /// Whether this node mines at all.
    pub mining_enabled: bool,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            difficulty: 6,
            genesis_wait: Duration::from_secs(5),
            tx_hop_limit: 10,
            block_hop_limit: 20,
            idle_backoff: Duration::from_secs(1),
            mining_enabled: true,
        }
    }
}

/// One fork tip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ForkSummary {
    pub tip: String,
    pub length: u64,
}

/// Point-in-time view of the ledger, as exposed on the control surface.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LedgerSnapshot {
    /// Hex hash of the longest chain tip, if any.
    pub longest_tip: Option<String>,
    pub chain_length: u64,
    /// Longest first.
    pub forks: Vec<ForkSummary>,
    pub filenames: Vec<String>,
    pub identities: Vec<String>,
    /// Asset -> holder -> balance.
    pub assets: BTreeMap<String, Holdings>,
    /// Question id -> vote.
    pub votes: BTreeMap<String, VoteRecord>,
    pub pending_transactions: usize,
}

/// What happened to a received block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Already stored; only forwarded.
    Duplicate,
    /// Extended (or started) the longest chain.
    Extended { length: u64 },
    /// A fork overtook the longest chain.
    Reorganized { length: u64, rewound: usize },
    /// Stored on a fork that is not the longest.
    Forked { length: u64 },
}
