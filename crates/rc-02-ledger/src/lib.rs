//! # Proof-of-Work Ledger Subsystem (rc-02)
//!
//! Replicates a name registry, asset balances and votes on a longest-chain
//! proof-of-work blockchain carried by the gossip overlay.
//!
//! ## Architecture Role
//!
//! ```text
//!  [Gossip (1)] ──TxPublish──→ [Ledger (2)] ──→ pool ──→ miner
//!        ↑                          │                     │
//!        │                          ├── BlockPublish ←────┘
//!        └──── flood (hop - 1) ─────┘
//! ```
//!
//! ## Rules Summary
//!
//! - A block is accepted iff its hash has `difficulty` leading zero hex
//!   digits and every transaction validates against its parent's state.
//! - The longest chain switches only to a strictly longer fork; the
//!   materialized state always reflects the longest chain.
//! - Share transfers in a block are replayed in order and may never
//!   overdraw a balance.

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::*;
pub use error::{LedgerError, Result};
pub use ports::{AcceptAllVerifier, LedgerApi, PeerBroadcaster, SignatureVerifier};
pub use service::{LedgerService, MiningRound};
