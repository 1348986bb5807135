//! Inbound ports (API) for the ledger.

use async_trait::async_trait;
use shared_types::{BlockPublish, Hash, Transaction, TxPublish};
use std::net::SocketAddr;

use crate::domain::{BlockOutcome, LedgerSnapshot};
use crate::error::Result;

/// Operations the node runtime and the control surface call on the ledger.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    /// Validate a locally created transaction, pool it and flood it.
    async fn submit_transaction(&self, tx: Transaction) -> Result<Hash>;

    /// Handle a transaction received from `from`.
    async fn handle_tx_publish(&self, packet: TxPublish, from: Option<SocketAddr>) -> Result<()>;

    /// Handle a block received from `from`.
    async fn handle_block_publish(
        &self,
        packet: BlockPublish,
        from: Option<SocketAddr>,
    ) -> Result<BlockOutcome>;

    fn snapshot(&self) -> LedgerSnapshot;

    /// Hashes of the longest chain, tip first.
    fn longest_chain(&self) -> Vec<Hash>;

    fn balance(&self, asset: &str, holder: &str) -> u64;
}
