//! # Ledger Service
//!
//! Transaction pool admission, block integration with fork choice, and the
//! proof-of-work miner.
//!
//! ## Architecture
//!
//! The service implements the inbound [`LedgerApi`] port and depends on two
//! outbound ports, implemented in node-runtime:
//! - [`PeerBroadcaster`]: flooding of `TxPublish`/`BlockPublish`
//! - [`SignatureVerifier`]: signature bytes against registered public keys
//!
//! ## Block Handling
//!
//! ```text
//! BlockPublish ──→ PoW check ──→ known? ──yes──→ forward
//!                                   │no
//!                                   ↓
//!                 validate against the parent's state
//!                                   ↓
//!              store ──→ fork index ──┬── extends longest: apply txs
//!                                     ├── overtakes: replay new chain
//!                                     └── shorter fork: record only
//!                                   ↓
//!                                forward
//! ```
//!
//! ## Mining
//!
//! The miner takes a snapshot of the pool, filters out transactions that no
//! longer validate, and searches nonces on a blocking thread. Every change of
//! the longest chain bumps an epoch counter; a search started under an older
//! epoch gives up and the miner starts over on the new tip.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{
    hash_hex, Block, BlockPublish, GossipPacket, Hash, Transaction, TxPublish, ZERO_HASH,
};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::{
    pow, BlockOutcome, BlockStore, ForkIndex, ForkSummary, ForkUpdate, LedgerSettings,
    LedgerSnapshot, LedgerState, TransactionPool,
};
use crate::error::{LedgerError, Result};
use crate::ports::{AcceptAllVerifier, LedgerApi, PeerBroadcaster, SignatureVerifier};

/// Result of one mining round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningRound {
    /// A block was found and integrated.
    Mined(Hash),
    /// The longest chain moved (or shutdown was requested) mid-search.
    Aborted,
    /// Nothing minable in the pool.
    Idle,
}

/// Work unit handed to the nonce search.
struct Candidate {
    prev_hash: Hash,
    transactions: Vec<Transaction>,
    epoch: u64,
}

/// Proof-of-work ledger.
///
/// ## Dependencies
///
/// - `B: PeerBroadcaster` - flooding to the overlay
/// - `V: SignatureVerifier` - signature checks
pub struct LedgerService<B, V = AcceptAllVerifier>
where
    B: PeerBroadcaster,
    V: SignatureVerifier,
{
    settings: Arc<LedgerSettings>,
    broadcaster: Arc<B>,
    verifier: Arc<V>,
    forks: Arc<RwLock<ForkIndex>>,
    blocks: Arc<RwLock<BlockStore>>,
    state: Arc<RwLock<LedgerState>>,
    pool: Arc<Mutex<TransactionPool>>,
    tip_epoch: Arc<AtomicU64>,
}

impl<B, V> Clone for LedgerService<B, V>
where
    B: PeerBroadcaster,
    V: SignatureVerifier,
{
    fn clone(&self) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
            broadcaster: Arc::clone(&self.broadcaster),
            verifier: Arc::clone(&self.verifier),
            forks: Arc::clone(&self.forks),
            blocks: Arc::clone(&self.blocks),
            state: Arc::clone(&self.state),
            pool: Arc::clone(&self.pool),
            tip_epoch: Arc::clone(&self.tip_epoch),
        }
    }
}

impl<B> LedgerService<B>
where
    B: PeerBroadcaster,
{
    /// Ledger that trusts signature bytes and checks only claimed signers.
    pub fn new(settings: LedgerSettings, broadcaster: Arc<B>) -> Self {
        Self::with_verifier(settings, broadcaster, Arc::new(AcceptAllVerifier))
    }
}

impl<B, V> LedgerService<B, V>
where
    B: PeerBroadcaster,
    V: SignatureVerifier,
{
    pub fn with_verifier(settings: LedgerSettings, broadcaster: Arc<B>, verifier: Arc<V>) -> Self {
        Self {
            settings: Arc::new(settings),
            broadcaster,
            verifier,
            forks: Arc::new(RwLock::new(ForkIndex::new())),
            blocks: Arc::new(RwLock::new(BlockStore::new())),
            state: Arc::new(RwLock::new(LedgerState::new())),
            pool: Arc::new(Mutex::new(TransactionPool::new())),
            tip_epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub fn pool_len(&self) -> usize {
        self.pool.lock().len()
    }

    pub fn longest_tip(&self) -> Option<Hash> {
        self.forks.read().longest()
    }

    /// Incremented on every change of the longest chain.
    pub fn tip_epoch(&self) -> u64 {
        self.tip_epoch.load(Ordering::SeqCst)
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// Check signature bytes when the claimed signer has a registered key.
    fn check_signature(&self, state: &LedgerState, tx: &Transaction) -> Result<()> {
        let Some(signature) = &tx.signature else {
            return Ok(());
        };
        let Some(identity) = state.identity(&signature.signer) else {
            return Ok(());
        };
        if self.verifier.verify(
            &identity.public_key,
            &tx.payload.content_hash(),
            &signature.bytes,
        ) {
            Ok(())
        } else {
            Err(LedgerError::InvalidSignature(signature.signer.clone()))
        }
    }

    fn validate_for_pool(&self, tx: &Transaction) -> Result<()> {
        let state = self.state.read();
        state.validate_transaction(tx)?;
        self.check_signature(&state, tx)
    }

    fn validate_block_against(&self, state: &LedgerState, block: &Block) -> Result<()> {
        for tx in &block.transactions {
            state.validate_transaction(tx)?;
            self.check_signature(state, tx)?;
        }
        state.validate_block_aggregates(&block.transactions)
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    async fn forward_tx(&self, mut packet: TxPublish, from: Option<SocketAddr>) {
        if packet.hop_limit <= 1 {
            return;
        }
        packet.hop_limit -= 1;
        self.broadcaster
            .broadcast(GossipPacket::TxPublish(packet), from)
            .await;
    }

    // =========================================================================
    // BLOCKS
    // =========================================================================

    async fn forward_block(&self, mut packet: BlockPublish, from: Option<SocketAddr>) {
        if packet.hop_limit <= 1 {
            return;
        }
        packet.hop_limit -= 1;
        self.broadcaster
            .broadcast(GossipPacket::BlockPublish(packet), from)
            .await;
    }

    /// Store a block with valid proof of work and update the fork index.
    ///
    /// Holds the fork index write lock throughout, so blocks are integrated
    /// one at a time.
    #[tracing::instrument(skip(self, hash, block), fields(block = %hash_hex(&hash)))]
    fn integrate_block(&self, hash: Hash, block: &Block) -> Result<BlockOutcome> {
        let mut forks = self.forks.write();

        {
            let blocks = self.blocks.read();
            if blocks.contains(&hash) {
                return Ok(BlockOutcome::Duplicate);
            }
            if !block.is_genesis() && !blocks.contains(&block.prev_hash) {
                warn!("Discarding BlockPublish with unknown parent");
                return Err(LedgerError::UnknownParent(hash_hex(&block.prev_hash)));
            }

            let state = self.state.read();
            let validation = if block.is_genesis() {
                self.validate_block_against(&LedgerState::new(), block)
            } else if forks.longest() == Some(block.prev_hash) {
                self.validate_block_against(&state, block)
            } else {
                let parent_state = LedgerState::replay(blocks.blocks_in_order(&block.prev_hash));
                self.validate_block_against(&parent_state, block)
            };
            if let Err(e) = validation {
                warn!(error = %e, "Discarding BlockPublish with invalid transactions");
                return Err(e);
            }
        }

        let mut blocks = self.blocks.write();
        blocks.insert(hash, block.clone());
        let update = forks.record(hash, &block.prev_hash, || blocks.chain_length(&hash));

        let outcome = match update {
            ForkUpdate::Started { length } | ForkUpdate::ExtendedLongest { length } => {
                let mut state = self.state.write();
                state.apply_block(block);
                self.prune_pool(&state, Vec::new());
                BlockOutcome::Extended { length }
            }
            ForkUpdate::Overtook { length, previous } => {
                let rewound = blocks.rewind_count(&hash, &previous);
                info!("FORK-LONGER rewind {} blocks", rewound);

                let new_chain: HashSet<Hash> = blocks.chain_from(&hash).into_iter().collect();
                let abandoned: Vec<Transaction> = blocks
                    .chain_from(&previous)
                    .iter()
                    .take_while(|h| !new_chain.contains(*h))
                    .filter_map(|h| blocks.get(h))
                    .flat_map(|b| b.transactions.iter().cloned())
                    .collect();

                let mut state = self.state.write();
                *state = LedgerState::replay(blocks.blocks_in_order(&hash));
                self.prune_pool(&state, abandoned);
                BlockOutcome::Reorganized { length, rewound }
            }
            ForkUpdate::ExtendedFork { length } | ForkUpdate::NewFork { length } => {
                info!("FORK-SHORTER {}", hash_hex(&block.prev_hash));
                BlockOutcome::Forked { length }
            }
        };

        if update.moved_longest() {
            self.tip_epoch.fetch_add(1, Ordering::SeqCst);
            let chain: Vec<String> = blocks.chain_from(&hash).iter().map(hash_hex).collect();
            info!("CHAIN {}", chain.join(" "));
        }
        Ok(outcome)
    }

    /// Drop pooled transactions now on the longest chain, and return still
    /// valid transactions from abandoned blocks to the pool.
    fn prune_pool(&self, state: &LedgerState, abandoned: Vec<Transaction>) {
        let mut pool = self.pool.lock();
        let removed = pool.retain(|hash, _| !state.is_included(hash));
        let mut restored = 0;
        for tx in abandoned {
            if state.validate_transaction(&tx).is_ok() && pool.add(tx) {
                restored += 1;
            }
        }
        if removed > 0 || restored > 0 {
            debug!(removed, restored, pending = pool.len(), "Transaction pool updated");
        }
    }

    // =========================================================================
    // MINING
    // =========================================================================

    /// Mine until shutdown, after the genesis wait. `on_round` observes every
    /// round that assembled a candidate, with its duration.
    pub async fn run_miner<F>(&self, mut shutdown: watch::Receiver<bool>, mut on_round: F)
    where
        F: FnMut(&MiningRound, Duration) + Send,
    {
        if !self.settings.mining_enabled {
            info!("[ledger] Mining disabled");
            return;
        }

        info!(
            "[ledger] Waiting {:?} for a genesis block before mining",
            self.settings.genesis_wait
        );
        tokio::select! {
            _ = tokio::time::sleep(self.settings.genesis_wait) => {}
            _ = shutdown.changed() => {
                info!("[ledger] Miner stopped");
                return;
            }
        }

        loop {
            if *shutdown.borrow() {
                break;
            }
            let started = Instant::now();
            match self.mine_round(shutdown.clone()).await {
                round @ (MiningRound::Mined(_) | MiningRound::Aborted) => {
                    on_round(&round, started.elapsed());
                }
                MiningRound::Idle => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.settings.idle_backoff) => {}
                        _ = shutdown.changed() => break,
                    }
                }
            }
        }
        info!("[ledger] Miner stopped");
    }

    /// Assemble one candidate from the pool and search for a nonce.
    pub async fn mine_round(&self, shutdown: watch::Receiver<bool>) -> MiningRound {
        let Some(candidate) = self.assemble_candidate() else {
            return MiningRound::Idle;
        };

        let difficulty = self.settings.difficulty;
        let epoch = Arc::clone(&self.tip_epoch);
        let started = candidate.epoch;
        debug!(
            transactions = candidate.transactions.len(),
            prev = %hash_hex(&candidate.prev_hash),
            "Mining candidate block"
        );

        let search = tokio::task::spawn_blocking(move || {
            pow::search(
                candidate.prev_hash,
                candidate.transactions,
                difficulty,
                || epoch.load(Ordering::SeqCst) != started || *shutdown.borrow(),
            )
        });

        let block = match search.await {
            Ok(Some(block)) => block,
            Ok(None) => {
                debug!("Mining aborted");
                return MiningRound::Aborted;
            }
            Err(e) => {
                warn!(error = %e, "Mining task failed");
                return MiningRound::Aborted;
            }
        };

        let hash = block.hash();
        info!("FOUND-BLOCK {}", hash_hex(&hash));
        let packet = BlockPublish {
            block,
            hop_limit: self.settings.block_hop_limit,
        };
        match self.handle_block_publish(packet, None).await {
            Ok(_) => MiningRound::Mined(hash),
            Err(e) => {
                warn!(error = %e, "Mined block rejected");
                MiningRound::Aborted
            }
        }
    }

    /// Pool transactions that still validate, in arrival order, on top of
    /// the longest tip. Permanently invalid transactions are evicted; the
    /// rest are deferred to a later block.
    fn assemble_candidate(&self) -> Option<Candidate> {
        let forks = self.forks.read();
        let state = self.state.read();
        let mut pool = self.pool.lock();

        let mut chosen: Vec<Transaction> = Vec::new();
        let mut evicted: HashSet<Hash> = HashSet::new();

        for tx in pool.snapshot() {
            let checked = state
                .validate_transaction(&tx)
                .and_then(|_| self.check_signature(&state, &tx));
            if let Err(e) = checked {
                if e.is_validation_failure() {
                    warn!(kind = tx.kind(), error = %e, "Evicting pooled transaction");
                    evicted.insert(tx.hash());
                } else {
                    debug!(kind = tx.kind(), error = %e, "Deferring pooled transaction");
                }
                continue;
            }

            chosen.push(tx);
            if let Err(e) = state.validate_block_aggregates(&chosen) {
                chosen.pop();
                debug!(error = %e, "Deferring pooled transaction");
            }
        }

        if !evicted.is_empty() {
            pool.remove_all(&evicted);
        }
        if chosen.is_empty() {
            return None;
        }

        Some(Candidate {
            prev_hash: forks.longest().unwrap_or(ZERO_HASH),
            transactions: chosen,
            epoch: self.tip_epoch.load(Ordering::SeqCst),
        })
    }
}

// =============================================================================
// API IMPLEMENTATION
// =============================================================================

#[async_trait]
impl<B, V> LedgerApi for LedgerService<B, V>
where
    B: PeerBroadcaster,
    V: SignatureVerifier,
{
    async fn submit_transaction(&self, tx: Transaction) -> Result<Hash> {
        let hash = tx.hash();
        if self.pool.lock().contains(&hash) {
            return Err(LedgerError::DuplicateTransaction(hash_hex(&hash)));
        }
        self.validate_for_pool(&tx)?;
        self.pool.lock().add(tx.clone());
        info!(kind = tx.kind(), tx = %hash_hex(&hash), "Transaction submitted");

        let packet = TxPublish {
            transaction: tx,
            hop_limit: self.settings.tx_hop_limit,
        };
        self.broadcaster
            .broadcast(GossipPacket::TxPublish(packet), None)
            .await;
        Ok(hash)
    }

    async fn handle_tx_publish(&self, packet: TxPublish, from: Option<SocketAddr>) -> Result<()> {
        let hash = packet.transaction.hash();
        let pooled = self.pool.lock().contains(&hash);

        if !pooled {
            if let Err(e) = self.validate_for_pool(&packet.transaction) {
                warn!(kind = packet.transaction.kind(), error = %e, "Discarding TxPublish");
                return Err(e);
            }
            self.pool.lock().add(packet.transaction.clone());
            debug!(kind = packet.transaction.kind(), tx = %hash_hex(&hash), "Transaction pooled");
        }

        self.forward_tx(packet, from).await;
        Ok(())
    }

    async fn handle_block_publish(
        &self,
        packet: BlockPublish,
        from: Option<SocketAddr>,
    ) -> Result<BlockOutcome> {
        let hash = packet.block.hash();
        if !pow::meets_difficulty(&hash, self.settings.difficulty) {
            warn!(block = %hash_hex(&hash), "Discarding BlockPublish since the PoW is invalid");
            return Err(LedgerError::InvalidProofOfWork(self.settings.difficulty));
        }

        let outcome = self.integrate_block(hash, &packet.block)?;
        self.forward_block(packet, from).await;
        Ok(outcome)
    }

    fn snapshot(&self) -> LedgerSnapshot {
        let forks = self.forks.read();
        let state = self.state.read();
        let pool = self.pool.lock();

        LedgerSnapshot {
            longest_tip: forks.longest().map(|tip| hash_hex(&tip)),
            chain_length: forks.longest_length(),
            forks: forks
                .tips()
                .into_iter()
                .map(|(tip, length)| ForkSummary {
                    tip: hash_hex(&tip),
                    length,
                })
                .collect(),
            filenames: state.filenames(),
            identities: state.identities(),
            assets: state.assets(),
            votes: state.votes(),
            pending_transactions: pool.len(),
        }
    }

    fn longest_chain(&self) -> Vec<Hash> {
        let forks = self.forks.read();
        match forks.longest() {
            Some(tip) => self.blocks.read().chain_from(&tip),
            None => Vec::new(),
        }
    }

    fn balance(&self, asset: &str, holder: &str) -> u64 {
        self.state.read().balance(asset, holder)
    }
}
