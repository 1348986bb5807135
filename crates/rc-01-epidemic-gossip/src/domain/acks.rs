//! Outstanding mongering attempts.
//!
//! Each rumor sent to a peer while mongering gets one wait handle keyed by
//! `(peer, origin, id)`. The handle is a oneshot channel: it is created when
//! the rumor is sent and removed either when a status from that peer
//! resolves it or when the waiter times out. Nothing outlives its attempt.

use shared_types::RumorMessage;
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AckKey {
    pub peer: SocketAddr,
    pub origin: String,
    pub id: u32,
}

impl AckKey {
    pub fn new(peer: SocketAddr, rumor: &RumorMessage) -> Self {
        Self {
            peer,
            origin: rumor.origin.clone(),
            id: rumor.id,
        }
    }
}

/// How a mongering wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The peer answered and both clocks match: flip the coin.
    InSync,
    /// The peer answered with a differing clock; reconciliation takes over.
    Diverged,
    /// No status from the peer within the timeout: flip the coin.
    TimedOut,
    /// A newer attempt for the same key replaced this one.
    Superseded,
}

impl AckOutcome {
    /// Whether mongering may continue (subject to the coin flip).
    pub fn allows_coin_flip(self) -> bool {
        matches!(self, AckOutcome::InSync | AckOutcome::TimedOut)
    }
}

/// Handle of one registered wait, used to tear it down without touching a
/// newer registration for the same key.
pub type AttemptId = u64;

#[derive(Debug, Default)]
pub struct AckRegistry {
    pending: HashMap<AckKey, (AttemptId, oneshot::Sender<AckOutcome>)>,
    next_attempt: AttemptId,
}

impl AckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a wait for `key`. An older wait on the same key is superseded.
    pub fn register(&mut self, key: AckKey) -> (AttemptId, oneshot::Receiver<AckOutcome>) {
        let (tx, rx) = oneshot::channel();
        self.next_attempt += 1;
        let attempt = self.next_attempt;
        if let Some((_, previous)) = self.pending.insert(key, (attempt, tx)) {
            let _ = previous.send(AckOutcome::Superseded);
        }
        (attempt, rx)
    }

    /// Resolve every wait addressed to `peer`. Returns how many were resolved.
    pub fn resolve_peer(&mut self, peer: SocketAddr, outcome: AckOutcome) -> usize {
        let keys: Vec<AckKey> = self
            .pending
            .keys()
            .filter(|k| k.peer == peer)
            .cloned()
            .collect();
        for key in &keys {
            if let Some((_, tx)) = self.pending.remove(key) {
                // The waiter may already have timed out and dropped its receiver.
                let _ = tx.send(outcome);
            }
        }
        keys.len()
    }

    /// Drop the wait for `key` after a timeout, unless it was re-registered.
    pub fn remove(&mut self, key: &AckKey, attempt: AttemptId) {
        if matches!(self.pending.get(key), Some((current, _)) if *current == attempt) {
            self.pending.remove(key);
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
