//! Peer registry: the flat set of known neighbor addresses.

use rand::seq::SliceRandom;
use std::net::SocketAddr;

/// Known neighbors, in insertion order.
///
/// Grows opportunistically as packets arrive from unseen senders. Never
/// contains this node's own address and never holds duplicates.
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    own_addr: SocketAddr,
    peers: Vec<SocketAddr>,
}

impl PeerRegistry {
    pub fn new(own_addr: SocketAddr) -> Self {
        Self {
            own_addr,
            peers: Vec::new(),
        }
    }

    /// Builder: seed with bootstrap peers.
    pub fn with_peers(mut self, peers: impl IntoIterator<Item = SocketAddr>) -> Self {
        for peer in peers {
            self.add(peer);
        }
        self
    }

    /// Add a peer. Returns `true` if it was not known before.
    pub fn add(&mut self, addr: SocketAddr) -> bool {
        if addr == self.own_addr || self.peers.contains(&addr) {
            return false;
        }
        self.peers.push(addr);
        true
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.peers.contains(addr)
    }

    pub fn all(&self) -> Vec<SocketAddr> {
        self.peers.clone()
    }

    /// Every peer except `excluded`.
    pub fn all_except(&self, excluded: Option<SocketAddr>) -> Vec<SocketAddr> {
        self.peers
            .iter()
            .copied()
            .filter(|p| Some(*p) != excluded)
            .collect()
    }

    /// Uniformly random peer not in `excluded`, or `None` if no candidate exists.
    pub fn random_excluding(&self, excluded: &[SocketAddr]) -> Option<SocketAddr> {
        let candidates: Vec<SocketAddr> = self
            .peers
            .iter()
            .copied()
            .filter(|p| !excluded.contains(p))
            .collect();
        candidates.choose(&mut rand::thread_rng()).copied()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
