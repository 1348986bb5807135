//! Ledger flooding over the gossip peer set.

use async_trait::async_trait;
use rc_01_epidemic_gossip::Broadcast;
use rc_02_ledger::PeerBroadcaster;
use shared_types::GossipPacket;
use std::net::SocketAddr;
use std::sync::Arc;

/// Implements the ledger's [`PeerBroadcaster`] with any gossip
/// [`Broadcast`] handle.
pub struct GossipBroadcaster<G: Broadcast> {
    gossip: Arc<G>,
}

impl<G: Broadcast> GossipBroadcaster<G> {
    pub fn new(gossip: Arc<G>) -> Self {
        Self { gossip }
    }
}

#[async_trait]
impl<G> PeerBroadcaster for GossipBroadcaster<G>
where
    G: Broadcast + 'static,
{
    async fn broadcast(&self, packet: GossipPacket, except: Option<SocketAddr>) -> usize {
        self.gossip.broadcast(packet, except).await
    }
}
