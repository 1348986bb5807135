//! Outbound ports (SPI) for the gossip engine.

use async_trait::async_trait;
use shared_types::GossipPacket;
use std::net::SocketAddr;
use tracing::debug;

use crate::error::Result;

/// Datagram transport. Best-effort: a successful return only means the
/// packet left this node.
#[async_trait]
pub trait PacketSender: Send + Sync + 'static {
    /// Send one packet to one address.
    async fn send_packet(&self, packet: &GossipPacket, to: SocketAddr) -> Result<()>;
}

/// Receiver for packets owned by an external collaborator (file sharing,
/// search) that reached their destination at this node.
pub trait CollaboratorSink: Send + Sync + 'static {
    fn deliver(&self, packet: GossipPacket, from: SocketAddr);
}

/// Default collaborator: nothing is installed, so packets are logged and dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingCollaborator;

impl CollaboratorSink for LoggingCollaborator {
    fn deliver(&self, packet: GossipPacket, from: SocketAddr) {
        debug!(kind = packet.kind(), %from, "No collaborator installed, dropping packet");
    }
}
