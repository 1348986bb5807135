//! # Packet Router
//!
//! Entry point of every inbound datagram. Decoding happens on the receive
//! loop; everything after that runs on one spawned task per packet so a slow
//! handler never stalls reception.
//!
//! ```text
//! socket ──bytes──→ decode ──→ spawn ──→ GossipService::handle_packet
//!                                              │
//!                              TxPublish / BlockPublish handed back
//!                                              ↓
//!                                        LedgerService
//! ```

use rc_01_epidemic_gossip::{GossipService, PacketSender};
use rc_02_ledger::{BlockOutcome, LedgerApi, LedgerService, SignatureVerifier};
use rc_telemetry::{
    metric_inc, BLOCKS_HANDLED, PACKETS_MALFORMED, PACKETS_RECEIVED, TRANSACTIONS_HANDLED,
};
use shared_types::{decode_packet, GossipPacket};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::adapters::GossipBroadcaster;

/// Ledger wired to flood through the gossip engine.
pub type NodeLedger<S, V> = LedgerService<GossipBroadcaster<GossipService<S>>, V>;

/// Dispatches decoded packets to the gossip engine and the ledger.
pub struct PacketRouter<S, V>
where
    S: PacketSender,
    V: SignatureVerifier,
{
    gossip: GossipService<S>,
    ledger: NodeLedger<S, V>,
}

impl<S, V> Clone for PacketRouter<S, V>
where
    S: PacketSender,
    V: SignatureVerifier,
{
    fn clone(&self) -> Self {
        Self {
            gossip: self.gossip.clone(),
            ledger: self.ledger.clone(),
        }
    }
}

impl<S, V> PacketRouter<S, V>
where
    S: PacketSender,
    V: SignatureVerifier,
{
    pub fn new(gossip: GossipService<S>, ledger: NodeLedger<S, V>) -> Self {
        Self { gossip, ledger }
    }

    /// Handle one decoded packet from `from`.
    pub async fn route(&self, packet: GossipPacket, from: SocketAddr) {
        metric_inc!(PACKETS_RECEIVED, &[packet.kind()]);

        let Some(packet) = self.gossip.handle_packet(packet, from).await else {
            return;
        };

        match packet {
            GossipPacket::TxPublish(publish) => {
                match self.ledger.handle_tx_publish(publish, Some(from)).await {
                    Ok(()) => metric_inc!(TRANSACTIONS_HANDLED, &["accepted"]),
                    Err(e) => {
                        metric_inc!(TRANSACTIONS_HANDLED, &["rejected"]);
                        debug!(peer = %from, error = %e, "Transaction rejected");
                    }
                }
            }
            GossipPacket::BlockPublish(publish) => {
                match self.ledger.handle_block_publish(publish, Some(from)).await {
                    Ok(outcome) => metric_inc!(BLOCKS_HANDLED, &[outcome_label(&outcome)]),
                    Err(e) => {
                        metric_inc!(BLOCKS_HANDLED, &["rejected"]);
                        debug!(peer = %from, error = %e, "Block rejected");
                    }
                }
            }
            other => debug!(kind = other.kind(), "Unhandled packet"),
        }
    }

    /// Decode `bytes` and route the packet on its own task. Returns `false`
    /// if the datagram did not decode.
    pub fn route_datagram(&self, bytes: &[u8], from: SocketAddr) -> bool {
        let packet = match decode_packet(bytes) {
            Ok(packet) => packet,
            Err(e) => {
                PACKETS_MALFORMED.inc();
                warn!(peer = %from, error = %e, "Dropping malformed datagram");
                return false;
            }
        };

        let router = self.clone();
        tokio::spawn(async move { router.route(packet, from).await });
        true
    }

    /// Receive loop over `socket` until `shutdown` flips.
    pub async fn run_receiver(
        &self,
        socket: Arc<UdpSocket>,
        max_datagram_size: usize,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut buf = vec![0u8; max_datagram_size];
        loop {
            tokio::select! {
                received = socket.recv_from(&mut buf) => match received {
                    Ok((len, from)) => {
                        self.route_datagram(&buf[..len], from);
                    }
                    Err(e) => warn!(error = %e, "Receive failed"),
                },
                _ = shutdown.changed() => {
                    info!("[runtime] Receive loop stopped");
                    return;
                }
            }
        }
    }
}

fn outcome_label(outcome: &BlockOutcome) -> &'static str {
    match outcome {
        BlockOutcome::Duplicate => "duplicate",
        BlockOutcome::Extended { .. } => "extended",
        BlockOutcome::Reorganized { .. } => "reorganized",
        BlockOutcome::Forked { .. } => "forked",
    }
}
