//! # Control Surface
//!
//! The request/response operations a client (HTTP, CLI) drives a node with.
//! Only the in-process implementation lives here; transports are external.

use async_trait::async_trait;
use rc_01_epidemic_gossip::{DeliveredPrivate, GossipApi, GossipError, GossipService, PacketSender};
use rc_02_ledger::{LedgerApi, LedgerError, LedgerSnapshot, SignatureVerifier};
use shared_types::{Hash, RumorMessage, Transaction, TxPayload};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::adapters::NodeKey;
use crate::router::NodeLedger;

/// Errors surfaced to control clients.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Gossip(#[from] GossipError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Client-facing node operations.
#[async_trait]
pub trait ControlSurface: Send + Sync {
    /// Publish chat text: a rumor, or a simple flood in simple mode.
    async fn publish(&self, text: String) -> Result<(), ControlError>;

    async fn publish_private(&self, text: String, destination: String) -> Result<(), ControlError>;

    fn messages(&self) -> Vec<RumorMessage>;

    fn private_messages(&self) -> Vec<DeliveredPrivate>;

    fn peers(&self) -> Vec<SocketAddr>;

    fn add_peer(&self, addr: SocketAddr) -> bool;

    fn origins(&self) -> Vec<String>;

    fn node_name(&self) -> &str;

    /// Sign (when this node is the expected signer), validate, pool and
    /// flood a transaction.
    async fn submit_transaction(&self, tx: Transaction) -> Result<Hash, ControlError>;

    fn ledger_snapshot(&self) -> LedgerSnapshot;
}

/// In-process control surface over a running node.
pub struct NodeControl<S, V>
where
    S: PacketSender,
    V: SignatureVerifier,
{
    gossip: GossipService<S>,
    ledger: NodeLedger<S, V>,
    key: Arc<NodeKey>,
}

impl<S, V> Clone for NodeControl<S, V>
where
    S: PacketSender,
    V: SignatureVerifier,
{
    fn clone(&self) -> Self {
        Self {
            gossip: self.gossip.clone(),
            ledger: self.ledger.clone(),
            key: Arc::clone(&self.key),
        }
    }
}

impl<S, V> NodeControl<S, V>
where
    S: PacketSender,
    V: SignatureVerifier,
{
    pub fn new(gossip: GossipService<S>, ledger: NodeLedger<S, V>, key: Arc<NodeKey>) -> Self {
        Self { gossip, ledger, key }
    }

    /// Submit this node's identity with its public key.
    pub async fn register_identity(&self) -> Result<Hash, ControlError> {
        let tx = Transaction::new(TxPayload::Identity(self.key.identity()));
        let hash = self.submit_transaction(tx).await?;
        info!(name = %self.key.name(), "Identity registration submitted");
        Ok(hash)
    }
}

#[async_trait]
impl<S, V> ControlSurface for NodeControl<S, V>
where
    S: PacketSender,
    V: SignatureVerifier,
{
    async fn publish(&self, text: String) -> Result<(), ControlError> {
        if self.gossip.settings().simple_mode {
            self.gossip.publish_simple(text).await;
            return Ok(());
        }
        self.gossip.publish(text).await?;
        Ok(())
    }

    async fn publish_private(&self, text: String, destination: String) -> Result<(), ControlError> {
        Ok(self.gossip.publish_private(text, destination).await?)
    }

    fn messages(&self) -> Vec<RumorMessage> {
        self.gossip.messages()
    }

    fn private_messages(&self) -> Vec<DeliveredPrivate> {
        self.gossip.private_messages()
    }

    fn peers(&self) -> Vec<SocketAddr> {
        self.gossip.peers()
    }

    fn add_peer(&self, addr: SocketAddr) -> bool {
        GossipApi::add_peer(&self.gossip, addr)
    }

    fn origins(&self) -> Vec<String> {
        self.gossip.origins()
    }

    fn node_name(&self) -> &str {
        GossipApi::node_name(&self.gossip)
    }

    async fn submit_transaction(&self, tx: Transaction) -> Result<Hash, ControlError> {
        let tx = self.key.sign_transaction(tx);
        Ok(self.ledger.submit_transaction(tx).await?)
    }

    fn ledger_snapshot(&self) -> LedgerSnapshot {
        self.ledger.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{Ed25519Verifier, GossipBroadcaster};
    use parking_lot::Mutex;
    use rc_01_epidemic_gossip::GossipSettings;
    use rc_02_ledger::{LedgerService, LedgerSettings};
    use shared_types::{GossipPacket, ShareTx};

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(GossipPacket, SocketAddr)>>,
    }

    #[async_trait]
    impl PacketSender for RecordingSender {
        async fn send_packet(&self, packet: &GossipPacket, to: SocketAddr) -> Result<(), GossipError> {
            self.sent.lock().push((packet.clone(), to));
            Ok(())
        }
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn control(simple_mode: bool) -> (NodeControl<RecordingSender, Ed25519Verifier>, Arc<RecordingSender>) {
        let sender = Arc::new(RecordingSender::default());
        let settings = GossipSettings {
            simple_mode,
            ..GossipSettings::new("alice", addr(5000))
        };
        let gossip = GossipService::new(settings, Arc::clone(&sender));
        let broadcaster = Arc::new(GossipBroadcaster::new(Arc::new(gossip.clone())));
        let ledger_settings = LedgerSettings {
            difficulty: 1,
            ..LedgerSettings::default()
        };
        let ledger =
            LedgerService::with_verifier(ledger_settings, broadcaster, Arc::new(Ed25519Verifier));
        let key = Arc::new(NodeKey::from_seed("alice", [1u8; 32]));
        (NodeControl::new(gossip, ledger, key), sender)
    }

    #[tokio::test]
    async fn test_publish_creates_rumor() {
        let (control, _) = control(false);
        control.publish("hello".into()).await.unwrap();

        let messages = control.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].origin, "alice");
        assert_eq!(messages[0].id, 1);
    }

    #[tokio::test]
    async fn test_publish_in_simple_mode_floods() {
        let (control, sender) = control(true);
        control.add_peer(addr(5001));
        control.add_peer(addr(5002));

        control.publish("hello".into()).await.unwrap();

        assert!(control.messages().is_empty());
        let simple = sender
            .sent
            .lock()
            .iter()
            .filter(|(p, _)| matches!(p, GossipPacket::Simple(_)))
            .count();
        assert_eq!(simple, 2);
    }

    #[tokio::test]
    async fn test_private_without_route_fails() {
        let (control, _) = control(false);
        let result = control.publish_private("psst".into(), "bob".into()).await;
        assert!(matches!(
            result,
            Err(ControlError::Gossip(GossipError::UnknownRoute(_)))
        ));
    }

    #[tokio::test]
    async fn test_add_peer_ignores_self_and_duplicates() {
        let (control, _) = control(false);
        assert!(!control.add_peer(addr(5000)));
        assert!(control.add_peer(addr(5001)));
        assert!(!control.add_peer(addr(5001)));
        assert_eq!(control.peers(), vec![addr(5001)]);
        assert_eq!(control.node_name(), "alice");
    }

    #[tokio::test]
    async fn test_identity_then_signed_mint_is_pooled() {
        let (control, _) = control(false);
        control.register_identity().await.unwrap();

        let mint = Transaction::new(TxPayload::Share(ShareTx::mint("X", 100, "alice")));
        let result = control.submit_transaction(mint).await;

        // The identity is still pooled, not mined.
        assert!(matches!(
            result,
            Err(ControlError::Ledger(LedgerError::UnknownIdentity(_)))
        ));
        assert_eq!(control.ledger_snapshot().pending_transactions, 1);
    }
}
