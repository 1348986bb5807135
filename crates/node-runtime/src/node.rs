//! # Node Assembly
//!
//! Builds the gossip engine, the ledger, the router and the control surface
//! from one [`NodeConfig`], and owns the background tasks.
//!
//! ## Background Tasks
//!
//! | Task | Stops on |
//! |------|----------|
//! | UDP receive loop | shutdown |
//! | anti-entropy (not in simple mode) | shutdown |
//! | route rumors (if enabled) | shutdown |
//! | miner (if enabled) | shutdown |
//! | metrics sampler | shutdown |

use rc_01_epidemic_gossip::{GossipApi, GossipService, PacketSender};
use rc_02_ledger::{
    LedgerApi, LedgerService, LedgerSnapshot, MiningRound, SignatureVerifier,
};
use rc_telemetry::{BLOCKS_MINED, CHAIN_LENGTH, MINING_DURATION, PEERS_KNOWN, POOL_SIZE};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::adapters::{Ed25519Verifier, GossipBroadcaster, NodeKey, UdpTransport};
use crate::config::NodeConfig;
use crate::control::NodeControl;
use crate::router::{NodeLedger, PacketRouter};

const METRICS_SAMPLE_PERIOD: Duration = Duration::from_secs(1);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Every component of one node, over any transport.
pub struct Node<S, V>
where
    S: PacketSender,
    V: SignatureVerifier,
{
    config: NodeConfig,
    gossip: GossipService<S>,
    ledger: NodeLedger<S, V>,
    router: PacketRouter<S, V>,
    control: NodeControl<S, V>,
}

impl<S, V> Node<S, V>
where
    S: PacketSender,
    V: SignatureVerifier,
{
    pub fn new(config: NodeConfig, sender: Arc<S>, verifier: Arc<V>, key: NodeKey) -> Self {
        let gossip = GossipService::new(config.gossip_settings(), sender);
        for peer in &config.network.peers {
            gossip.add_peer(*peer);
        }

        let broadcaster = Arc::new(GossipBroadcaster::new(Arc::new(gossip.clone())));
        let ledger = LedgerService::with_verifier(config.ledger_settings(), broadcaster, verifier);
        let router = PacketRouter::new(gossip.clone(), ledger.clone());
        let control = NodeControl::new(gossip.clone(), ledger.clone(), Arc::new(key));

        Self {
            config,
            gossip,
            ledger,
            router,
            control,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn gossip(&self) -> &GossipService<S> {
        &self.gossip
    }

    pub fn ledger(&self) -> &NodeLedger<S, V> {
        &self.ledger
    }

    pub fn router(&self) -> &PacketRouter<S, V> {
        &self.router
    }

    pub fn control(&self) -> &NodeControl<S, V> {
        &self.control
    }

    /// Spawn every background task except the receive loop.
    pub fn spawn_background(&self, shutdown: &watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        if !self.config.network.simple_mode {
            let gossip = self.gossip.clone();
            let rx = shutdown.clone();
            handles.push(tokio::spawn(async move { gossip.run_anti_entropy(rx).await }));

            let gossip = self.gossip.clone();
            let rx = shutdown.clone();
            handles.push(tokio::spawn(async move { gossip.run_route_rumors(rx).await }));
        }

        let ledger = self.ledger.clone();
        let rx = shutdown.clone();
        handles.push(tokio::spawn(async move {
            ledger.run_miner(rx, record_mining_round).await
        }));

        let gossip = self.gossip.clone();
        let ledger = self.ledger.clone();
        let rx = shutdown.clone();
        handles.push(tokio::spawn(async move {
            sample_metrics(gossip, ledger, rx).await
        }));

        handles
    }
}

fn record_mining_round(round: &MiningRound, elapsed: Duration) {
    MINING_DURATION.observe(elapsed.as_secs_f64());
    if matches!(round, MiningRound::Mined(_)) {
        BLOCKS_MINED.inc();
    }
}

async fn sample_metrics<S, V>(
    gossip: GossipService<S>,
    ledger: NodeLedger<S, V>,
    mut shutdown: watch::Receiver<bool>,
) where
    S: PacketSender,
    V: SignatureVerifier,
{
    let mut ticker = tokio::time::interval(METRICS_SAMPLE_PERIOD);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = ledger.snapshot();
                CHAIN_LENGTH.set(snapshot.chain_length as f64);
                POOL_SIZE.set(snapshot.pending_transactions as f64);
                PEERS_KNOWN.set(gossip.peers().len() as f64);
            }
            _ = shutdown.changed() => return,
        }
    }
}

// =============================================================================
// UDP RUNTIME
// =============================================================================

/// A node bound to a UDP socket, with its tasks.
pub struct NodeRuntime {
    node: Node<UdpTransport, Ed25519Verifier>,
    transport: UdpTransport,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl NodeRuntime {
    /// Bind the gossip socket. The bound address replaces the configured
    /// one, so port 0 works.
    pub async fn bind(mut config: NodeConfig) -> std::io::Result<Self> {
        let transport =
            UdpTransport::bind(config.network.gossip_addr, config.network.max_datagram_size)
                .await?;
        config.network.gossip_addr = transport.local_addr()?;

        let key = NodeKey::generate(config.network.name.clone());
        info!(
            name = %config.network.name,
            addr = %config.network.gossip_addr,
            public_key = %hex::encode(key.public_key()),
            "Node bound"
        );

        let node = Node::new(
            config,
            Arc::new(transport.clone()),
            Arc::new(Ed25519Verifier),
            key,
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            node,
            transport,
            shutdown_tx,
            shutdown_rx,
            tasks: Vec::new(),
        })
    }

    pub fn node(&self) -> &Node<UdpTransport, Ed25519Verifier> {
        &self.node
    }

    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.node.config().network.gossip_addr
    }

    /// Start the receive loop and the background tasks.
    pub fn start(&mut self) {
        let router = self.node.router().clone();
        let socket = self.transport.socket();
        let max_datagram_size = self.transport.max_datagram_size();
        let rx = self.shutdown_rx.clone();
        self.tasks.push(tokio::spawn(async move {
            router.run_receiver(socket, max_datagram_size, rx).await
        }));

        self.tasks.extend(self.node.spawn_background(&self.shutdown_rx));

        let network = &self.node.config().network;
        info!(
            peers = network.peers.len(),
            simple_mode = network.simple_mode,
            mining = self.node.ledger().settings().mining_enabled,
            "Node running"
        );
    }

    /// Submit this node's identity unless running in simple mode.
    pub async fn register_identity(&self) {
        if self.node.config().network.simple_mode {
            return;
        }
        if let Err(e) = self.node.control().register_identity().await {
            warn!(error = %e, "Identity not registered");
        }
    }

    /// Stop every task and return the final ledger view.
    pub async fn shutdown(self) -> LedgerSnapshot {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        for task in self.tasks {
            match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Task failed during shutdown"),
                Err(_) => warn!("Task did not stop within {:?}", SHUTDOWN_GRACE),
            }
        }

        info!("Shutdown complete");
        self.node.ledger().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlSurface;
    use std::net::SocketAddr;

    fn config(name: &str) -> NodeConfig {
        let mut config = NodeConfig::default();
        config.network.name = name.into();
        config.network.gossip_addr = SocketAddr::from(([127, 0, 0, 1], 0));
        config.ledger.mining_enabled = false;
        config.gossip.anti_entropy_period = Duration::from_millis(50);
        config
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_two_nodes_exchange_rumor_over_udp() {
        let mut a = NodeRuntime::bind(config("A")).await.unwrap();
        let mut b_config = config("B");
        b_config.network.peers = vec![a.local_addr()];
        let mut b = NodeRuntime::bind(b_config).await.unwrap();

        a.start();
        b.start();

        b.node().control().publish("hello".into()).await.unwrap();

        wait_for(|| a.node().control().messages().len() == 1).await;
        let message = &a.node().control().messages()[0];
        assert_eq!(message.origin, "B");
        assert_eq!(message.text, "hello");
        assert!(a.node().control().peers().contains(&b.local_addr()));

        a.shutdown().await;
        b.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_returns_snapshot() {
        let mut a = NodeRuntime::bind(config("A")).await.unwrap();
        a.start();
        let snapshot = a.shutdown().await;
        assert_eq!(snapshot.chain_length, 0);
        assert!(snapshot.longest_tip.is_none());
    }
}
