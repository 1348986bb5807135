//! # In-Memory Network
//!
//! Delivers encoded datagrams between nodes through unbounded channels, so
//! whole clusters run inside one test without sockets. Packets go through
//! the real codec and the real [`PacketRouter`](node_runtime::PacketRouter).

use async_trait::async_trait;
use node_runtime::adapters::{Ed25519Verifier, NodeKey};
use node_runtime::{Node, NodeConfig};
use parking_lot::RwLock;
use rc_01_epidemic_gossip::{GossipError, PacketSender};
use shared_types::{encode_packet, GossipPacket, MAX_DATAGRAM_SIZE};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

type Datagram = (Vec<u8>, SocketAddr);

/// Address book of attached endpoints.
#[derive(Default)]
pub struct MemoryNetwork {
    endpoints: RwLock<HashMap<SocketAddr, mpsc::UnboundedSender<Datagram>>>,
}

impl MemoryNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn attach(&self, addr: SocketAddr) -> mpsc::UnboundedReceiver<Datagram> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.endpoints.write().insert(addr, tx);
        rx
    }
}

/// [`PacketSender`] bound to one address of a [`MemoryNetwork`].
pub struct MemoryTransport {
    addr: SocketAddr,
    network: Arc<MemoryNetwork>,
}

impl MemoryTransport {
    pub fn new(addr: SocketAddr, network: Arc<MemoryNetwork>) -> Self {
        Self { addr, network }
    }
}

#[async_trait]
impl PacketSender for MemoryTransport {
    async fn send_packet(&self, packet: &GossipPacket, to: SocketAddr) -> Result<(), GossipError> {
        let bytes = encode_packet(packet, MAX_DATAGRAM_SIZE)?;
        let endpoint = self.network.endpoints.read().get(&to).cloned();
        let endpoint = endpoint.ok_or_else(|| GossipError::SendFailed {
            addr: to,
            reason: "unreachable".into(),
        })?;
        endpoint
            .send((bytes, self.addr))
            .map_err(|_| GossipError::SendFailed {
                addr: to,
                reason: "endpoint closed".into(),
            })
    }
}

pub type TestNode = Node<MemoryTransport, Ed25519Verifier>;

pub fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

/// Fast timings, difficulty 1, mining off.
pub fn node_config(name: &str, port: u16, peers: &[u16]) -> NodeConfig {
    let mut config = NodeConfig::default();
    config.network.name = name.into();
    config.network.gossip_addr = addr(port);
    config.network.peers = peers.iter().copied().map(addr).collect();
    config.gossip.ack_timeout = Duration::from_millis(50);
    config.gossip.anti_entropy_period = Duration::from_millis(50);
    config.ledger.difficulty = 1;
    config.ledger.genesis_wait = Duration::from_millis(20);
    config.ledger.idle_backoff = Duration::from_millis(10);
    config.ledger.mining_enabled = false;
    config
}

/// A set of nodes on one [`MemoryNetwork`], with their tasks.
pub struct TestCluster {
    nodes: Vec<TestNode>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl TestCluster {
    /// Build and start one node per config. Must run inside a runtime.
    pub fn start(configs: Vec<NodeConfig>) -> Self {
        let network = MemoryNetwork::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut nodes = Vec::new();
        let mut tasks = Vec::new();

        for (index, config) in configs.into_iter().enumerate() {
            let own = config.network.gossip_addr;
            let key = NodeKey::from_seed(config.network.name.clone(), [index as u8 + 1; 32]);
            let transport = Arc::new(MemoryTransport::new(own, Arc::clone(&network)));
            let node = Node::new(config, transport, Arc::new(Ed25519Verifier), key);

            let inbox = network.attach(own);
            tasks.push(tokio::spawn(pump(node.router().clone(), inbox, shutdown_rx.clone())));
            tasks.extend(node.spawn_background(&shutdown_rx));
            nodes.push(node);
        }

        Self {
            nodes,
            shutdown_tx,
            tasks,
        }
    }

    pub fn node(&self, index: usize) -> &TestNode {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[TestNode] {
        &self.nodes
    }

    /// Poll `condition` until it holds or `limit` elapses.
    pub async fn wait_until<F>(&self, limit: Duration, condition: F) -> bool
    where
        F: Fn(&Self) -> bool,
    {
        tokio::time::timeout(limit, async {
            while !condition(self) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .is_ok()
    }

    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            let _ = tokio::time::timeout(Duration::from_secs(2), task).await;
        }
    }
}

async fn pump(
    router: node_runtime::PacketRouter<MemoryTransport, Ed25519Verifier>,
    mut inbox: mpsc::UnboundedReceiver<Datagram>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            received = inbox.recv() => match received {
                Some((bytes, from)) => {
                    router.route_datagram(&bytes, from);
                }
                None => return,
            },
            _ = shutdown.changed() => return,
        }
    }
}
