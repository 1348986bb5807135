//! Value objects for the gossip engine configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Gossip engine configuration.
#[derive(Clone, Debug)]
pub struct GossipSettings {
    /// This node's display name, used as rumor origin.
    pub name: String,
    /// Address this node listens on (never added as a peer).
    pub own_addr: SocketAddr,
    /// How long a mongering attempt waits for a status from the peer.
    pub ack_timeout: Duration,
    /// Period of unconditional status exchange.
    pub anti_entropy_period: Duration,
    /// Period of route rumor emission. `None` disables it.
    pub route_rumor_period: Option<Duration>,
    /// Probability of continuing to monger after the coin flip.
    pub continue_probability: f64,
    /// Hop limit for private messages created here.
    pub private_hop_limit: u32,
    /// Flood-all mode: no rumors, no status.
    pub simple_mode: bool,
}

impl GossipSettings {
    pub fn new(name: impl Into<String>, own_addr: SocketAddr) -> Self {
        Self {
            name: name.into(),
            own_addr,
            ..Self::default()
        }
    }
}

impl Default for GossipSettings {
    fn default() -> Self {
        Self {
            name: "node".to_string(),
            own_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            ack_timeout: Duration::from_secs(1),
            anti_entropy_period: Duration::from_secs(2),
            route_rumor_period: None,
            continue_probability: 0.5,
            private_hop_limit: 10,
            simple_mode: false,
        }
    }
}

/// A private message delivered to this node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveredPrivate {
    pub origin: String,
    pub text: String,
    pub encrypted: bool,
}
