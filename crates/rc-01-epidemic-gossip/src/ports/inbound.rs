//! Inbound ports (API) for the gossip engine.

use async_trait::async_trait;
use shared_types::{GossipPacket, RumorMessage};
use std::net::SocketAddr;

use crate::domain::DeliveredPrivate;
use crate::error::Result;

/// Client-facing operations of the gossip engine.
#[async_trait]
pub trait GossipApi: Send + Sync {
    /// Publish `text` as the next rumor from this node.
    async fn publish(&self, text: String) -> Result<RumorMessage>;

    /// Send `text` hop by hop to `destination`.
    async fn publish_private(&self, text: String, destination: String) -> Result<()>;

    /// Accepted chat rumors, route rumors excluded.
    fn messages(&self) -> Vec<RumorMessage>;

    /// Private messages addressed to this node.
    fn private_messages(&self) -> Vec<DeliveredPrivate>;

    fn peers(&self) -> Vec<SocketAddr>;

    /// Returns `true` if the peer was new.
    fn add_peer(&self, addr: SocketAddr) -> bool;

    /// Destinations reachable through the routing table.
    fn origins(&self) -> Vec<String>;

    fn node_name(&self) -> &str;
}

/// Flooding primitive used by layers built on top of gossip.
#[async_trait]
pub trait Broadcast: Send + Sync {
    /// Send `packet` to every known peer except `except`. Returns the number
    /// of peers the packet was handed to.
    async fn broadcast(&self, packet: GossipPacket, except: Option<SocketAddr>) -> usize;
}
