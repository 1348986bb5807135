//! # Wire Packets
//!
//! Everything exchanged between nodes travels as one `GossipPacket`. The
//! enum makes "exactly one kind per datagram" a property of the type.
//!
//! ```text
//! ┌──────────────┬──────────────────────────────────────────────┐
//! │ Simple       │ flood-all debug mode                          │
//! │ Rumor        │ per-origin sequenced gossip                   │
//! │ Status       │ vector clock snapshot (anti-entropy / ack)    │
//! │ Private      │ hop-limited unicast via the routing table     │
//! │ Data*        │ file-sharing collaborator, unicast            │
//! │ Search*      │ search collaborator                           │
//! │ TxPublish    │ ledger transaction flood                      │
//! │ BlockPublish │ ledger block flood                            │
//! └──────────────┴──────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::entities::{Block, Hash, Transaction, TxSignature};

/// Flood-all message used in simple mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleMessage {
    pub original_name: String,
    pub relay_addr: String,
    pub contents: String,
}

/// A sequenced gossip message. Empty `text` marks a route-only rumor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RumorMessage {
    pub origin: String,
    pub id: u32,
    pub text: String,
}

impl RumorMessage {
    pub fn new(origin: impl Into<String>, id: u32, text: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            id,
            text: text.into(),
        }
    }

    pub fn is_route_rumor(&self) -> bool {
        self.text.is_empty()
    }
}

/// One vector clock entry: the next id expected from `identifier`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerStatus {
    pub identifier: String,
    pub next_id: u32,
}

/// Full vector clock snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPacket {
    pub want: Vec<PeerStatus>,
}

impl StatusPacket {
    /// Next id this status expects from `origin`, if the origin is listed.
    pub fn next_id_for(&self, origin: &str) -> Option<u32> {
        self.want
            .iter()
            .find(|s| s.identifier == origin)
            .map(|s| s.next_id)
    }
}

/// Point-to-point message routed hop by hop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateMessage {
    pub origin: String,
    pub id: u32,
    pub text: String,
    pub destination: String,
    pub hop_limit: u32,
    pub encrypted: bool,
    pub signature: Option<TxSignature>,
}

/// Chunk request for the file-sharing collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRequest {
    pub origin: String,
    pub destination: String,
    pub hop_limit: u32,
    pub hash_value: Hash,
}

/// Chunk reply for the file-sharing collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataReply {
    pub origin: String,
    pub destination: String,
    pub hop_limit: u32,
    pub hash_value: Hash,
    pub data: Vec<u8>,
}

/// Budget-limited keyword search, handled by the search collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub origin: String,
    pub budget: u64,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub file_name: String,
    pub metafile_hash: Vec<u8>,
    pub chunk_map: Vec<u64>,
    pub chunk_count: u64,
}

/// Search results routed back to the searching node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchReply {
    pub origin: String,
    pub destination: String,
    pub hop_limit: u32,
    pub results: Vec<SearchResult>,
}

/// Transaction flooded to every peer with a hop limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPublish {
    pub transaction: Transaction,
    pub hop_limit: u32,
}

/// Block flooded to every peer with a hop limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPublish {
    pub block: Block,
    pub hop_limit: u32,
}

/// The datagram payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GossipPacket {
    Simple(SimpleMessage),
    Rumor(RumorMessage),
    Status(StatusPacket),
    Private(PrivateMessage),
    DataRequest(DataRequest),
    DataReply(DataReply),
    SearchRequest(SearchRequest),
    SearchReply(SearchReply),
    TxPublish(TxPublish),
    BlockPublish(BlockPublish),
}

impl GossipPacket {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GossipPacket::Simple(_) => "simple",
            GossipPacket::Rumor(_) => "rumor",
            GossipPacket::Status(_) => "status",
            GossipPacket::Private(_) => "private",
            GossipPacket::DataRequest(_) => "data-request",
            GossipPacket::DataReply(_) => "data-reply",
            GossipPacket::SearchRequest(_) => "search-request",
            GossipPacket::SearchReply(_) => "search-reply",
            GossipPacket::TxPublish(_) => "tx-publish",
            GossipPacket::BlockPublish(_) => "block-publish",
        }
    }
}
