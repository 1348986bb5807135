//! Error types for the gossip engine.

use shared_types::CodecError;
use std::net::SocketAddr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GossipError>;

/// Gossip errors.
///
/// Everything here is a transport or routing failure: it is logged and the
/// packet dropped, never fatal to the node.
#[derive(Debug, Error)]
pub enum GossipError {
    #[error("Send to {addr} failed: {reason}")]
    SendFailed { addr: SocketAddr, reason: String },

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("No route to destination: {0}")]
    UnknownRoute(String),

    #[error("Hop limit exhausted for destination: {0}")]
    HopLimitExhausted(String),

    #[error("No peers known")]
    NoPeers,

    #[error("Operation not available in simple mode")]
    SimpleMode,
}
