//! # Error Types
//!
//! Errors shared by every crate that touches the wire format.

use thiserror::Error;

/// Failure to turn a packet into a datagram or back.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload could not be serialized.
    #[error("Encode failed: {0}")]
    Encode(String),

    /// Datagram is not a valid packet.
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Encoded packet does not fit in one datagram.
    #[error("Packet too large: {size} bytes exceeds limit of {limit}")]
    PacketTooLarge { size: usize, limit: usize },
}
