//! Datagram codec.
//!
//! Packets are serialized with `bincode`. A datagram never carries more than
//! one packet; anything larger than the configured limit is rejected at
//! encode time so oversized payloads surface as a caller error.

use crate::errors::CodecError;
use crate::packets::GossipPacket;

/// Default upper bound on an encoded packet.
pub const MAX_DATAGRAM_SIZE: usize = 16 * 1024;

/// Encode `packet`, failing if the result exceeds `limit` bytes.
pub fn encode_packet(packet: &GossipPacket, limit: usize) -> Result<Vec<u8>, CodecError> {
    let bytes = bincode::serialize(packet).map_err(|e| CodecError::Encode(e.to_string()))?;
    if bytes.len() > limit {
        return Err(CodecError::PacketTooLarge {
            size: bytes.len(),
            limit,
        });
    }
    Ok(bytes)
}

/// Decode a received datagram.
pub fn decode_packet(bytes: &[u8]) -> Result<GossipPacket, CodecError> {
    bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}
