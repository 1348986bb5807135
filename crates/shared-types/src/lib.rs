//! # Shared Types Crate
//!
//! Domain entities and wire packets shared by the gossip engine, the ledger
//! and the node runtime.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that crosses a crate boundary or
//!   the network is defined here.
//! - **Sum types on the wire**: a packet is one `GossipPacket` variant and a
//!   transaction is one `TxPayload` variant, never several optional fields.

pub mod codec;
pub mod entities;
pub mod errors;
pub mod packets;

pub use codec::{decode_packet, encode_packet, MAX_DATAGRAM_SIZE};
pub use entities::*;
pub use errors::*;
pub use packets::*;
