//! # Adapter Implementations
//!
//! Concrete implementations of the outbound ports of the gossip engine and
//! the ledger.
//!
//! ```text
//! GossipService ──PacketSender──→ UdpTransport ──→ socket
//! LedgerService ──PeerBroadcaster──→ GossipBroadcaster ──→ GossipService
//! LedgerService ──SignatureVerifier──→ Ed25519Verifier
//! ```

pub mod broadcast;
pub mod signature;
pub mod udp;

pub use broadcast::*;
pub use signature::*;
pub use udp::*;
