//! Outbound ports (SPI) for the ledger.

use async_trait::async_trait;
use shared_types::{GossipPacket, Hash};
use std::net::SocketAddr;

/// Flooding of ledger packets to the overlay. Implemented in node-runtime
/// on top of the gossip engine.
#[async_trait]
pub trait PeerBroadcaster: Send + Sync + 'static {
    /// Send `packet` to every peer except `except`. Returns the number of
    /// peers reached.
    async fn broadcast(&self, packet: GossipPacket, except: Option<SocketAddr>) -> usize;
}

/// Checks transaction signatures against registered public keys.
pub trait SignatureVerifier: Send + Sync + 'static {
    /// Verify `signature` over `content_hash` with `public_key`.
    fn verify(&self, public_key: &[u8], content_hash: &Hash, signature: &[u8]) -> bool;
}

/// Verifier that trusts every signature; only the claimed signer name is
/// checked. Used by tests and by nodes without key material.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllVerifier;

impl SignatureVerifier for AcceptAllVerifier {
    fn verify(&self, _public_key: &[u8], _content_hash: &Hash, _signature: &[u8]) -> bool {
        true
    }
}
