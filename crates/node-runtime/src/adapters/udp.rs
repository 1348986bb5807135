//! UDP datagram transport.

use async_trait::async_trait;
use rc_01_epidemic_gossip::{GossipError, PacketSender};
use rc_telemetry::{metric_inc, PACKETS_SENT};
use shared_types::{encode_packet, GossipPacket};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

/// One bound socket shared by the sender and the receive loop.
#[derive(Clone)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    max_datagram_size: usize,
}

impl UdpTransport {
    pub async fn bind(addr: SocketAddr, max_datagram_size: usize) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            socket: Arc::new(socket),
            max_datagram_size,
        })
    }

    pub fn socket(&self) -> Arc<UdpSocket> {
        Arc::clone(&self.socket)
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn max_datagram_size(&self) -> usize {
        self.max_datagram_size
    }
}

#[async_trait]
impl PacketSender for UdpTransport {
    async fn send_packet(&self, packet: &GossipPacket, to: SocketAddr) -> Result<(), GossipError> {
        let bytes = encode_packet(packet, self.max_datagram_size)?;
        self.socket
            .send_to(&bytes, to)
            .await
            .map_err(|e| GossipError::SendFailed {
                addr: to,
                reason: e.to_string(),
            })?;
        metric_inc!(PACKETS_SENT, &[packet.kind()]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{decode_packet, RumorMessage, MAX_DATAGRAM_SIZE};

    fn localhost() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[tokio::test]
    async fn test_packet_crosses_the_socket() {
        let a = UdpTransport::bind(localhost(), MAX_DATAGRAM_SIZE).await.unwrap();
        let b = UdpTransport::bind(localhost(), MAX_DATAGRAM_SIZE).await.unwrap();
        let packet = GossipPacket::Rumor(RumorMessage::new("A", 1, "hi"));

        a.send_packet(&packet, b.local_addr().unwrap()).await.unwrap();

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let (len, from) = b.socket().recv_from(&mut buf).await.unwrap();
        assert_eq!(from, a.local_addr().unwrap());
        assert_eq!(decode_packet(&buf[..len]).unwrap(), packet);
    }

    #[tokio::test]
    async fn test_oversized_packet_is_codec_error() {
        let a = UdpTransport::bind(localhost(), 32).await.unwrap();
        let packet = GossipPacket::Rumor(RumorMessage::new("A", 1, "x".repeat(100)));

        let result = a.send_packet(&packet, localhost()).await;
        assert!(matches!(result, Err(GossipError::Codec(_))));
    }
}
