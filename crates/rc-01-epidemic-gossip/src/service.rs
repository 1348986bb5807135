//! # Gossip Service
//!
//! Rumor mongering, anti-entropy and hop-limited unicast on top of a
//! best-effort datagram transport.
//!
//! ## Architecture
//!
//! The service implements the inbound [`GossipApi`] and [`Broadcast`] ports
//! and depends on two outbound ports, implemented in node-runtime:
//! - [`PacketSender`]: datagram transport
//! - [`CollaboratorSink`]: file-sharing/search packets addressed to us
//!
//! ## Concurrency
//!
//! The service is a cheap handle: every piece of state sits behind its own
//! `Arc`'d lock so the handle can be cloned into spawned tasks. Each
//! mongering attempt runs on its own task and waits on a oneshot channel
//! registered in the [`AckRegistry`]; the receive path never waits on it.
//! Locks are synchronous and never held across an `.await`.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use shared_types::{
    GossipPacket, PrivateMessage, RumorMessage, SimpleMessage, StatusPacket,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::{
    AckKey, AckOutcome, AckRegistry, DeliveredPrivate, GossipSettings, MessageLog, PeerRegistry,
    RoutingTable, SyncDecision, VectorClock,
};
use crate::error::{GossipError, Result};
use crate::ports::{Broadcast, CollaboratorSink, GossipApi, LoggingCollaborator, PacketSender};

/// Epidemic gossip engine.
///
/// ## Dependencies
///
/// - `S: PacketSender` - datagram transport
/// - `C: CollaboratorSink` - local delivery of collaborator packets
pub struct GossipService<S, C = LoggingCollaborator>
where
    S: PacketSender,
    C: CollaboratorSink,
{
    settings: Arc<GossipSettings>,
    sender: Arc<S>,
    collaborator: Arc<C>,
    peers: Arc<RwLock<PeerRegistry>>,
    clock: Arc<Mutex<VectorClock>>,
    log: Arc<RwLock<MessageLog>>,
    routes: Arc<RwLock<RoutingTable>>,
    acks: Arc<Mutex<AckRegistry>>,
    inbox: Arc<Mutex<Vec<DeliveredPrivate>>>,
}

impl<S, C> Clone for GossipService<S, C>
where
    S: PacketSender,
    C: CollaboratorSink,
{
    fn clone(&self) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
            sender: Arc::clone(&self.sender),
            collaborator: Arc::clone(&self.collaborator),
            peers: Arc::clone(&self.peers),
            clock: Arc::clone(&self.clock),
            log: Arc::clone(&self.log),
            routes: Arc::clone(&self.routes),
            acks: Arc::clone(&self.acks),
            inbox: Arc::clone(&self.inbox),
        }
    }
}

impl<S> GossipService<S, LoggingCollaborator>
where
    S: PacketSender,
{
    /// Service without a file-sharing/search collaborator.
    pub fn new(settings: GossipSettings, sender: Arc<S>) -> Self {
        Self::with_collaborator(settings, sender, Arc::new(LoggingCollaborator))
    }
}

impl<S, C> GossipService<S, C>
where
    S: PacketSender,
    C: CollaboratorSink,
{
    pub fn with_collaborator(settings: GossipSettings, sender: Arc<S>, collaborator: Arc<C>) -> Self {
        Self {
            peers: Arc::new(RwLock::new(PeerRegistry::new(settings.own_addr))),
            settings: Arc::new(settings),
            sender,
            collaborator,
            clock: Arc::new(Mutex::new(VectorClock::new())),
            log: Arc::new(RwLock::new(MessageLog::new())),
            routes: Arc::new(RwLock::new(RoutingTable::new())),
            acks: Arc::new(Mutex::new(AckRegistry::new())),
            inbox: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn settings(&self) -> &GossipSettings {
        &self.settings
    }

    /// Current vector clock snapshot.
    pub fn status(&self) -> StatusPacket {
        self.clock.lock().status()
    }

    pub fn next_id(&self, origin: &str) -> u32 {
        self.clock.lock().next_id(origin)
    }

    pub fn rumor(&self, origin: &str, id: u32) -> Option<RumorMessage> {
        self.log.read().get(origin, id).cloned()
    }

    pub fn next_hop(&self, origin: &str) -> Option<SocketAddr> {
        self.routes.read().next_hop(origin)
    }

    pub fn pending_acks(&self) -> usize {
        self.acks.lock().pending()
    }

    // =========================================================================
    // PACKET DISPATCH
    // =========================================================================

    /// Handle one inbound packet.
    ///
    /// The sender is added to the peer registry. Ledger packets are not
    /// gossip's concern and are handed back to the caller.
    pub async fn handle_packet(&self, packet: GossipPacket, from: SocketAddr) -> Option<GossipPacket> {
        if self.peers.write().add(from) {
            debug!(peer = %from, "Learned new peer");
        }

        match packet {
            GossipPacket::Simple(msg) => {
                self.receive_simple(msg, from).await;
            }
            GossipPacket::Rumor(rumor) => self.receive_rumor(rumor, from).await,
            GossipPacket::Status(status) => self.receive_status(status, from).await,
            GossipPacket::SearchRequest(_) => self.collaborator.deliver(packet, from),
            GossipPacket::Private(_)
            | GossipPacket::DataRequest(_)
            | GossipPacket::DataReply(_)
            | GossipPacket::SearchReply(_) => self.receive_point_to_point(packet, from).await,
            GossipPacket::TxPublish(_) | GossipPacket::BlockPublish(_) => return Some(packet),
        }
        None
    }

    // =========================================================================
    // RUMOR MONGERING
    // =========================================================================

    /// Accept a rumor if it is the next expected one, then always answer
    /// `from` with our status.
    pub async fn receive_rumor(&self, rumor: RumorMessage, from: SocketAddr) {
        let accepted = {
            let mut clock = self.clock.lock();
            if clock.try_accept(&rumor.origin, rumor.id) {
                self.log.write().append(rumor.clone());
                true
            } else {
                false
            }
        };

        if rumor.origin != self.settings.name
            && self.routes.write().observe(&rumor.origin, rumor.id, from)
        {
            debug!(origin = %rumor.origin, next_hop = %from, "DSDV route updated");
        }

        if accepted {
            if rumor.is_route_rumor() {
                debug!(origin = %rumor.origin, id = rumor.id, peer = %from, "Route rumor accepted");
            } else {
                info!(
                    origin = %rumor.origin,
                    id = rumor.id,
                    peer = %from,
                    "RUMOR origin {} from {} ID {} contents {}",
                    rumor.origin,
                    from,
                    rumor.id,
                    rumor.text
                );
            }
            self.start_mongering(rumor, Some(from));
        } else {
            debug!(origin = %rumor.origin, id = rumor.id, "Rumor is not the next expected id, ignored");
        }

        self.send_status(from).await;
    }

    /// Compare a remote status with ours, act on the first difference and
    /// resolve every mongering wait addressed to `from`.
    pub async fn receive_status(&self, status: StatusPacket, from: SocketAddr) {
        let decision = self.clock.lock().compare(&status);

        let outcome = if decision == SyncDecision::InSync {
            AckOutcome::InSync
        } else {
            AckOutcome::Diverged
        };
        self.acks.lock().resolve_peer(from, outcome);

        match decision {
            SyncDecision::RemoteAhead => self.send_status(from).await,
            SyncDecision::LocalAhead { origin, next_id } => {
                let rumor = self.log.read().get(&origin, next_id).cloned();
                match rumor {
                    Some(rumor) => {
                        debug!(origin = %origin, id = next_id, peer = %from, "Pushing missing rumor");
                        self.send(&GossipPacket::Rumor(rumor), from).await;
                    }
                    None => {
                        warn!(origin = %origin, id = next_id, "Vector clock ahead of message log");
                        self.send_status(from).await;
                    }
                }
            }
            SyncDecision::InSync => info!(peer = %from, "IN SYNC WITH {}", from),
        }
    }

    /// Publish `text` as this node's next rumor and start mongering it.
    pub async fn publish_rumor(&self, text: String) -> Result<RumorMessage> {
        if self.settings.simple_mode {
            return Err(GossipError::SimpleMode);
        }

        let rumor = {
            let mut clock = self.clock.lock();
            let id = clock.allocate(&self.settings.name);
            let rumor = RumorMessage::new(self.settings.name.clone(), id, text);
            self.log.write().append(rumor.clone());
            rumor
        };

        self.start_mongering(rumor.clone(), None);
        Ok(rumor)
    }

    fn start_mongering(&self, rumor: RumorMessage, exclude: Option<SocketAddr>) {
        let excluded: Vec<SocketAddr> = exclude.into_iter().collect();
        let Some(peer) = self.peers.read().random_excluding(&excluded) else {
            debug!(origin = %rumor.origin, id = rumor.id, "No peer to monger to");
            return;
        };

        let this = self.clone();
        tokio::spawn(async move { this.monger(rumor, peer).await });
    }

    /// Send `rumor` to `peer` and wait for the outcome; keep going to a new
    /// random peer while the coin says so.
    pub async fn monger(&self, rumor: RumorMessage, mut peer: SocketAddr) {
        let packet = GossipPacket::Rumor(rumor.clone());

        loop {
            let key = AckKey::new(peer, &rumor);
            let (attempt, ack) = self.acks.lock().register(key.clone());

            info!(peer = %peer, origin = %rumor.origin, id = rumor.id, "MONGERING with {}", peer);
            let outcome = if self.send(&packet, peer).await {
                match tokio::time::timeout(self.settings.ack_timeout, ack).await {
                    Ok(Ok(outcome)) => outcome,
                    // Registry dropped the sender without resolving.
                    Ok(Err(_)) => AckOutcome::Superseded,
                    Err(_) => {
                        self.acks.lock().remove(&key, attempt);
                        AckOutcome::TimedOut
                    }
                }
            } else {
                self.acks.lock().remove(&key, attempt);
                AckOutcome::TimedOut
            };

            debug!(peer = %peer, ?outcome, "Mongering wait resolved");
            if !outcome.allows_coin_flip() || !flip_coin(self.settings.continue_probability) {
                return;
            }

            let Some(next) = self.peers.read().random_excluding(&[peer]) else {
                return;
            };
            info!(peer = %next, "FLIPPED COIN sending rumor to {}", next);
            peer = next;
        }
    }

    async fn send_status(&self, to: SocketAddr) {
        let status = GossipPacket::Status(self.status());
        self.send(&status, to).await;
    }

    async fn send(&self, packet: &GossipPacket, to: SocketAddr) -> bool {
        match self.sender.send_packet(packet, to).await {
            Ok(()) => true,
            Err(e) => {
                warn!(kind = packet.kind(), peer = %to, error = %e, "Send failed");
                false
            }
        }
    }

    // =========================================================================
    // ANTI-ENTROPY & ROUTE RUMORS
    // =========================================================================

    /// Send our status to one random peer. Returns the peer, if any.
    pub async fn anti_entropy_tick(&self) -> Option<SocketAddr> {
        let peer = self.peers.read().random_excluding(&[])?;
        debug!(peer = %peer, "Anti-entropy status exchange");
        self.send_status(peer).await;
        Some(peer)
    }

    /// Periodic anti-entropy until `shutdown` flips.
    pub async fn run_anti_entropy(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.settings.anti_entropy_period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.anti_entropy_tick().await;
                }
                _ = shutdown.changed() => {
                    info!("[gossip] Anti-entropy stopped");
                    return;
                }
            }
        }
    }

    /// Publish an empty rumor at startup and every period, so that every
    /// node learns a route to us. No-op when disabled.
    pub async fn run_route_rumors(&self, mut shutdown: watch::Receiver<bool>) {
        let Some(period) = self.settings.route_rumor_period else {
            return;
        };
        if self.settings.simple_mode {
            return;
        }

        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.publish_rumor(String::new()).await {
                        warn!(error = %e, "Route rumor not published");
                    }
                }
                _ = shutdown.changed() => {
                    info!("[gossip] Route rumors stopped");
                    return;
                }
            }
        }
    }

    // =========================================================================
    // POINT-TO-POINT
    // =========================================================================

    /// Send a private message toward `destination` through the routing table.
    pub async fn send_private(&self, text: String, destination: String) -> Result<()> {
        let message = PrivateMessage {
            origin: self.settings.name.clone(),
            id: 0,
            text,
            destination,
            hop_limit: self.settings.private_hop_limit,
            encrypted: false,
            signature: None,
        };

        if message.destination == self.settings.name {
            self.deliver_private(message);
            return Ok(());
        }
        let next_hop = self
            .next_hop(&message.destination)
            .ok_or_else(|| GossipError::UnknownRoute(message.destination.clone()))?;
        self.sender
            .send_packet(&GossipPacket::Private(message), next_hop)
            .await
    }

    /// Deliver locally or forward one hop closer, dropping on exhausted hop
    /// limit or missing route.
    async fn receive_point_to_point(&self, packet: GossipPacket, from: SocketAddr) {
        let Some(destination) = point_to_point_destination(&packet) else {
            return;
        };

        if destination == self.settings.name {
            match packet {
                GossipPacket::Private(message) => self.deliver_private(message),
                other => self.collaborator.deliver(other, from),
            }
            return;
        }

        if let Err(e) = self.forward_point_to_point(packet).await {
            debug!(error = %e, "Point-to-point packet dropped");
        }
    }

    /// Decrement the hop limit and send to the next hop for the destination.
    pub async fn forward_point_to_point(&self, mut packet: GossipPacket) -> Result<()> {
        let (destination, hop_limit) = match &mut packet {
            GossipPacket::Private(p) => (p.destination.clone(), &mut p.hop_limit),
            GossipPacket::DataRequest(d) => (d.destination.clone(), &mut d.hop_limit),
            GossipPacket::DataReply(d) => (d.destination.clone(), &mut d.hop_limit),
            GossipPacket::SearchReply(s) => (s.destination.clone(), &mut s.hop_limit),
            _ => return Ok(()),
        };

        if *hop_limit <= 1 {
            return Err(GossipError::HopLimitExhausted(destination));
        }
        *hop_limit -= 1;

        let next_hop = self
            .next_hop(&destination)
            .ok_or(GossipError::UnknownRoute(destination))?;
        self.sender.send_packet(&packet, next_hop).await
    }

    fn deliver_private(&self, message: PrivateMessage) {
        info!(
            origin = %message.origin,
            hop_limit = message.hop_limit,
            "PRIVATE origin {} hop-limit {} contents {}",
            message.origin,
            message.hop_limit,
            message.text
        );
        self.inbox.lock().push(DeliveredPrivate {
            origin: message.origin,
            text: message.text,
            encrypted: message.encrypted,
        });
    }

    // =========================================================================
    // SIMPLE MODE
    // =========================================================================

    /// Flood `contents` to every peer as a simple message.
    pub async fn publish_simple(&self, contents: String) -> usize {
        let message = SimpleMessage {
            original_name: self.settings.name.clone(),
            relay_addr: self.settings.own_addr.to_string(),
            contents,
        };
        self.broadcast(GossipPacket::Simple(message), None).await
    }

    /// Re-flood to everyone but the relay, with ourselves as the new relay.
    pub async fn receive_simple(&self, mut message: SimpleMessage, from: SocketAddr) -> usize {
        info!(
            origin = %message.original_name,
            relay = %message.relay_addr,
            "SIMPLE MESSAGE origin {} from {} contents {}",
            message.original_name,
            message.relay_addr,
            message.contents
        );
        let relay = message.relay_addr.parse::<SocketAddr>().unwrap_or(from);
        message.relay_addr = self.settings.own_addr.to_string();
        self.broadcast(GossipPacket::Simple(message), Some(relay)).await
    }
}

// =============================================================================
// PORT IMPLEMENTATIONS
// =============================================================================

#[async_trait]
impl<S, C> GossipApi for GossipService<S, C>
where
    S: PacketSender,
    C: CollaboratorSink,
{
    async fn publish(&self, text: String) -> Result<RumorMessage> {
        self.publish_rumor(text).await
    }

    async fn publish_private(&self, text: String, destination: String) -> Result<()> {
        self.send_private(text, destination).await
    }

    fn messages(&self) -> Vec<RumorMessage> {
        self.log.read().chat_messages()
    }

    fn private_messages(&self) -> Vec<DeliveredPrivate> {
        self.inbox.lock().clone()
    }

    fn peers(&self) -> Vec<SocketAddr> {
        self.peers.read().all()
    }

    fn add_peer(&self, addr: SocketAddr) -> bool {
        self.peers.write().add(addr)
    }

    fn origins(&self) -> Vec<String> {
        self.routes.read().origins()
    }

    fn node_name(&self) -> &str {
        &self.settings.name
    }
}

#[async_trait]
impl<S, C> Broadcast for GossipService<S, C>
where
    S: PacketSender,
    C: CollaboratorSink,
{
    async fn broadcast(&self, packet: GossipPacket, except: Option<SocketAddr>) -> usize {
        let targets = self.peers.read().all_except(except);
        let mut delivered = 0;
        for peer in targets {
            if self.send(&packet, peer).await {
                delivered += 1;
            }
        }
        delivered
    }
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn flip_coin(continue_probability: f64) -> bool {
    rand::thread_rng().gen_bool(continue_probability.clamp(0.0, 1.0))
}

fn point_to_point_destination(packet: &GossipPacket) -> Option<String> {
    match packet {
        GossipPacket::Private(p) => Some(p.destination.clone()),
        GossipPacket::DataRequest(d) => Some(d.destination.clone()),
        GossipPacket::DataReply(d) => Some(d.destination.clone()),
        GossipPacket::SearchReply(s) => Some(s.destination.clone()),
        _ => None,
    }
}
