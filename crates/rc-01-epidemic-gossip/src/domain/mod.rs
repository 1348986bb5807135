//! # Domain Layer for Epidemic Gossip
//!
//! Pure state with no I/O. The service layer owns one lock per structure.
//!
//! ## Contents
//!
//! - **peers**: `PeerRegistry`, the neighbor set
//! - **vector_clock**: `VectorClock` and the three-way `SyncDecision`
//! - **message_log**: `MessageLog`, accepted rumors per origin
//! - **routing**: `RoutingTable`, origin -> next hop
//! - **acks**: `AckRegistry`, outstanding mongering waits
//! - **value_objects**: `GossipSettings`
//!
//! ## Lock Order
//!
//! Vector Clock → Message Log → Routing Table. The ack registry and peer
//! registry are leaf locks and are never held while taking another lock.

mod acks;
mod message_log;
mod peers;
mod routing;
mod value_objects;
mod vector_clock;

pub use acks::*;
pub use message_log::*;
pub use peers::*;
pub use routing::*;
pub use value_objects::*;
pub use vector_clock::*;
