//! # Epidemic Gossip Subsystem (rc-01)
//!
//! Disseminates per-origin sequenced rumors across an unstructured overlay
//! and keeps every node's vector clock converging.
//!
//! ## Architecture Role
//!
//! ```text
//!  [client] ──publish──→ [Gossip (1)] ──rumor──→ random peer
//!                             │  ↑                   │
//!                             │  └──── status ───────┘  (ack / reconcile)
//!                             │
//!                             ├── every 2s: status → random peer (anti-entropy)
//!                             ├── private/data: hop-limited unicast via routing table
//!                             └── tx/block packets handed to [Ledger (2)]
//! ```
//!
//! ## Protocol Summary
//!
//! - A rumor is accepted iff its id equals the local `next_id` for its origin.
//! - Every received rumor is answered with our status, which doubles as the
//!   acknowledgement for mongering.
//! - A mongering attempt ends on a diverging status (reconciliation takes
//!   over) or, after an in-sync status or a timeout, continues to a new
//!   random peer with the configured probability.

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::*;
pub use error::{GossipError, Result};
pub use ports::{Broadcast, CollaboratorSink, GossipApi, LoggingCollaborator, PacketSender};
pub use service::GossipService;
