//! # Rumor-Chain Node Runtime
//!
//! Wires the epidemic gossip engine (rc-01) and the proof-of-work ledger
//! (rc-02) to a UDP socket.
//!
//! ## Modular Structure
//!
//! - `config` - layered configuration (defaults, TOML, env, CLI)
//! - `adapters/` - port implementations: UDP transport, ledger flooding,
//!   Ed25519 signatures
//! - `router` - datagram decoding and per-packet dispatch
//! - `control` - client-facing control surface
//! - `node` - assembly, background tasks, shutdown
//!
//! ## Packet Flow
//!
//! ```text
//! UDP ──→ PacketRouter ──→ GossipService ──(rumor/status/private/simple)
//!                               │
//!                               └──(tx/block)──→ LedgerService ──→ miner
//!                                                      │
//!              GossipBroadcaster ←──── flood ──────────┘
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load configuration and initialize telemetry
//! 2. Bind the UDP socket (the only fatal step)
//! 3. Start the receive loop and background tasks
//! 4. Submit this node's identity
//! 5. Run until Ctrl+C, then stop every task

pub mod adapters;
pub mod config;
pub mod control;
pub mod node;
pub mod router;

pub use config::{Cli, ConfigError, NodeConfig};
pub use control::{ControlError, ControlSurface, NodeControl};
pub use node::{Node, NodeRuntime};
pub use router::{NodeLedger, PacketRouter};
