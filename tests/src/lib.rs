//! # Rumor-Chain Test Suite
//!
//! Unified test crate for flows that cross crate boundaries.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── ledger_benchmarks.rs   # PoW search, block validation
//! └── src/integration/
//!     ├── network.rs             # in-memory datagram network + cluster harness
//!     ├── gossip_flows.rs        # convergence, routing
//!     └── ledger_flows.rs        # fork choice, conservation, double-spend
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p rc-tests
//! cargo test -p rc-tests integration::ledger_flows::
//! cargo bench -p rc-tests
//! ```

pub mod integration;
