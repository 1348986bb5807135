//! Cross-crate integration flows.

pub mod network;

mod gossip_flows;
mod ledger_flows;
