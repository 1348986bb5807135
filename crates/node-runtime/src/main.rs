//! Rumor-Chain node binary.

use anyhow::{Context, Result};
use clap::Parser;
use node_runtime::{Cli, NodeConfig, NodeRuntime};
use rc_telemetry::{init_telemetry, TelemetryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = NodeConfig::load(&cli).context("Failed to load configuration")?;

    let mut telemetry = TelemetryConfig::from_env();
    telemetry.node_name = config.network.name.clone();
    init_telemetry(&telemetry).context("Failed to initialize telemetry")?;

    let mut runtime = NodeRuntime::bind(config.clone())
        .await
        .with_context(|| format!("Failed to bind {}", config.network.gossip_addr))?;
    runtime.start();
    runtime.register_identity().await;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    let snapshot = runtime.shutdown().await;
    let rendered = serde_json::to_string_pretty(&snapshot)?;
    info!("Final ledger state:\n{}", rendered);
    Ok(())
}
