//! # Node Configuration
//!
//! Unified configuration for the gossip engine, the ledger and the runtime.
//!
//! ## Layering
//!
//! Defaults → TOML file (`--config`) → `RC_*` environment variables → CLI
//! flags. Each layer only overrides what it sets. The result is checked by
//! [`NodeConfig::validate`] before anything is started.

use clap::Parser;
use rc_01_epidemic_gossip::GossipSettings;
use rc_02_ledger::{pow::MAX_DIFFICULTY, LedgerSettings};
use serde::Deserialize;
use shared_types::MAX_DATAGRAM_SIZE;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to parse config file: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Command line flags.
#[derive(Debug, Default, Parser)]
#[command(name = "node-runtime", about = "Rumor-Chain gossip and proof-of-work node")]
pub struct Cli {
    /// Node name, used as rumor origin and routing destination
    #[arg(long)]
    pub name: Option<String>,

    /// UDP address to listen on
    #[arg(long)]
    pub gossip_addr: Option<SocketAddr>,

    /// Comma separated initial peers
    #[arg(long, value_delimiter = ',')]
    pub peers: Vec<SocketAddr>,

    /// Flood-all mode: no rumors, no status exchange
    #[arg(long)]
    pub simple: bool,

    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Required leading zero hex digits of block hashes
    #[arg(long)]
    pub difficulty: Option<u32>,

    /// Validate and relay blocks without mining
    #[arg(long)]
    pub no_mining: bool,
}

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    pub network: NetworkConfig,
    pub gossip: GossipConfig,
    pub ledger: LedgerConfig,
}

/// Network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Node name.
    pub name: String,
    /// UDP listening address.
    pub gossip_addr: SocketAddr,
    /// Initial peers.
    pub peers: Vec<SocketAddr>,
    /// Flood-all mode.
    pub simple_mode: bool,
    /// Largest datagram sent or accepted.
    pub max_datagram_size: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "node".to_string(),
            gossip_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            peers: Vec::new(),
            simple_mode: false,
            max_datagram_size: MAX_DATAGRAM_SIZE,
        }
    }
}

/// Gossip timing configuration.
#[derive(Debug, Clone)]
pub struct GossipConfig {
    pub ack_timeout: Duration,
    pub anti_entropy_period: Duration,
    /// Zero disables route rumors.
    pub route_rumor_period: Duration,
    pub continue_probability: f64,
    pub private_hop_limit: u32,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(1),
            anti_entropy_period: Duration::from_secs(2),
            route_rumor_period: Duration::ZERO,
            continue_probability: 0.5,
            private_hop_limit: 10,
        }
    }
}

/// Ledger and miner configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub difficulty: u32,
    pub genesis_wait: Duration,
    pub tx_hop_limit: u32,
    pub block_hop_limit: u32,
    pub idle_backoff: Duration,
    pub mining_enabled: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let defaults = LedgerSettings::default();
        Self {
            difficulty: defaults.difficulty,
            genesis_wait: defaults.genesis_wait,
            tx_hop_limit: defaults.tx_hop_limit,
            block_hop_limit: defaults.block_hop_limit,
            idle_backoff: defaults.idle_backoff,
            mining_enabled: defaults.mining_enabled,
        }
    }
}

// =============================================================================
// FILE LAYER
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    network: FileNetwork,
    gossip: FileGossip,
    ledger: FileLedger,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileNetwork {
    name: Option<String>,
    gossip_addr: Option<SocketAddr>,
    peers: Option<Vec<SocketAddr>>,
    simple_mode: Option<bool>,
    max_datagram_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileGossip {
    ack_timeout_ms: Option<u64>,
    anti_entropy_secs: Option<u64>,
    route_rumor_secs: Option<u64>,
    continue_probability: Option<f64>,
    private_hop_limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileLedger {
    difficulty: Option<u32>,
    genesis_wait_secs: Option<u64>,
    tx_hop_limit: Option<u32>,
    block_hop_limit: Option<u32>,
    idle_backoff_ms: Option<u64>,
    mining_enabled: Option<bool>,
}

impl NodeConfig {
    /// Build the configuration from every layer.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = &cli.config {
            config.apply_file(path)?;
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        self.apply_toml(&text)
    }

    pub fn apply_toml(&mut self, text: &str) -> Result<(), ConfigError> {
        let file: FileConfig = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let network = file.network;
        if let Some(v) = network.name {
            self.network.name = v;
        }
        if let Some(v) = network.gossip_addr {
            self.network.gossip_addr = v;
        }
        if let Some(v) = network.peers {
            self.network.peers = v;
        }
        if let Some(v) = network.simple_mode {
            self.network.simple_mode = v;
        }
        if let Some(v) = network.max_datagram_size {
            self.network.max_datagram_size = v;
        }

        let gossip = file.gossip;
        if let Some(v) = gossip.ack_timeout_ms {
            self.gossip.ack_timeout = Duration::from_millis(v);
        }
        if let Some(v) = gossip.anti_entropy_secs {
            self.gossip.anti_entropy_period = Duration::from_secs(v);
        }
        if let Some(v) = gossip.route_rumor_secs {
            self.gossip.route_rumor_period = Duration::from_secs(v);
        }
        if let Some(v) = gossip.continue_probability {
            self.gossip.continue_probability = v;
        }
        if let Some(v) = gossip.private_hop_limit {
            self.gossip.private_hop_limit = v;
        }

        let ledger = file.ledger;
        if let Some(v) = ledger.difficulty {
            self.ledger.difficulty = v;
        }
        if let Some(v) = ledger.genesis_wait_secs {
            self.ledger.genesis_wait = Duration::from_secs(v);
        }
        if let Some(v) = ledger.tx_hop_limit {
            self.ledger.tx_hop_limit = v;
        }
        if let Some(v) = ledger.block_hop_limit {
            self.ledger.block_hop_limit = v;
        }
        if let Some(v) = ledger.idle_backoff_ms {
            self.ledger.idle_backoff = Duration::from_millis(v);
        }
        if let Some(v) = ledger.mining_enabled {
            self.ledger.mining_enabled = v;
        }
        Ok(())
    }

    /// Apply `RC_*` overrides. `lookup` returns the variable's value if set.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("RC_NAME") {
            self.network.name = v;
        }
        if let Some(v) = lookup("RC_GOSSIP_ADDR") {
            self.network.gossip_addr = parse_value("RC_GOSSIP_ADDR", &v)?;
        }
        if let Some(v) = lookup("RC_PEERS") {
            self.network.peers = parse_peers(&v)?;
        }
        if let Some(v) = lookup("RC_SIMPLE") {
            self.network.simple_mode = parse_value("RC_SIMPLE", &v)?;
        }
        if let Some(v) = lookup("RC_DIFFICULTY") {
            self.ledger.difficulty = parse_value("RC_DIFFICULTY", &v)?;
        }
        if let Some(v) = lookup("RC_GENESIS_WAIT_SECS") {
            self.ledger.genesis_wait = Duration::from_secs(parse_value("RC_GENESIS_WAIT_SECS", &v)?);
        }
        if let Some(v) = lookup("RC_ANTI_ENTROPY_SECS") {
            self.gossip.anti_entropy_period =
                Duration::from_secs(parse_value("RC_ANTI_ENTROPY_SECS", &v)?);
        }
        if let Some(v) = lookup("RC_ROUTE_RUMOR_SECS") {
            self.gossip.route_rumor_period =
                Duration::from_secs(parse_value("RC_ROUTE_RUMOR_SECS", &v)?);
        }
        Ok(())
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(name) = &cli.name {
            self.network.name = name.clone();
        }
        if let Some(addr) = cli.gossip_addr {
            self.network.gossip_addr = addr;
        }
        if !cli.peers.is_empty() {
            self.network.peers = cli.peers.clone();
        }
        if cli.simple {
            self.network.simple_mode = true;
        }
        if let Some(difficulty) = cli.difficulty {
            self.ledger.difficulty = difficulty;
        }
        if cli.no_mining {
            self.ledger.mining_enabled = false;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.name.trim().is_empty() {
            return Err(ConfigError::Invalid("node name must not be empty".into()));
        }
        if self.network.max_datagram_size == 0 {
            return Err(ConfigError::Invalid("max_datagram_size must be positive".into()));
        }
        if self.gossip.ack_timeout.is_zero() || self.gossip.anti_entropy_period.is_zero() {
            return Err(ConfigError::Invalid("gossip timeouts must be positive".into()));
        }
        if self.ledger.idle_backoff.is_zero() {
            return Err(ConfigError::Invalid("idle_backoff must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.gossip.continue_probability) {
            return Err(ConfigError::Invalid(format!(
                "continue_probability {} outside [0, 1]",
                self.gossip.continue_probability
            )));
        }
        if self.ledger.difficulty > MAX_DIFFICULTY {
            return Err(ConfigError::Invalid(format!(
                "difficulty {} exceeds {}",
                self.ledger.difficulty, MAX_DIFFICULTY
            )));
        }
        Ok(())
    }

    pub fn gossip_settings(&self) -> GossipSettings {
        let route_rumor_period = if self.gossip.route_rumor_period.is_zero() {
            None
        } else {
            Some(self.gossip.route_rumor_period)
        };
        GossipSettings {
            name: self.network.name.clone(),
            own_addr: self.network.gossip_addr,
            ack_timeout: self.gossip.ack_timeout,
            anti_entropy_period: self.gossip.anti_entropy_period,
            route_rumor_period,
            continue_probability: self.gossip.continue_probability,
            private_hop_limit: self.gossip.private_hop_limit,
            simple_mode: self.network.simple_mode,
        }
    }

    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            difficulty: self.ledger.difficulty,
            genesis_wait: self.ledger.genesis_wait,
            tx_hop_limit: self.ledger.tx_hop_limit,
            block_hop_limit: self.ledger.block_hop_limit,
            idle_backoff: self.ledger.idle_backoff,
            // Simple mode carries chat only.
            mining_enabled: self.ledger.mining_enabled && !self.network.simple_mode,
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_peers(value: &str) -> Result<Vec<SocketAddr>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_value("RC_PEERS", s))
        .collect()
}
