//! # Rumor-Chain Telemetry
//!
//! Structured logging and Prometheus metrics shared by every node binary.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rc_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::for_node("alice");
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RC_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `RC_JSON_LOGS` | `false` | JSON formatted logs |
//! | `RC_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, BLOCKS_HANDLED, BLOCKS_MINED, CHAIN_LENGTH,
    MINING_DURATION, PACKETS_MALFORMED, PACKETS_RECEIVED, PACKETS_SENT, PEERS_KNOWN, POOL_SIZE,
    TRANSACTIONS_HANDLED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics, then install the global subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
