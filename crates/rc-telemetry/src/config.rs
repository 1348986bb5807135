//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Node name attached to every log line.
    pub node_name: String,

    /// Log level filter (trace, debug, info, warn, error, or a full
    /// `EnvFilter` directive).
    pub log_level: String,

    /// Whether to write logs to stdout at all.
    pub console_output: bool,

    /// Whether logs are JSON formatted.
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            node_name: "node".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RC_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `RC_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `RC_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            node_name: env::var("RC_NAME").unwrap_or_else(|_| "node".to_string()),

            log_level: env::var("RC_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("RC_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),

            json_logs: env::var("RC_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(is_container),
        }
    }

    /// Same as [`from_env`](Self::from_env) with the node name fixed.
    pub fn for_node(node_name: &str) -> Self {
        let mut config = Self::from_env();
        config.node_name = node_name.to_string();
        config
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
