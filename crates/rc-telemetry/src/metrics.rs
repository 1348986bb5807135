//! Prometheus metrics for Rumor-Chain nodes.
//!
//! All metrics follow the naming convention: `rc_<subsystem>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., blocks_mined_total)
//! - **Gauge**: Value that can go up or down (e.g., pool_size)
//! - **Histogram**: Distribution of values (e.g., mining_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // GOSSIP METRICS (Subsystem 1)
    // =========================================================================

    /// Datagrams received, by packet kind
    pub static ref PACKETS_RECEIVED: CounterVec = CounterVec::new(
        Opts::new("rc_gossip_packets_received_total", "Datagrams received by packet kind"),
        &["kind"]
    ).expect("metric creation failed");

    /// Datagrams sent, by packet kind
    pub static ref PACKETS_SENT: CounterVec = CounterVec::new(
        Opts::new("rc_gossip_packets_sent_total", "Datagrams sent by packet kind"),
        &["kind"]
    ).expect("metric creation failed");

    /// Datagrams that failed to decode
    pub static ref PACKETS_MALFORMED: Counter = Counter::new(
        "rc_gossip_packets_malformed_total",
        "Datagrams dropped because they did not decode"
    ).expect("metric creation failed");

    /// Known neighbors
    pub static ref PEERS_KNOWN: Gauge = Gauge::new(
        "rc_gossip_peers_known",
        "Number of known neighbors"
    ).expect("metric creation failed");

    // =========================================================================
    // LEDGER METRICS (Subsystem 2)
    // =========================================================================

    /// Blocks handled, by outcome (extended/reorganized/forked/duplicate/rejected)
    pub static ref BLOCKS_HANDLED: CounterVec = CounterVec::new(
        Opts::new("rc_ledger_blocks_handled_total", "Received blocks by outcome"),
        &["outcome"]
    ).expect("metric creation failed");

    /// Transactions handled, by outcome (pooled/rejected)
    pub static ref TRANSACTIONS_HANDLED: CounterVec = CounterVec::new(
        Opts::new("rc_ledger_transactions_handled_total", "Received transactions by outcome"),
        &["outcome"]
    ).expect("metric creation failed");

    /// Blocks mined locally
    pub static ref BLOCKS_MINED: Counter = Counter::new(
        "rc_ledger_blocks_mined_total",
        "Total number of blocks mined by this node"
    ).expect("metric creation failed");

    /// Length of the longest chain
    pub static ref CHAIN_LENGTH: Gauge = Gauge::new(
        "rc_ledger_chain_length",
        "Length of the longest chain"
    ).expect("metric creation failed");

    /// Transactions waiting for a block
    pub static ref POOL_SIZE: Gauge = Gauge::new(
        "rc_ledger_pool_transactions_pending",
        "Number of pooled transactions"
    ).expect("metric creation failed");

    /// Mining round duration
    pub static ref MINING_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "rc_ledger_mining_round_duration_seconds",
            "Time spent in one mining round"
        ).buckets(exponential_buckets(0.01, 2.0, 14).expect("valid buckets"))
    ).expect("metric creation failed");
}

/// Register every metric with [`REGISTRY`].
///
/// Fails if called twice.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(PACKETS_RECEIVED.clone()),
        Box::new(PACKETS_SENT.clone()),
        Box::new(PACKETS_MALFORMED.clone()),
        Box::new(PEERS_KNOWN.clone()),
        Box::new(BLOCKS_HANDLED.clone()),
        Box::new(TRANSACTIONS_HANDLED.clone()),
        Box::new(BLOCKS_MINED.clone()),
        Box::new(CHAIN_LENGTH.clone()),
        Box::new(POOL_SIZE.clone()),
        Box::new(MINING_DURATION.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
