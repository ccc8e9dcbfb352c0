//! Prometheus metrics for the resolver.
//!
//! All metrics follow the naming convention: `resolver_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, CounterVec, Encoder, Gauge, Histogram, HistogramVec, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // ORDER METRICS
    // =========================================================================

    /// Orders reaching a lifecycle status
    pub static ref ORDER_TRANSITIONS: CounterVec = CounterVec::new(
        Opts::new("resolver_order_transitions_total", "Orders advanced to a status"),
        &["status"]  // escrow_created/withdraw_completed
    ).expect("metric creation failed");

    /// Orchestration calls by operation and outcome
    pub static ref ORDER_OPERATIONS: CounterVec = CounterVec::new(
        Opts::new("resolver_order_operations_total", "Orchestration calls"),
        &["operation", "outcome"]  // outcome: ok or an error kind
    ).expect("metric creation failed");

    /// Orchestration call duration
    pub static ref ORDER_OPERATION_DURATION: HistogramVec = HistogramVec::new(
        prometheus::HistogramOpts::new(
            "resolver_order_operation_duration_seconds",
            "Time spent in an orchestration call"
        ).buckets(exponential_buckets(0.01, 2.0, 14).expect("bucket layout")),
        &["operation"]
    ).expect("metric creation failed");

    /// Orders currently being processed
    pub static ref ORDERS_IN_FLIGHT: Gauge = Gauge::new(
        "resolver_orders_in_flight",
        "Orchestration calls currently running"
    ).expect("metric creation failed");

    // =========================================================================
    // LEDGER METRICS
    // =========================================================================

    /// Ledger adapter calls
    pub static ref LEDGER_CALLS: CounterVec = CounterVec::new(
        Opts::new("resolver_ledger_calls_total", "Ledger adapter calls"),
        &["chain", "operation", "outcome"]
    ).expect("metric creation failed");

    /// Ledger adapter call duration
    pub static ref LEDGER_CALL_DURATION: HistogramVec = HistogramVec::new(
        prometheus::HistogramOpts::new(
            "resolver_ledger_call_duration_seconds",
            "Time spent in a ledger adapter call"
        ).buckets(exponential_buckets(0.005, 2.0, 16).expect("bucket layout")),
        &["chain", "operation"]
    ).expect("metric creation failed");

    /// Time spent waiting for confirmations
    pub static ref CONFIRMATION_WAIT: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "resolver_confirmation_wait_seconds",
            "Time spent waiting for a transaction to confirm"
        ).buckets(exponential_buckets(0.5, 2.0, 12).expect("bucket layout"))
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry. Safe to call twice.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Orders
        Box::new(ORDER_TRANSITIONS.clone()),
        Box::new(ORDER_OPERATIONS.clone()),
        Box::new(ORDER_OPERATION_DURATION.clone()),
        Box::new(ORDERS_IN_FLIGHT.clone()),
        // Ledgers
        Box::new(LEDGER_CALLS.clone()),
        Box::new(LEDGER_CALL_DURATION.clone()),
        Box::new(CONFIRMATION_WAIT.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
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

/// Holds a gauge incremented until dropped, including when the owning
/// future is cancelled.
pub struct GaugeGuard {
    gauge: Gauge,
}

impl GaugeGuard {
    pub fn new(gauge: &Gauge) -> Self {
        gauge.inc();
        Self {
            gauge: gauge.clone(),
        }
    }
}

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
