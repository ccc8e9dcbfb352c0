//! # Resolver Telemetry
//!
//! Structured logging and Prometheus metrics for the HTLC resolver.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use resolver_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RESOLVER_LOG_LEVEL` | `info` | Log filter (falls back to `RUST_LOG`) |
//! | `RESOLVER_JSON_LOGS` | container-dependent | JSON log lines |
//! | `RESOLVER_SERVICE_NAME` | `htlc-resolver` | Service name in logs |

mod config;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, GaugeGuard, HistogramTimer, CONFIRMATION_WAIT, LEDGER_CALLS,
    LEDGER_CALL_DURATION, ORDERS_IN_FLIGHT, ORDER_OPERATIONS, ORDER_OPERATION_DURATION,
    ORDER_TRANSITIONS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install the global log subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    tracing_setup::init_tracing(config)
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
