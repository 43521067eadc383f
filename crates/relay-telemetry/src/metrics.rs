//! Prometheus metrics for the request/reply relay.
//!
//! All metrics follow the naming convention: `relay_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: exchanges by outcome, reply routing events
//! - **Gauge**: exchanges in flight, live registry entries
//! - **Histogram**: exchange duration

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // EXCHANGE METRICS
    // =========================================================================

    /// Completed exchanges by outcome
    pub static ref EXCHANGES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("relay_exchanges_total", "Completed request/reply exchanges"),
        &["outcome"]  // replied / timed_out / failed
    ).expect("metric creation failed");

    /// Exchanges started and not yet completed
    pub static ref EXCHANGES_IN_FLIGHT: Gauge = Gauge::new(
        "relay_exchanges_in_flight",
        "Exchanges currently awaiting a reply"
    ).expect("metric creation failed");

    /// Exchange duration histogram
    pub static ref EXCHANGE_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "relay_exchange_duration_seconds",
            "Time from publishing a request to its terminal outcome"
        ).buckets(exponential_buckets(0.0005, 2.0, 16).expect("valid buckets"))
    ).expect("metric creation failed");

    // =========================================================================
    // REPLY ROUTING METRICS
    // =========================================================================

    /// Reply routing events
    pub static ref REGISTRY_EVENTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("relay_registry_events_total", "Reply destination registry events"),
        &["event"]  // captured / missing / stale / sent / not_found
    ).expect("metric creation failed");

    /// Reply destinations stored and not yet taken
    pub static ref REGISTRY_ENTRIES: Gauge = Gauge::new(
        "relay_registry_entries",
        "Reply destinations waiting for a reply"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Registering twice is not an error.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(EXCHANGES_TOTAL.clone()),
        Box::new(EXCHANGES_IN_FLIGHT.clone()),
        Box::new(EXCHANGE_DURATION.clone()),
        Box::new(REGISTRY_EVENTS_TOTAL.clone()),
        Box::new(REGISTRY_ENTRIES.clone()),
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
