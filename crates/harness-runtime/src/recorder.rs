//! Prometheus-backed [`MetricsRecorder`].
//!
//! Forwards the correlation core's metric hooks to the process-wide
//! registry in `relay-telemetry`.

use std::time::Duration;

use relay_telemetry::{
    EXCHANGES_IN_FLIGHT, EXCHANGES_TOTAL, EXCHANGE_DURATION, REGISTRY_EVENTS_TOTAL,
};
use sync_reply::{MetricsRecorder, OutcomeKind};

#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusRecorder;

impl PrometheusRecorder {
    pub fn new() -> Self {
        Self
    }

    fn routing_event(&self, event: &str) {
        REGISTRY_EVENTS_TOTAL.with_label_values(&[event]).inc();
    }
}

impl MetricsRecorder for PrometheusRecorder {
    fn record_exchange_started(&self) {
        EXCHANGES_IN_FLIGHT.inc();
    }

    fn record_exchange_completed(&self, outcome: OutcomeKind, duration: Duration) {
        EXCHANGES_IN_FLIGHT.dec();
        EXCHANGES_TOTAL.with_label_values(&[outcome.as_str()]).inc();
        EXCHANGE_DURATION.observe(duration.as_secs_f64());
    }

    fn record_reply_destination_captured(&self) {
        self.routing_event("captured");
    }

    fn record_reply_destination_missing(&self) {
        self.routing_event("missing");
    }

    fn record_stale_reply_destination(&self) {
        self.routing_event("stale");
    }

    fn record_reply_sent(&self) {
        self.routing_event("sent");
    }

    fn record_reply_destination_not_found(&self) {
        self.routing_event("not_found");
    }
}
