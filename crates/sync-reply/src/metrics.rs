//! Metrics hooks for exchanges and reply routing
//!
//! ## Usage
//!
//! ```ignore
//! use sync_reply::metrics::{ExchangeMetrics, MetricsRecorder};
//! use sync_reply::domain::OutcomeKind;
//!
//! let metrics = ExchangeMetrics::new();
//! metrics.record_exchange_started();
//! metrics.record_exchange_completed(OutcomeKind::Replied, elapsed);
//! ```

use crate::domain::exchange::OutcomeKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Trait for custom metrics recording implementations
///
/// Implement this trait to integrate with an external metrics system.
pub trait MetricsRecorder: Send + Sync {
    /// An orchestrated exchange began
    fn record_exchange_started(&self);

    /// An orchestrated exchange reached a terminal state
    fn record_exchange_completed(&self, outcome: OutcomeKind, duration: Duration);

    /// A receiver stored a reply destination
    fn record_reply_destination_captured(&self);

    /// A received request carried no usable reply destination
    fn record_reply_destination_missing(&self);

    /// A stored reply destination was displaced by a newer one
    fn record_stale_reply_destination(&self);

    /// A reply was published
    fn record_reply_sent(&self);

    /// A replier found no destination for its key
    fn record_reply_destination_not_found(&self);
}

/// Metrics collector for exchanges
///
/// Thread-safe counters for monitoring reply routing.
#[derive(Debug, Default)]
pub struct ExchangeMetrics {
    pub exchanges_started: AtomicU64,
    pub exchanges_replied: AtomicU64,
    pub exchanges_timed_out: AtomicU64,
    pub exchanges_failed: AtomicU64,
    /// Cumulative exchange time in microseconds
    pub exchange_time_us: AtomicU64,
    pub destinations_captured: AtomicU64,
    pub destinations_missing: AtomicU64,
    pub stale_destinations: AtomicU64,
    pub replies_sent: AtomicU64,
    pub destinations_not_found: AtomicU64,
}

impl ExchangeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Average duration of completed exchanges
    pub fn avg_exchange_time(&self) -> Duration {
        let completed = self.exchanges_replied.load(Ordering::Relaxed)
            + self.exchanges_timed_out.load(Ordering::Relaxed)
            + self.exchanges_failed.load(Ordering::Relaxed);
        if completed == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(self.exchange_time_us.load(Ordering::Relaxed) / completed)
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            exchanges_started: self.exchanges_started.load(Ordering::Relaxed),
            exchanges_replied: self.exchanges_replied.load(Ordering::Relaxed),
            exchanges_timed_out: self.exchanges_timed_out.load(Ordering::Relaxed),
            exchanges_failed: self.exchanges_failed.load(Ordering::Relaxed),
            avg_exchange_time: self.avg_exchange_time(),
            destinations_captured: self.destinations_captured.load(Ordering::Relaxed),
            destinations_missing: self.destinations_missing.load(Ordering::Relaxed),
            stale_destinations: self.stale_destinations.load(Ordering::Relaxed),
            replies_sent: self.replies_sent.load(Ordering::Relaxed),
            destinations_not_found: self.destinations_not_found.load(Ordering::Relaxed),
        }
    }
}

impl MetricsRecorder for ExchangeMetrics {
    fn record_exchange_started(&self) {
        self.exchanges_started.fetch_add(1, Ordering::Relaxed);
    }

    fn record_exchange_completed(&self, outcome: OutcomeKind, duration: Duration) {
        let counter = match outcome {
            OutcomeKind::Replied => &self.exchanges_replied,
            OutcomeKind::TimedOut => &self.exchanges_timed_out,
            OutcomeKind::Failed => &self.exchanges_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.exchange_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    fn record_reply_destination_captured(&self) {
        self.destinations_captured.fetch_add(1, Ordering::Relaxed);
    }

    fn record_reply_destination_missing(&self) {
        self.destinations_missing.fetch_add(1, Ordering::Relaxed);
    }

    fn record_stale_reply_destination(&self) {
        self.stale_destinations.fetch_add(1, Ordering::Relaxed);
    }

    fn record_reply_sent(&self) {
        self.replies_sent.fetch_add(1, Ordering::Relaxed);
    }

    fn record_reply_destination_not_found(&self) {
        self.destinations_not_found.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub exchanges_started: u64,
    pub exchanges_replied: u64,
    pub exchanges_timed_out: u64,
    pub exchanges_failed: u64,
    pub avg_exchange_time: Duration,
    pub destinations_captured: u64,
    pub destinations_missing: u64,
    pub stale_destinations: u64,
    pub replies_sent: u64,
    pub destinations_not_found: u64,
}

/// No-op metrics recorder for when metrics are disabled
#[derive(Debug, Default)]
pub struct NoOpMetrics;

impl MetricsRecorder for NoOpMetrics {
    fn record_exchange_started(&self) {}
    fn record_exchange_completed(&self, _outcome: OutcomeKind, _duration: Duration) {}
    fn record_reply_destination_captured(&self) {}
    fn record_reply_destination_missing(&self) {}
    fn record_stale_reply_destination(&self) {}
    fn record_reply_sent(&self) {}
    fn record_reply_destination_not_found(&self) {}
}
