//! # Relay Wiring
//!
//! Connects the in-memory channel bus to the correlation core.
//!
//! ```text
//! ┌──────────────────────┐     ┌─────────────────────────────┐
//! │  InMemoryChannelBus  │◄────│    BusTransportAdapter      │
//! │  (shared-bus)        │     │  ChannelTransport +         │
//! └──────────────────────┘     │  DestinationResolver        │
//!                              └──────────────┬──────────────┘
//!                                             │
//!                              ┌──────────────▼──────────────┐
//!                              │  RequestReplyOrchestrator   │
//!                              │  receiver / replier share   │
//!                              │  ReplyDestinationRegistry   │
//!                              └─────────────────────────────┘
//! ```

use std::sync::Arc;

use relay_telemetry::REGISTRY_ENTRIES;
use shared_bus::InMemoryChannelBus;
use sync_reply::{
    BusTransportAdapter, ExchangeError, ReplyDestinationRegistry, RequestReplyOrchestrator,
};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::RuntimeConfig;
use crate::recorder::PrometheusRecorder;

/// A bus and an orchestrator wired over it.
pub struct RelayNode {
    bus: Arc<InMemoryChannelBus>,
    orchestrator: RequestReplyOrchestrator,
    request_destination: String,
}

impl RelayNode {
    /// Wire a node from configuration.
    ///
    /// Declares the request destination on a fresh bus.
    pub fn new(config: &RuntimeConfig) -> Result<Self, ExchangeError> {
        let bus = Arc::new(InMemoryChannelBus::new());
        bus.declare(&config.request_destination);

        let transport = Arc::new(BusTransportAdapter::new(bus.clone()));
        let registry = Arc::new(config.exchange.registry());
        let orchestrator = RequestReplyOrchestrator::with_metrics(
            transport.clone(),
            transport,
            registry,
            config.exchange.clone(),
            Arc::new(PrometheusRecorder::new()),
        )?;

        info!(
            request_destination = %config.request_destination,
            "Relay node wired"
        );

        Ok(Self {
            bus,
            orchestrator,
            request_destination: config.request_destination.clone(),
        })
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<InMemoryChannelBus> {
        &self.bus
    }

    #[must_use]
    pub fn orchestrator(&self) -> &RequestReplyOrchestrator {
        &self.orchestrator
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ReplyDestinationRegistry> {
        self.orchestrator.registry()
    }

    #[must_use]
    pub fn request_destination(&self) -> &str {
        &self.request_destination
    }

    /// Start the retention sweeper if a retention window is configured.
    pub fn start_background_tasks(&self) -> Option<JoinHandle<()>> {
        self.orchestrator.spawn_retention_sweeper()
    }

    /// Publish the number of live registry entries to the gauge.
    pub fn report_registry_size(&self) -> usize {
        let live = self.registry().len();
        REGISTRY_ENTRIES.set(live as f64);
        live
    }
}
