//! Test fixtures shared by the integration flows.

use std::sync::Arc;

use shared_bus::InMemoryChannelBus;
use shared_types::headers;
use sync_reply::{
    BusTransportAdapter, CorrelationMode, ExchangeConfig, ExchangeMetrics,
    ReplyDestinationRegistry, RequestReplyOrchestrator,
};

/// Destination the responder serves.
pub const REQUESTS: &str = "orders";

/// A bus with one declared request destination and an orchestrator over it.
pub struct Relay {
    pub bus: Arc<InMemoryChannelBus>,
    pub transport: Arc<BusTransportAdapter>,
    pub registry: Arc<ReplyDestinationRegistry>,
    pub orchestrator: Arc<RequestReplyOrchestrator>,
    pub metrics: Arc<ExchangeMetrics>,
}

impl Relay {
    pub fn new(config: ExchangeConfig) -> Self {
        let bus = Arc::new(InMemoryChannelBus::new());
        bus.declare(REQUESTS);
        let transport = Arc::new(BusTransportAdapter::new(bus.clone()));
        let registry = Arc::new(config.registry());
        Self::over(bus, transport, registry, config)
    }

    /// Another orchestrator on the same bus with its own registry.
    pub fn peer(&self, config: ExchangeConfig) -> Self {
        let registry = Arc::new(config.registry());
        Self::over(self.bus.clone(), self.transport.clone(), registry, config)
    }

    fn over(
        bus: Arc<InMemoryChannelBus>,
        transport: Arc<BusTransportAdapter>,
        registry: Arc<ReplyDestinationRegistry>,
        config: ExchangeConfig,
    ) -> Self {
        let metrics = Arc::new(ExchangeMetrics::new());
        let orchestrator = RequestReplyOrchestrator::with_metrics(
            transport.clone(),
            transport.clone(),
            registry.clone(),
            config,
            metrics.clone(),
        )
        .expect("valid exchange config");

        Self {
            bus,
            transport,
            registry,
            orchestrator: Arc::new(orchestrator),
            metrics,
        }
    }
}

/// Default-key configuration.
pub fn default_key_config() -> ExchangeConfig {
    ExchangeConfig::default()
}

/// Configuration correlating on the `correlation-id` header.
pub fn header_config() -> ExchangeConfig {
    ExchangeConfig {
        correlation: CorrelationMode::Header {
            name: headers::CORRELATION_ID.to_string(),
        },
        ..ExchangeConfig::default()
    }
}
