//! Synchronous Receiver
//!
//! Blocking receive on a destination that remembers where each received
//! request wants its reply. The reply destination is stored in the shared
//! registry under the request's correlation key, ready for a
//! [`SynchronousReplier`] to take.

use shared_types::{DestinationHandle, Message, MessageSelector, ReplyDestination};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::domain::correlation::{key_for, CorrelationKey, CorrelationKeyStrategy};
use crate::domain::registry::{PutOutcome, ReplyDestinationRegistry};
use crate::error::ExchangeError;
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use crate::ports::{ChannelTransport, DestinationResolver};
use crate::service::replier::SynchronousReplier;

/// Receives requests and records their reply destinations.
pub struct SynchronousReceiver {
    transport: Arc<dyn ChannelTransport>,
    resolver: Arc<dyn DestinationResolver>,
    registry: Arc<ReplyDestinationRegistry>,
    correlator: Option<Arc<dyn CorrelationKeyStrategy>>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl SynchronousReceiver {
    /// Receiver in default-key mode.
    pub fn new(
        transport: Arc<dyn ChannelTransport>,
        resolver: Arc<dyn DestinationResolver>,
        registry: Arc<ReplyDestinationRegistry>,
    ) -> Self {
        Self {
            transport,
            resolver,
            registry,
            correlator: None,
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Derive correlation keys with `strategy` instead of the default key.
    pub fn with_correlator(mut self, strategy: Arc<dyn CorrelationKeyStrategy>) -> Self {
        self.correlator = Some(strategy);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Receive the next message on `destination`.
    pub async fn receive(
        &self,
        destination: &str,
        timeout: Duration,
    ) -> Result<Message, ExchangeError> {
        self.receive_selected(destination, &MessageSelector::Any, timeout)
            .await
    }

    /// Receive the first message on `destination` accepted by `selector`.
    ///
    /// On success the message's reply destination, if any, is stored under
    /// its correlation key before the message is returned. Fails with
    /// `ExchangeError::ReceiveTimeout` when nothing matches in time.
    #[instrument(skip(self, selector), fields(selector = ?selector))]
    pub async fn receive_selected(
        &self,
        destination: &str,
        selector: &MessageSelector,
        timeout: Duration,
    ) -> Result<Message, ExchangeError> {
        let message = self
            .transport
            .receive(destination, selector, timeout)
            .await?;

        debug!(
            destination = destination,
            message_id = %message.id(),
            "Received message"
        );

        self.save_reply_destination(&message);
        Ok(message)
    }

    /// Correlation key this receiver derives for `message`.
    #[must_use]
    pub fn correlation_key(&self, message: &Message) -> CorrelationKey {
        key_for(self.correlator.as_ref(), message)
    }

    /// Replier sharing this receiver's registry and correlation strategy.
    pub fn replier(&self) -> SynchronousReplier {
        let replier = SynchronousReplier::new(self.transport.clone(), self.registry.clone())
            .with_metrics(self.metrics.clone());
        match &self.correlator {
            Some(strategy) => replier.with_correlator(strategy.clone()),
            None => replier,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ReplyDestinationRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn correlator(&self) -> Option<&Arc<dyn CorrelationKeyStrategy>> {
        self.correlator.as_ref()
    }

    fn save_reply_destination(&self, message: &Message) {
        let key = self.correlation_key(message);

        let Some(handle) = self.reply_handle(message) else {
            self.metrics.record_reply_destination_missing();
            return;
        };

        match self.registry.put(key.clone(), handle) {
            PutOutcome::Inserted => self.metrics.record_reply_destination_captured(),
            PutOutcome::Replaced { .. } => {
                self.metrics.record_reply_destination_captured();
                self.metrics.record_stale_reply_destination();
            }
            PutOutcome::Rejected => {
                debug!(key = %key, "Reply destination not stored");
            }
        }
    }

    fn reply_handle(&self, message: &Message) -> Option<DestinationHandle> {
        match message.reply_destination() {
            Some(ReplyDestination::Inline(handle)) => Some(handle),
            Some(ReplyDestination::Named(name)) => match self.resolver.resolve(&name) {
                Ok(handle) => Some(handle),
                Err(err) => {
                    warn!(
                        message_id = %message.id(),
                        reply_to = %name,
                        error = %err,
                        "Unable to resolve reply destination, no reply can be sent"
                    );
                    None
                }
            },
            None => {
                warn!(
                    message_id = %message.id(),
                    "Received message has no reply destination, no reply can be sent"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::BusTransportAdapter;
    use crate::domain::correlation::HeaderCorrelation;
    use crate::metrics::ExchangeMetrics;
    use shared_bus::{ChannelPublisher, InMemoryChannelBus};
    use shared_types::headers;

    struct Fixture {
        bus: Arc<InMemoryChannelBus>,
        registry: Arc<ReplyDestinationRegistry>,
        receiver: SynchronousReceiver,
        metrics: Arc<ExchangeMetrics>,
    }

    fn fixture(correlated: bool) -> Fixture {
        let bus = Arc::new(InMemoryChannelBus::new());
        bus.declare("orders");
        bus.declare("orders.reply");
        let transport = Arc::new(BusTransportAdapter::new(bus.clone()));
        let registry = Arc::new(ReplyDestinationRegistry::new());
        let metrics = Arc::new(ExchangeMetrics::new());

        let mut receiver = SynchronousReceiver::new(transport.clone(), transport, registry.clone())
            .with_metrics(metrics.clone());
        if correlated {
            receiver = receiver.with_correlator(Arc::new(HeaderCorrelation::new(
                headers::CORRELATION_ID,
            )));
        }

        Fixture {
            bus,
            registry,
            receiver,
            metrics,
        }
    }

    #[tokio::test]
    async fn test_receive_captures_inline_destination() {
        let f = fixture(true);
        let request = Message::text("ping")
            .with_header(headers::CORRELATION_ID, "order-42")
            .with_reply_to(ReplyDestination::Inline(DestinationHandle::declared(
                "orders.reply",
            )));
        f.bus.publish("orders", request.clone()).await.unwrap();

        let got = f
            .receiver
            .receive("orders", Duration::from_millis(100))
            .await
            .unwrap();

        assert_eq!(got.id(), request.id());
        assert_eq!(
            f.registry.take_by_key(&CorrelationKey::from("order-42")),
            Some(DestinationHandle::declared("orders.reply"))
        );
        assert_eq!(f.metrics.snapshot().destinations_captured, 1);
    }

    #[tokio::test]
    async fn test_receive_resolves_named_destination() {
        let f = fixture(false);
        let request = Message::text("ping").with_header(headers::REPLY_TO, "orders.reply");
        f.bus.publish("orders", request).await.unwrap();

        f.receiver
            .receive("orders", Duration::from_millis(100))
            .await
            .unwrap();

        assert_eq!(
            f.registry.take_default(),
            Some(DestinationHandle::declared("orders.reply"))
        );
    }

    #[tokio::test]
    async fn test_unresolvable_destination_is_skipped() {
        let f = fixture(false);
        let request = Message::text("ping")
            .with_reply_to(ReplyDestination::Named("does-not-exist".to_string()));
        f.bus.publish("orders", request.clone()).await.unwrap();

        let got = f
            .receiver
            .receive("orders", Duration::from_millis(100))
            .await
            .unwrap();

        assert_eq!(got.id(), request.id());
        assert!(f.registry.is_empty());
        assert_eq!(f.metrics.snapshot().destinations_missing, 1);
    }

    #[tokio::test]
    async fn test_missing_destination_still_returns_message() {
        let f = fixture(true);
        f.bus
            .publish("orders", Message::text("fire-and-forget"))
            .await
            .unwrap();

        let got = f
            .receiver
            .receive("orders", Duration::from_millis(100))
            .await
            .unwrap();

        assert_eq!(got.payload(), "fire-and-forget");
        assert!(f.registry.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_stores_nothing() {
        let f = fixture(false);
        let start = std::time::Instant::now();
        let err = f
            .receiver
            .receive("orders", Duration::from_millis(50))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(f.registry.is_empty());
    }

    #[tokio::test]
    async fn test_selector_leaves_other_messages() {
        let f = fixture(true);
        let reply_to =
            ReplyDestination::Inline(DestinationHandle::declared("orders.reply"));
        f.bus
            .publish(
                "orders",
                Message::text("a")
                    .with_header(headers::CORRELATION_ID, "1")
                    .with_reply_to(reply_to.clone()),
            )
            .await
            .unwrap();
        f.bus
            .publish(
                "orders",
                Message::text("b")
                    .with_header(headers::CORRELATION_ID, "2")
                    .with_reply_to(reply_to),
            )
            .await
            .unwrap();

        let selector = MessageSelector::header(headers::CORRELATION_ID, "2");
        let got = f
            .receiver
            .receive_selected("orders", &selector, Duration::from_millis(100))
            .await
            .unwrap();

        assert_eq!(got.payload(), "b");
        assert_eq!(f.bus.queue_depth("orders"), Some(1));
        assert!(f.registry.contains(&CorrelationKey::from("2")));
        assert!(!f.registry.contains(&CorrelationKey::from("1")));
    }

    #[tokio::test]
    async fn test_duplicate_key_counts_stale_destination() {
        let f = fixture(false);
        for reply in ["R1", "R2"] {
            f.bus.declare(reply);
            f.bus
                .publish(
                    "orders",
                    Message::text("req")
                        .with_reply_to(ReplyDestination::Inline(DestinationHandle::declared(reply))),
                )
                .await
                .unwrap();
            f.receiver
                .receive("orders", Duration::from_millis(100))
                .await
                .unwrap();
        }

        assert_eq!(f.metrics.snapshot().stale_destinations, 1);
        assert_eq!(
            f.registry.take_default(),
            Some(DestinationHandle::declared("R2"))
        );
    }
}
