//! Synchronous Replier
//!
//! Sends a reply to the destination a [`SynchronousReceiver`] recorded for
//! the original request. Each recorded destination is used at most once.
//!
//! [`SynchronousReceiver`]: crate::service::SynchronousReceiver

use shared_types::{DestinationHandle, Message};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::domain::correlation::{key_for, CorrelationKey, CorrelationKeyStrategy};
use crate::domain::registry::ReplyDestinationRegistry;
use crate::error::ExchangeError;
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use crate::ports::ChannelTransport;

/// Publishes replies to registered reply destinations.
pub struct SynchronousReplier {
    transport: Arc<dyn ChannelTransport>,
    registry: Arc<ReplyDestinationRegistry>,
    correlator: Option<Arc<dyn CorrelationKeyStrategy>>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl SynchronousReplier {
    /// Replier in default-key mode.
    pub fn new(
        transport: Arc<dyn ChannelTransport>,
        registry: Arc<ReplyDestinationRegistry>,
    ) -> Self {
        Self {
            transport,
            registry,
            correlator: None,
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Derive correlation keys with `strategy` instead of the default key.
    ///
    /// Must be the strategy the paired receiver uses.
    pub fn with_correlator(mut self, strategy: Arc<dyn CorrelationKeyStrategy>) -> Self {
        self.correlator = Some(strategy);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Reply to `original_request`.
    ///
    /// The key is derived from the original request, not from the reply.
    /// The reply is stamped with that key when the strategy supports it, so
    /// a requester selecting on the key accepts it.
    ///
    /// Returns the destination the reply was published to.
    pub async fn reply(
        &self,
        original_request: &Message,
        reply: Message,
    ) -> Result<DestinationHandle, ExchangeError> {
        let key = key_for(self.correlator.as_ref(), original_request);
        let reply = match &self.correlator {
            Some(strategy) => strategy.stamp(reply, &key),
            None => reply,
        };
        self.send(key, reply).await
    }

    /// Reply using the default key, for exchanges without correlation.
    pub async fn reply_default(&self, reply: Message) -> Result<DestinationHandle, ExchangeError> {
        self.send(CorrelationKey::default(), reply).await
    }

    async fn send(
        &self,
        key: CorrelationKey,
        reply: Message,
    ) -> Result<DestinationHandle, ExchangeError> {
        let Some(destination) = self.registry.take_by_key(&key) else {
            self.metrics.record_reply_destination_not_found();
            warn!(key = %key, "No reply destination for correlation key");
            return Err(ExchangeError::ReplyDestinationNotFound { key });
        };

        let reply_id = reply.id();
        if let Err(err) = self.transport.publish(destination.name(), reply).await {
            error!(
                key = %key,
                destination = %destination,
                error = %err,
                "Failed to publish reply"
            );
            return Err(err.into());
        }

        self.metrics.record_reply_sent();
        debug!(
            key = %key,
            destination = %destination,
            reply_id = %reply_id,
            "Reply sent"
        );
        Ok(destination)
    }
}
