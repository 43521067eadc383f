//! Request/Reply Orchestrator
//!
//! Runs one exchange as a single blocking call:
//!
//! 1. Make sure the request names a reply destination, opening a temporary
//!    one when it does not
//! 2. Derive the correlation key and publish the request
//! 3. Wait on the reply destination for a message with the same key
//! 4. Report `Replied`, `TimedOut` or `Failed`
//!
//! An exchange that does not end in `Replied` discards its registry entry,
//! and a temporary reply destination is always closed.

use async_trait::async_trait;
use shared_types::{DestinationHandle, Message, MessageSelector, ReplyDestination};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::config::ExchangeConfig;
use crate::domain::correlation::{CorrelationKey, CorrelationKeyStrategy};
use crate::domain::exchange::{Exchange, ExchangeOutcome, ExchangeReport};
use crate::domain::registry::{retention_sweeper, ReplyDestinationRegistry};
use crate::error::ExchangeError;
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use crate::ports::{ChannelTransport, DestinationResolver, RequestReplyApi};
use crate::service::receiver::SynchronousReceiver;
use crate::service::replier::SynchronousReplier;

/// Reply destination settled for one exchange.
struct ReplyRoute {
    request: Message,
    handle: DestinationHandle,
    temporary: bool,
}

/// Composes receiver, replier and transport into request/reply exchanges.
pub struct RequestReplyOrchestrator {
    transport: Arc<dyn ChannelTransport>,
    resolver: Arc<dyn DestinationResolver>,
    registry: Arc<ReplyDestinationRegistry>,
    correlator: Arc<dyn CorrelationKeyStrategy>,
    receiver: SynchronousReceiver,
    replier: SynchronousReplier,
    config: ExchangeConfig,
    metrics: Arc<dyn MetricsRecorder>,
}

impl RequestReplyOrchestrator {
    /// Create an orchestrator without metrics.
    pub fn new(
        transport: Arc<dyn ChannelTransport>,
        resolver: Arc<dyn DestinationResolver>,
        registry: Arc<ReplyDestinationRegistry>,
        config: ExchangeConfig,
    ) -> Result<Self, ExchangeError> {
        Self::with_metrics(transport, resolver, registry, config, Arc::new(NoOpMetrics))
    }

    /// Create an orchestrator reporting to `metrics`.
    ///
    /// # Errors
    ///
    /// `ExchangeError::InvalidConfig` if the configuration does not validate.
    pub fn with_metrics(
        transport: Arc<dyn ChannelTransport>,
        resolver: Arc<dyn DestinationResolver>,
        registry: Arc<ReplyDestinationRegistry>,
        config: ExchangeConfig,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Result<Self, ExchangeError> {
        config.validate()?;
        let correlator = config.correlation.build_strategy()?;

        let receiver =
            SynchronousReceiver::new(transport.clone(), resolver.clone(), registry.clone())
                .with_correlator(correlator.clone())
                .with_metrics(metrics.clone());
        let replier = receiver.replier();

        info!(
            correlation = correlator.name(),
            timeout_ms = config.timeout.as_millis(),
            duplicate_policy = ?config.duplicate_policy,
            "Request/reply orchestrator ready"
        );

        Ok(Self {
            transport,
            resolver,
            registry,
            correlator,
            receiver,
            replier,
            config,
            metrics,
        })
    }

    /// Run an exchange with an explicit deadline instead of the configured one.
    #[instrument(skip(self, request), fields(request_id = %request.id()))]
    pub async fn send_and_receive_within(
        &self,
        destination: &str,
        request: Message,
        timeout: Duration,
    ) -> ExchangeReport {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut exchange = Exchange::new();
        self.metrics.record_exchange_started();

        let key = self.correlator.derive_key(&request);

        let (result, route) = match self.reply_route(request).await {
            Ok(route) => {
                let result = self
                    .run(&mut exchange, destination, &key, &route, deadline)
                    .await;
                (result, Some(route))
            }
            Err(err) => (Err(err), None),
        };

        let outcome = settle(&mut exchange, result, started);

        // Only a published request can have left an entry behind
        if !outcome.is_replied() {
            if let Some(recorded) = exchange.key() {
                if self.registry.discard(recorded) {
                    debug!(key = %recorded, "Cleared reply destination of unfinished exchange");
                }
            }
        }

        if let Some(route) = &route {
            if route.temporary {
                self.transport.close_temporary(&route.handle).await;
            }
        }

        let elapsed = started.elapsed();
        self.metrics.record_exchange_completed(outcome.kind(), elapsed);
        log_outcome(&exchange, &key, &outcome, elapsed);

        ExchangeReport {
            exchange_id: exchange.id(),
            key,
            reply_destination: route.map(|r| r.handle.name().to_string()),
            outcome,
            elapsed,
        }
    }

    /// Spawn the retention sweeper when a retention window is configured.
    pub fn spawn_retention_sweeper(&self) -> Option<JoinHandle<()>> {
        self.registry.retention()?;
        Some(tokio::spawn(retention_sweeper(
            self.registry.clone(),
            self.config.sweep_interval,
        )))
    }

    #[must_use]
    pub fn receiver(&self) -> &SynchronousReceiver {
        &self.receiver
    }

    #[must_use]
    pub fn replier(&self) -> &SynchronousReplier {
        &self.replier
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ReplyDestinationRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    async fn reply_route(&self, request: Message) -> Result<ReplyRoute, ExchangeError> {
        match request.reply_destination() {
            Some(ReplyDestination::Inline(handle)) => Ok(ReplyRoute {
                request,
                handle,
                temporary: false,
            }),
            Some(ReplyDestination::Named(name)) => {
                let handle = self.resolver.resolve(&name)?;
                Ok(ReplyRoute {
                    request,
                    handle,
                    temporary: false,
                })
            }
            None => {
                let handle = self.transport.open_temporary().await?;
                debug!(destination = %handle, "Opened temporary reply destination");
                Ok(ReplyRoute {
                    request: request.with_reply_to(ReplyDestination::Inline(handle.clone())),
                    handle,
                    temporary: true,
                })
            }
        }
    }

    async fn run(
        &self,
        exchange: &mut Exchange,
        destination: &str,
        key: &CorrelationKey,
        route: &ReplyRoute,
        deadline: Instant,
    ) -> Result<Message, ExchangeError> {
        self.transport
            .publish(destination, route.request.clone())
            .await?;
        exchange.mark_sent(key.clone())?;
        exchange.mark_awaiting()?;

        debug!(
            exchange_id = %exchange.id(),
            key = %key,
            destination = destination,
            reply_to = %route.handle,
            "Request sent, awaiting reply"
        );

        // Replies are not requests: nothing is captured on this leg
        let remaining = deadline.saturating_duration_since(Instant::now());
        let reply = self
            .transport
            .receive(route.handle.name(), &self.reply_selector(key), remaining)
            .await?;

        debug!(
            exchange_id = %exchange.id(),
            key = %key,
            reply_id = %reply.id(),
            "Reply received"
        );
        Ok(reply)
    }

    fn reply_selector(&self, key: &CorrelationKey) -> MessageSelector {
        if key.is_default() {
            return MessageSelector::Any;
        }
        let correlator = self.correlator.clone();
        let key = key.clone();
        MessageSelector::predicate(move |message| correlator.derive_key(message) == key)
    }
}

#[async_trait]
impl RequestReplyApi for RequestReplyOrchestrator {
    async fn send_and_receive(&self, destination: &str, request: Message) -> ExchangeReport {
        self.send_and_receive_within(destination, request, self.config.timeout)
            .await
    }

    async fn receive_and_reply<F>(
        &self,
        destination: &str,
        selector: &MessageSelector,
        respond: F,
    ) -> Result<Message, ExchangeError>
    where
        F: FnOnce(&Message) -> Message + Send,
    {
        let request = self
            .receiver
            .receive_selected(destination, selector, self.config.timeout)
            .await?;
        let reply = respond(&request);
        self.replier.reply(&request, reply).await?;
        Ok(request)
    }
}

/// Move the exchange into its terminal state.
fn settle(
    exchange: &mut Exchange,
    result: Result<Message, ExchangeError>,
    started: Instant,
) -> ExchangeOutcome {
    let (transition, outcome) = match result {
        Ok(reply) => (exchange.mark_replied(), ExchangeOutcome::Replied(reply)),
        Err(err) if err.is_timeout() => (
            exchange.mark_timed_out(),
            ExchangeOutcome::TimedOut {
                after: started.elapsed(),
            },
        ),
        Err(err) => (exchange.mark_failed(), ExchangeOutcome::Failed(err)),
    };

    match transition {
        Ok(()) => outcome,
        Err(err) => {
            error!(exchange_id = %exchange.id(), error = %err, "Exchange ended in an unexpected state");
            let _ = exchange.mark_failed();
            ExchangeOutcome::Failed(err)
        }
    }
}

fn log_outcome(
    exchange: &Exchange,
    key: &CorrelationKey,
    outcome: &ExchangeOutcome,
    elapsed: Duration,
) {
    match outcome {
        ExchangeOutcome::Replied(reply) => debug!(
            exchange_id = %exchange.id(),
            key = %key,
            reply_id = %reply.id(),
            elapsed_ms = elapsed.as_millis(),
            "Exchange replied"
        ),
        ExchangeOutcome::TimedOut { after } => warn!(
            exchange_id = %exchange.id(),
            key = %key,
            after_ms = after.as_millis(),
            "Exchange timed out waiting for reply"
        ),
        ExchangeOutcome::Failed(err) => warn!(
            exchange_id = %exchange.id(),
            key = %key,
            error = %err,
            elapsed_ms = elapsed.as_millis(),
            "Exchange failed"
        ),
    }
}
