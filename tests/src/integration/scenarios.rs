//! # Request/Reply Scenarios
//!
//! End-to-end flows through receiver, replier and orchestrator:
//!
//! 1. **Keyed reply**: a reply for `order-42` reaches its destination once
//! 2. **Default key**: sequential exchanges never reuse a consumed destination
//! 3. **No reply**: a 500 ms deadline ends in `TimedOut` and leaves nothing behind
//! 4. **No reply destination**: nothing is stored, so replying fails

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use shared_bus::{ChannelPublisher, DeliveryFilter};
    use shared_types::{headers, DestinationHandle, Message, MessageSelector, ReplyDestination};
    use sync_reply::{
        CorrelationKey, ExchangeError, ExchangeOutcome, ExchangeState, RequestReplyApi,
    };
    use tokio::time::timeout;

    use crate::integration::fixtures::{default_key_config, header_config, Relay, REQUESTS};

    // =============================================================================
    // SCENARIO 1: KEYED REPLY
    // =============================================================================

    #[tokio::test]
    async fn test_keyed_reply_published_exactly_once() {
        let relay = Relay::new(header_config());
        relay.bus.declare("D");
        let mut tap = relay.bus.observe(DeliveryFilter::destinations(["D"]));

        let request = Message::text("ping")
            .with_header(headers::CORRELATION_ID, "order-42")
            .with_reply_to(ReplyDestination::Inline(DestinationHandle::declared("D")));
        relay.bus.publish(REQUESTS, request).await.unwrap();

        let received = relay
            .orchestrator
            .receiver()
            .receive(REQUESTS, Duration::from_millis(200))
            .await
            .unwrap();
        assert!(relay.registry.contains(&CorrelationKey::from("order-42")));

        let replier = relay.orchestrator.replier();
        let sent_to = replier
            .reply(&received, Message::text("pong"))
            .await
            .unwrap();
        assert_eq!(sent_to.name(), "D");

        // A second reply for the same request has nowhere to go
        let err = replier
            .reply(&received, Message::text("pong again"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ExchangeError::ReplyDestinationNotFound {
                key: CorrelationKey::from("order-42")
            }
        );

        let deliveries = tap.drain();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].message.payload(), "pong");
        assert_eq!(
            deliveries[0].message.header(headers::CORRELATION_ID),
            Some("order-42")
        );
    }

    #[tokio::test]
    async fn test_keyed_round_trip_through_orchestrator() {
        let relay = Relay::new(header_config());

        let responder = {
            let orchestrator = relay.orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .receive_and_reply(REQUESTS, &MessageSelector::Any, |request| {
                        Message::new(serde_json::json!({ "echo": request.payload().clone() }))
                    })
                    .await
            })
        };

        let request = Message::text("ping").with_header(headers::CORRELATION_ID, "order-42");
        let report = relay.orchestrator.send_and_receive(REQUESTS, request).await;

        assert_eq!(report.key, CorrelationKey::from("order-42"));
        let reply = report.into_reply().unwrap();
        assert_eq!(reply.payload()["echo"], "ping");

        let served = responder.await.unwrap().unwrap();
        assert_eq!(served.payload(), "ping");
        assert!(relay.registry.is_empty());
        assert_eq!(relay.bus.destination_count(), 1);
    }

    #[tokio::test]
    async fn test_echo_responder_leaves_no_registry_entry() {
        let relay = Relay::new(header_config());

        for _ in 0..2 {
            let responder = {
                let orchestrator = relay.orchestrator.clone();
                tokio::spawn(async move {
                    orchestrator
                        .receive_and_reply(REQUESTS, &MessageSelector::Any, |request| {
                            request.clone()
                        })
                        .await
                })
            };

            let request = Message::text("ping").with_header(headers::CORRELATION_ID, "order-42");
            let report = relay.orchestrator.send_and_receive(REQUESTS, request).await;
            responder.await.unwrap().unwrap();

            assert!(report.is_replied());
            assert!(relay.registry.is_empty());
        }

        // The second request for the same key displaced nothing
        let snapshot = relay.metrics.snapshot();
        assert_eq!(snapshot.stale_destinations, 0);
        assert_eq!(snapshot.destinations_missing, 0);
        assert_eq!(snapshot.destinations_captured, 2);
    }

    // =============================================================================
    // SCENARIO 2: DEFAULT KEY, SEQUENTIAL EXCHANGES
    // =============================================================================

    #[tokio::test]
    async fn test_default_key_sequential_exchanges() {
        let relay = Relay::new(default_key_config());
        relay.bus.declare("R1");
        relay.bus.declare("R2");

        for (reply_to, body) in [("R1", "first"), ("R2", "second")] {
            let request = Message::text(body)
                .with_reply_to(ReplyDestination::Inline(DestinationHandle::declared(reply_to)));
            relay.bus.publish(REQUESTS, request).await.unwrap();

            relay
                .orchestrator
                .receive_and_reply(REQUESTS, &MessageSelector::Any, |request| {
                    Message::new(request.payload().clone())
                })
                .await
                .unwrap();
        }

        // Each reply landed on its own request's destination
        assert_eq!(relay.bus.queue_depth("R1"), Some(1));
        assert_eq!(relay.bus.queue_depth("R2"), Some(1));
        let second = relay
            .bus
            .receive("R2", Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(second.payload(), "second");
        assert!(relay.registry.take_default().is_none());
    }

    #[tokio::test]
    async fn test_default_key_exchanges_through_orchestrator() {
        let relay = Relay::new(default_key_config());

        for body in ["first", "second"] {
            let responder = {
                let orchestrator = relay.orchestrator.clone();
                tokio::spawn(async move {
                    orchestrator
                        .receive_and_reply(REQUESTS, &MessageSelector::Any, |request| {
                            Message::new(request.payload().clone())
                        })
                        .await
                })
            };

            let report = relay
                .orchestrator
                .send_and_receive(REQUESTS, Message::text(body))
                .await;

            assert!(report.key.is_default());
            assert_eq!(report.into_reply().unwrap().payload(), body);
            responder.await.unwrap().unwrap();
        }

        let snapshot = relay.metrics.snapshot();
        assert_eq!(snapshot.exchanges_replied, 2);
        assert_eq!(snapshot.stale_destinations, 0);
    }

    // =============================================================================
    // SCENARIO 3: NO REPLY
    // =============================================================================

    #[tokio::test]
    async fn test_unanswered_exchange_times_out_without_residue() {
        let relay = Relay::new(header_config());
        let key = CorrelationKey::from("order-77");

        // Shares the registry and takes the request, but never replies
        let silent = {
            let orchestrator = relay.orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .receiver()
                    .receive(REQUESTS, Duration::from_secs(1))
                    .await
            })
        };

        let request = Message::text("ping").with_header(headers::CORRELATION_ID, "order-77");
        let started = Instant::now();
        let report = relay
            .orchestrator
            .send_and_receive_within(REQUESTS, request, Duration::from_millis(500))
            .await;
        let elapsed = started.elapsed();

        assert!(matches!(report.outcome, ExchangeOutcome::TimedOut { .. }));
        assert!(elapsed >= Duration::from_millis(500), "returned early: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(600), "returned late: {:?}", elapsed);

        silent.await.unwrap().unwrap();
        assert!(!relay.registry.contains(&key));
        assert!(relay.registry.is_empty());
        assert_eq!(relay.metrics.snapshot().exchanges_timed_out, 1);

        let err = report.into_reply().unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_receive_timeout_bounds() {
        let relay = Relay::new(default_key_config());
        let deadline = Duration::from_millis(100);

        let started = Instant::now();
        let err = relay
            .orchestrator
            .receiver()
            .receive(REQUESTS, deadline)
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, ExchangeError::ReceiveTimeout { .. }));
        assert!(elapsed >= deadline);
        assert!(elapsed < deadline + Duration::from_millis(100));
    }

    // =============================================================================
    // SCENARIO 4: NO REPLY DESTINATION
    // =============================================================================

    #[tokio::test]
    async fn test_request_without_reply_destination() {
        let relay = Relay::new(default_key_config());
        relay
            .bus
            .publish(REQUESTS, Message::text("fire-and-forget"))
            .await
            .unwrap();

        let result = timeout(
            Duration::from_secs(1),
            relay
                .orchestrator
                .receive_and_reply(REQUESTS, &MessageSelector::Any, |_| Message::text("pong")),
        )
        .await
        .expect("receive_and_reply hung");

        assert_eq!(
            result.unwrap_err(),
            ExchangeError::ReplyDestinationNotFound {
                key: CorrelationKey::default()
            }
        );
        assert!(relay.registry.is_empty());
        assert_eq!(relay.metrics.snapshot().destinations_missing, 1);
    }

    #[tokio::test]
    async fn test_exchange_state_reported_on_failure() {
        let relay = Relay::new(default_key_config());

        let report = relay
            .orchestrator
            .send_and_receive(
                "no-such-destination",
                Message::text("ping").with_header(headers::CORRELATION_ID, "x"),
            )
            .await;

        match report.outcome {
            ExchangeOutcome::Failed(ExchangeError::TransportFailure(_)) => {}
            other => panic!("expected transport failure, got {:?}", other),
        }
        // The temporary reply destination is closed again
        assert_eq!(relay.bus.destination_count(), 1);
        assert!(ExchangeState::Failed.is_terminal());
    }
}
