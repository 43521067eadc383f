//! # Registry Flows
//!
//! Reply destination bookkeeping observed through the receiver and replier:
//! duplicate handling, retention, and resolution of named destinations.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use shared_bus::ChannelPublisher;
    use shared_types::{headers, DestinationHandle, Message, ReplyDestination};
    use sync_reply::{CorrelationKey, DuplicatePolicy, ExchangeConfig, ExchangeError};

    use crate::integration::fixtures::{default_key_config, header_config, Relay, REQUESTS};

    fn request(key: &str, reply_to: ReplyDestination) -> Message {
        Message::text(format!("request for {}", key))
            .with_header(headers::CORRELATION_ID, key)
            .with_reply_to(reply_to)
    }

    fn inline(name: &str) -> ReplyDestination {
        ReplyDestination::Inline(DestinationHandle::declared(name))
    }

    /// Publish and receive each request in turn, returning the last one.
    async fn deliver(relay: &Relay, requests: Vec<Message>) -> Message {
        let mut last = None;
        for message in requests {
            relay.bus.publish(REQUESTS, message).await.unwrap();
            last = Some(
                relay
                    .orchestrator
                    .receiver()
                    .receive(REQUESTS, Duration::from_millis(200))
                    .await
                    .unwrap(),
            );
        }
        last.expect("at least one request")
    }

    // =============================================================================
    // DUPLICATE KEYS
    // =============================================================================

    #[tokio::test]
    async fn test_overwrite_routes_to_newest_destination() {
        let relay = Relay::new(header_config());
        relay.bus.declare("R1");
        relay.bus.declare("R2");

        let latest = deliver(
            &relay,
            vec![request("k", inline("R1")), request("k", inline("R2"))],
        )
        .await;

        let sent_to = relay
            .orchestrator
            .replier()
            .reply(&latest, Message::text("pong"))
            .await
            .unwrap();

        assert_eq!(sent_to.name(), "R2");
        assert_eq!(relay.bus.queue_depth("R1"), Some(0));
        assert_eq!(relay.metrics.snapshot().stale_destinations, 1);
        assert_eq!(relay.registry.snapshot().replaced, 1);
    }

    #[tokio::test]
    async fn test_reject_keeps_first_destination() {
        let relay = Relay::new(ExchangeConfig {
            duplicate_policy: DuplicatePolicy::Reject,
            ..header_config()
        });
        relay.bus.declare("R1");
        relay.bus.declare("R2");

        let latest = deliver(
            &relay,
            vec![request("k", inline("R1")), request("k", inline("R2"))],
        )
        .await;

        let sent_to = relay
            .orchestrator
            .replier()
            .reply(&latest, Message::text("pong"))
            .await
            .unwrap();

        assert_eq!(sent_to.name(), "R1");
        assert_eq!(relay.bus.queue_depth("R2"), Some(0));
        assert_eq!(relay.registry.snapshot().rejected, 1);
    }

    // =============================================================================
    // RETENTION
    // =============================================================================

    #[tokio::test]
    async fn test_expired_destination_is_not_returned() {
        let relay = Relay::new(ExchangeConfig {
            retention: Some(Duration::from_millis(50)),
            ..header_config()
        });
        relay.bus.declare("R1");

        let received = deliver(&relay, vec![request("late", inline("R1"))]).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let err = relay
            .orchestrator
            .replier()
            .reply(&received, Message::text("too late"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ExchangeError::ReplyDestinationNotFound {
                key: CorrelationKey::from("late")
            }
        );
        assert_eq!(relay.bus.queue_depth("R1"), Some(0));
        assert_eq!(relay.registry.snapshot().expired, 1);
    }

    #[tokio::test]
    async fn test_sweeper_purges_unclaimed_destinations() {
        let relay = Relay::new(ExchangeConfig {
            retention: Some(Duration::from_millis(30)),
            sweep_interval: Duration::from_millis(20),
            ..header_config()
        });
        relay.bus.declare("R1");
        let sweeper = relay
            .orchestrator
            .spawn_retention_sweeper()
            .expect("retention configured");

        deliver(
            &relay,
            vec![request("a", inline("R1")), request("b", inline("R1"))],
        )
        .await;
        assert_eq!(relay.registry.len(), 2);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(relay.registry.is_empty());
        sweeper.abort();
    }

    // =============================================================================
    // NAMED DESTINATIONS
    // =============================================================================

    #[tokio::test]
    async fn test_named_destination_resolved_at_capture() {
        let relay = Relay::new(default_key_config());
        relay.bus.declare("orders.reply");

        let received = deliver(
            &relay,
            vec![Message::text("ping").with_header(headers::REPLY_TO, "orders.reply")],
        )
        .await;
        assert!(relay.registry.contains(&CorrelationKey::default()));

        relay
            .orchestrator
            .replier()
            .reply(&received, Message::text("pong"))
            .await
            .unwrap();
        assert_eq!(relay.bus.queue_depth("orders.reply"), Some(1));
    }

    #[tokio::test]
    async fn test_unresolvable_name_leaves_registry_untouched() {
        let relay = Relay::new(header_config());
        relay.bus.declare("R1");

        // A live entry for another key must survive
        deliver(&relay, vec![request("other", inline("R1"))]).await;

        let received = deliver(
            &relay,
            vec![request(
                "ghost",
                ReplyDestination::Named("nowhere".to_string()),
            )],
        )
        .await;

        assert_eq!(relay.registry.len(), 1);
        assert!(relay.registry.contains(&CorrelationKey::from("other")));

        let err = relay
            .orchestrator
            .replier()
            .reply(&received, Message::text("pong"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::ReplyDestinationNotFound { .. }));
    }

    #[tokio::test]
    async fn test_separate_registries_do_not_share_destinations() {
        let server = Relay::new(header_config());
        let other = server.peer(header_config());
        server.bus.declare("R1");

        let received = deliver(&server, vec![request("k", inline("R1"))]).await;

        let err = other
            .orchestrator
            .replier()
            .reply(&received, Message::text("pong"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::ReplyDestinationNotFound { .. }));
        assert!(Arc::ptr_eq(&server.bus, &other.bus));
        assert!(server.registry.contains(&CorrelationKey::from("k")));
    }
}
