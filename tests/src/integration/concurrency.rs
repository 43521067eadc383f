//! # Concurrency Flows
//!
//! Racing registry writers and parallel exchanges that share a reply
//! destination.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use futures::future::join_all;
    use shared_types::{headers, DestinationHandle, Message, MessageSelector, ReplyDestination};
    use sync_reply::{CorrelationKey, ReplyDestinationRegistry, RequestReplyApi};
    use tokio::time::timeout;

    use crate::integration::fixtures::{header_config, Relay, REQUESTS};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_puts_leave_exactly_one_destination() {
        for _ in 0..50 {
            let registry = Arc::new(ReplyDestinationRegistry::new());
            let key = CorrelationKey::from("k");

            let writers = ["h1", "h2"].map(|name| {
                let registry = registry.clone();
                let key = key.clone();
                tokio::spawn(async move {
                    registry.put(key, DestinationHandle::declared(name));
                })
            });
            for writer in writers {
                writer.await.unwrap();
            }

            let taken = registry.take_by_key(&key).expect("one destination stored");
            assert!(taken.name() == "h1" || taken.name() == "h2");
            assert!(registry.take_by_key(&key).is_none());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_exchanges_on_shared_reply_destination() {
        const EXCHANGES: usize = 8;

        let relay = Relay::new(header_config());
        relay.bus.declare("shared.reply");

        let responder = {
            let orchestrator = relay.orchestrator.clone();
            tokio::spawn(async move {
                for _ in 0..EXCHANGES {
                    orchestrator
                        .receive_and_reply(REQUESTS, &MessageSelector::Any, |request| {
                            Message::new(request.payload().clone())
                        })
                        .await
                        .unwrap();
                }
            })
        };

        let requesters = (0..EXCHANGES).map(|n| {
            let orchestrator = relay.orchestrator.clone();
            async move {
                let key = format!("order-{}", n);
                let request = Message::text(key.clone())
                    .with_header(headers::CORRELATION_ID, key.clone())
                    .with_reply_to(ReplyDestination::Named("shared.reply".to_string()));
                let report = orchestrator.send_and_receive(REQUESTS, request).await;
                (key, report)
            }
        });

        let reports = timeout(Duration::from_secs(5), join_all(requesters))
            .await
            .expect("exchanges hung");
        responder.await.unwrap();

        for (key, report) in reports {
            assert_eq!(report.key, CorrelationKey::from(key.as_str()));
            let reply = report.into_reply().unwrap();
            // Every requester got the reply to its own request
            assert_eq!(reply.payload(), key.as_str());
            assert_eq!(reply.header(headers::CORRELATION_ID), Some(key.as_str()));
        }

        assert!(relay.registry.is_empty());
        assert_eq!(relay.bus.queue_depth("shared.reply"), Some(0));
        assert_eq!(relay.metrics.snapshot().exchanges_replied, EXCHANGES as u64);
    }
}
