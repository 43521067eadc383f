//! # Sync-Relay Benchmarks
//!
//! | Area | Operation | Target |
//! |------|-----------|--------|
//! | Registry | put + take under distinct keys | < 1µs |
//! | Orchestrator | loopback exchange over the in-memory bus | < 100µs |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

use shared_bus::InMemoryChannelBus;
use shared_types::{headers, DestinationHandle, Message, MessageSelector};
use sync_reply::{
    BusTransportAdapter, CorrelationKey, CorrelationMode, ExchangeConfig, ReplyDestinationRegistry,
    RequestReplyApi, RequestReplyOrchestrator,
};

// ============================================================================
// Registry Benchmarks
// ============================================================================

fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");

    let registry = ReplyDestinationRegistry::new();
    let handle = DestinationHandle::declared("R1");
    let key = CorrelationKey::from("order-42");

    group.bench_function("put_take_single_key", |b| {
        b.iter(|| {
            registry.put(key.clone(), handle.clone());
            black_box(registry.take_by_key(&key))
        })
    });

    for size in [100, 1_000, 10_000] {
        let keys: Vec<CorrelationKey> = (0..size)
            .map(|i| CorrelationKey::from(format!("order-{}", i)))
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("put_take_batch", size), &keys, |b, keys| {
            b.iter(|| {
                for key in keys {
                    registry.put(key.clone(), handle.clone());
                }
                for key in keys {
                    black_box(registry.take_by_key(key));
                }
            })
        });
    }

    group.finish();
}

// ============================================================================
// Exchange Benchmarks
// ============================================================================

fn bench_exchange(c: &mut Criterion) {
    let mut group = c.benchmark_group("exchange");
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");

    let bus = Arc::new(InMemoryChannelBus::new());
    bus.declare("orders");
    let transport = Arc::new(BusTransportAdapter::new(bus));
    let config = ExchangeConfig {
        correlation: CorrelationMode::Header {
            name: headers::CORRELATION_ID.to_string(),
        },
        ..ExchangeConfig::default()
    };
    let orchestrator = Arc::new(
        RequestReplyOrchestrator::new(
            transport.clone(),
            transport,
            Arc::new(ReplyDestinationRegistry::new()),
            config,
        )
        .expect("valid config"),
    );

    group.bench_function("loopback_round_trip", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let responder = {
                    let orchestrator = orchestrator.clone();
                    tokio::spawn(async move {
                        orchestrator
                            .receive_and_reply("orders", &MessageSelector::Any, |request| {
                                Message::new(request.payload().clone())
                            })
                            .await
                    })
                };
                let request =
                    Message::text("ping").with_header(headers::CORRELATION_ID, "bench");
                let report = orchestrator.send_and_receive("orders", request).await;
                let _ = responder.await;
                black_box(report.is_replied())
            })
        })
    });

    group.finish();
}

criterion_group!(benches, bench_registry, bench_exchange);
criterion_main!(benches);
