//! # Sync Reply
//!
//! Synchronous request/reply over channel transports that have no native
//! reply linkage.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): correlation, registry, exchange lifecycle
//!   - `CorrelationKeyStrategy`: fixed, header and payload-expression keys
//!   - `ReplyDestinationRegistry`: correlation key → reply destination
//!   - `Exchange`: `Idle → Sent → AwaitingReply → {Replied | TimedOut | Failed}`
//!   - `ExchangeConfig`: configuration with validation and env loading
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `RequestReplyApi`: Driving port (inbound API)
//!   - `ChannelTransport`, `DestinationResolver`: Driven ports
//!
//! - **Service Layer** (`service/`): Orchestration
//!   - `SynchronousReceiver`: receive and record the reply destination
//!   - `SynchronousReplier`: reply to the recorded destination, once
//!   - `RequestReplyOrchestrator`: implements `RequestReplyApi`
//!
//! - **Adapters Layer** (`adapters/`): External connections
//!   - `BusTransportAdapter`: transport and resolver over `shared-bus`
//!
//! ## Invariants
//!
//! - At most one live registry entry per correlation key
//! - A registry entry is taken at most once; concurrent takes have one winner
//! - A receive with a timeout never blocks past its deadline
//! - An exchange that does not end in `Replied` leaves no registry entry
//!
//! ## Usage Example
//!
//! ```ignore
//! use shared_bus::InMemoryChannelBus;
//! use sync_reply::{BusTransportAdapter, ExchangeConfig, RequestReplyApi, RequestReplyOrchestrator};
//! use std::sync::Arc;
//!
//! let bus = Arc::new(InMemoryChannelBus::new());
//! bus.declare("orders");
//! let transport = Arc::new(BusTransportAdapter::new(bus));
//! let config = ExchangeConfig::from_env()?;
//! let registry = Arc::new(config.registry());
//!
//! let orchestrator = RequestReplyOrchestrator::new(transport.clone(), transport, registry, config)?;
//! let report = orchestrator.send_and_receive("orders", Message::text("ping")).await;
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-export main types
pub use adapters::BusTransportAdapter;
pub use domain::{
    CorrelationKey, CorrelationKeyStrategy, CorrelationMode, DuplicatePolicy, ExchangeConfig,
    ExchangeConfigBuilder, ExchangeOutcome, ExchangeReport, ExchangeState, ExpressionCorrelation,
    FixedKeyCorrelation, HeaderCorrelation, OutcomeKind, PutOutcome, ReplyDestinationRegistry,
};
pub use error::ExchangeError;
pub use metrics::{ExchangeMetrics, MetricsRecorder, NoOpMetrics};
pub use ports::{ChannelTransport, DestinationResolver, RequestReplyApi};
pub use service::{RequestReplyOrchestrator, SynchronousReceiver, SynchronousReplier};
