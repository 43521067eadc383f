//! # Shared Bus - In-Memory Channel Transport
//!
//! Named point-to-point destinations with fire-and-forget publish and a
//! deadline-bound, selector-based receive.
//!
//! ## Delivery Model
//!
//! ```text
//! ┌──────────────┐                      ┌──────────────┐
//! │  Requester   │   publish(name)      │  Responder   │
//! │              │ ──────┐              │              │
//! └──────────────┘       │              └──────────────┘
//!                        ▼                     ↑
//!                ┌───────────────┐             │ receive_selected(name,
//!                │  Destination  │ ────────────┘   selector, timeout)
//!                │  (FIFO queue) │
//!                └───────────────┘
//!                        │
//!                        ▼ every publish
//!                ┌───────────────┐
//!                │ Delivery Tap  │ ──→ observe(filter)
//!                └───────────────┘
//! ```
//!
//! - Each message is taken by exactly one receiver. Messages that do not
//!   match a receiver's selector stay queued.
//! - Receivers wait on a notification bounded by a deadline; nothing polls.
//! - Temporary destinations are anonymous reply queues opened for a single
//!   exchange and removed afterwards.
//! - The delivery tap broadcasts a copy of every accepted publish to
//!   observers (diagnostics, tests). It never affects delivery.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod delivery;
pub mod destination;
pub mod error;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use delivery::{Delivery, DeliveryFilter};
pub use error::BusError;
pub use publisher::{ChannelPublisher, InMemoryChannelBus};
pub use subscriber::{DeliveryStream, Subscription, SubscriptionError};

/// Maximum messages queued per destination before publish is refused.
pub const DEFAULT_DESTINATION_CAPACITY: usize = 1000;

/// Maximum deliveries buffered per tap observer before it lags.
pub const DEFAULT_TAP_CAPACITY: usize = 1000;

/// Name prefix of temporary reply destinations.
pub const TEMPORARY_PREFIX: &str = "temp-reply.";
