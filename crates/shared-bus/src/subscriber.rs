//! # Delivery Tap Subscriber
//!
//! Defines the observing side of the bus. Observers see a copy of every
//! accepted publish; they never take messages off a destination.

use crate::delivery::{Delivery, DeliveryFilter};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The bus was dropped.
    #[error("Channel bus closed")]
    Closed,
}

/// Keeps the observer count of a filter key accurate.
///
/// When dropped, the observer is automatically deregistered.
struct ObserverGuard {
    observers: Arc<RwLock<HashMap<String, usize>>>,
    filter_key: String,
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        let mut observers = self.observers.write();
        let Some(count) = observers.get_mut(&self.filter_key) else {
            debug!(filter = %self.filter_key, "Tap observer dropped");
            return;
        };

        *count = count.saturating_sub(1);
        if *count == 0 {
            observers.remove(&self.filter_key);
        }
        debug!(filter = %self.filter_key, "Tap observer dropped");
    }
}

/// A handle for receiving deliveries from the tap.
pub struct Subscription {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<Delivery>,

    /// Filter for this subscription.
    filter: DeliveryFilter,

    /// Deregisters the observer on drop.
    _guard: ObserverGuard,
}

impl Subscription {
    /// Create a new subscription.
    pub(crate) fn new(
        receiver: broadcast::Receiver<Delivery>,
        filter: DeliveryFilter,
        observers: Arc<RwLock<HashMap<String, usize>>>,
        filter_key: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            _guard: ObserverGuard {
                observers,
                filter_key,
            },
        }
    }

    /// Receive the next delivery that matches the filter.
    ///
    /// # Returns
    ///
    /// - `Some(delivery)` - The next matching delivery
    /// - `None` - The tap was closed (bus dropped)
    pub async fn recv(&mut self) -> Option<Delivery> {
        loop {
            let delivery = match self.receiver.recv().await {
                Ok(d) => d,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Tap observer lagged, some deliveries dropped");
                    continue;
                }
            };

            if self.filter.matches(&delivery) {
                return Some(delivery);
            }
        }
    }

    /// Try to receive the next delivery without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(delivery))` - A delivery was available and matched
    /// - `Ok(None)` - Nothing available (would block)
    /// - `Err(SubscriptionError::Closed)` - The tap was closed
    pub fn try_recv(&mut self) -> Result<Option<Delivery>, SubscriptionError> {
        loop {
            let delivery = match self.receiver.try_recv() {
                Ok(d) => d,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };

            if self.filter.matches(&delivery) {
                return Ok(Some(delivery));
            }
        }
    }

    /// Drain every matching delivery currently buffered.
    pub fn drain(&mut self) -> Vec<Delivery> {
        let mut drained = Vec::new();
        while let Ok(Some(delivery)) = self.try_recv() {
            drained.push(delivery);
        }
        drained
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &DeliveryFilter {
        &self.filter
    }
}

/// A stream wrapper for subscriptions.
///
/// Implements `tokio_stream::Stream` for use with stream combinators.
pub struct DeliveryStream {
    inner: BroadcastStream<Delivery>,
    filter: DeliveryFilter,
    _guard: ObserverGuard,
}

impl DeliveryStream {
    /// Create a new delivery stream from a subscription.
    #[must_use]
    pub fn new(subscription: Subscription) -> Self {
        let Subscription {
            receiver,
            filter,
            _guard: guard,
        } = subscription;
        Self {
            inner: BroadcastStream::new(receiver),
            filter,
            _guard: guard,
        }
    }

    /// Get the filter for this stream.
    #[must_use]
    pub fn delivery_filter(&self) -> &DeliveryFilter {
        &self.filter
    }
}

impl Stream for DeliveryStream {
    type Item = Delivery;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
                Some(Ok(delivery)) => {
                    if this.filter.matches(&delivery) {
                        return Poll::Ready(Some(delivery));
                    }
                }
                Some(Err(BroadcastStreamRecvError::Lagged(count))) => {
                    debug!(lagged = count, "Delivery stream lagged, some deliveries dropped");
                }
                None => return Poll::Ready(None),
            }
        }
    }
}
