//! # Channel Publisher
//!
//! Defines the publishing side of the bus and the in-memory bus itself.

use crate::delivery::{Delivery, DeliveryFilter};
use crate::destination::Destination;
use crate::error::BusError;
use crate::subscriber::{DeliveryStream, Subscription};
use crate::{DEFAULT_DESTINATION_CAPACITY, DEFAULT_TAP_CAPACITY, TEMPORARY_PREFIX};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{DestinationHandle, DestinationKind, Message, MessageSelector};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

/// Trait for publishing messages to named destinations.
#[async_trait]
pub trait ChannelPublisher: Send + Sync {
    /// Publish a message to a destination without waiting for a consumer.
    ///
    /// # Returns
    ///
    /// The queue depth of the destination after the publish.
    ///
    /// # Errors
    ///
    /// - `BusError::DestinationNotFound` - No such destination
    /// - `BusError::DestinationFull` - Destination at capacity
    async fn publish(&self, destination: &str, message: Message) -> Result<usize, BusError>;

    /// Get the total number of messages accepted.
    fn messages_published(&self) -> u64;
}

/// In-memory implementation of the channel bus.
///
/// Destinations are FIFO queues shared by competing receivers. A
/// `tokio::sync::broadcast` tap mirrors every accepted publish to observers.
pub struct InMemoryChannelBus {
    /// Destinations by name.
    destinations: RwLock<HashMap<String, Arc<Destination>>>,

    /// Broadcast sender for the delivery tap.
    tap: broadcast::Sender<Delivery>,

    /// Active tap observers by filter key.
    observers: Arc<RwLock<HashMap<String, usize>>>,

    /// Total messages accepted.
    messages_published: AtomicU64,

    /// Per-destination queue capacity.
    capacity: usize,
}

impl InMemoryChannelBus {
    /// Create a new bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_DESTINATION_CAPACITY)
    }

    /// Create a new bus with the specified per-destination capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tap, _) = broadcast::channel(DEFAULT_TAP_CAPACITY);
        Self {
            destinations: RwLock::new(HashMap::new()),
            tap,
            observers: Arc::new(RwLock::new(HashMap::new())),
            messages_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Declare a named destination. Declaring an existing name is a no-op.
    pub fn declare(&self, name: &str) -> DestinationHandle {
        let mut destinations = self.destinations.write();
        let destination = destinations.entry(name.to_string()).or_insert_with(|| {
            debug!(destination = name, "Destination declared");
            Arc::new(Destination::new(
                name.to_string(),
                DestinationKind::Declared,
                self.capacity,
            ))
        });
        destination.handle()
    }

    /// Open an anonymous destination for a single exchange.
    pub fn open_temporary(&self) -> DestinationHandle {
        let name = format!("{}{}", TEMPORARY_PREFIX, Uuid::new_v4());
        let destination = Arc::new(Destination::new(
            name.clone(),
            DestinationKind::Temporary,
            self.capacity,
        ));
        let handle = destination.handle();
        self.destinations.write().insert(name, destination);
        debug!(destination = %handle, "Temporary destination opened");
        handle
    }

    /// Remove a destination. Waiting receivers fail with `DestinationRemoved`.
    ///
    /// Returns true if the destination existed.
    pub fn remove(&self, name: &str) -> bool {
        let Some(destination) = self.destinations.write().remove(name) else {
            return false;
        };

        let dropped = destination.close();
        if dropped > 0 {
            warn!(
                destination = name,
                dropped = dropped,
                "Destination removed with undelivered messages"
            );
        } else {
            debug!(destination = name, "Destination removed");
        }
        true
    }

    /// Check whether a destination is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.destinations.read().contains_key(name)
    }

    /// Handle for a declared or temporary destination.
    #[must_use]
    pub fn handle(&self, name: &str) -> Option<DestinationHandle> {
        self.destinations.read().get(name).map(|d| d.handle())
    }

    /// Number of queued messages on a destination.
    #[must_use]
    pub fn queue_depth(&self, name: &str) -> Option<usize> {
        self.destinations.read().get(name).map(|d| d.depth())
    }

    /// Number of destinations, temporary ones included.
    #[must_use]
    pub fn destination_count(&self) -> usize {
        self.destinations.read().len()
    }

    /// Receive the next message on a destination, waiting up to `timeout`.
    pub async fn receive(&self, name: &str, timeout: Duration) -> Result<Message, BusError> {
        self.receive_selected(name, &MessageSelector::Any, timeout)
            .await
    }

    /// Receive the first message matching `selector`, waiting up to `timeout`.
    ///
    /// # Errors
    ///
    /// - `BusError::DestinationNotFound` - No such destination
    /// - `BusError::Timeout` - Nothing matched before the deadline
    /// - `BusError::DestinationRemoved` - Destination removed while waiting
    pub async fn receive_selected(
        &self,
        name: &str,
        selector: &MessageSelector,
        timeout: Duration,
    ) -> Result<Message, BusError> {
        let destination = self.lookup(name)?;
        let message = destination.receive_selected(selector, timeout).await?;

        debug!(
            destination = name,
            message_id = %message.id(),
            "Message received"
        );
        Ok(message)
    }

    /// Observe deliveries matching a filter.
    #[must_use]
    pub fn observe(&self, filter: DeliveryFilter) -> Subscription {
        let receiver = self.tap.subscribe();
        let filter_key = format!("{:?}", filter.destinations);

        *self.observers.write().entry(filter_key.clone()).or_insert(0) += 1;

        debug!(destinations = ?filter.destinations, "New tap observer created");

        Subscription::new(receiver, filter, self.observers.clone(), filter_key)
    }

    /// Get a stream of deliveries matching a filter.
    #[must_use]
    pub fn delivery_stream(&self, filter: DeliveryFilter) -> DeliveryStream {
        DeliveryStream::new(self.observe(filter))
    }

    /// Get the number of active tap observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.tap.receiver_count()
    }

    /// Get the per-destination capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lookup(&self, name: &str) -> Result<Arc<Destination>, BusError> {
        self.destinations
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BusError::DestinationNotFound(name.to_string()))
    }
}

impl Default for InMemoryChannelBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelPublisher for InMemoryChannelBus {
    async fn publish(&self, destination: &str, message: Message) -> Result<usize, BusError> {
        let target = self.lookup(destination)?;
        let message_id = message.id();
        let tapped = message.clone();

        let depth = target.push(message)?;
        self.messages_published.fetch_add(1, Ordering::Relaxed);

        debug!(
            destination = destination,
            message_id = %message_id,
            depth = depth,
            "Message published"
        );

        // Tap is best-effort; no observers is the normal case
        let _ = self.tap.send(Delivery {
            destination: destination.to_string(),
            message: tapped,
        });

        Ok(depth)
    }

    fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }
}
