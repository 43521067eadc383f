//! Outbound Ports (Driven Ports)
//!
//! What the correlation layer needs from the messaging system underneath.

use async_trait::async_trait;
use shared_types::{DestinationHandle, Message, MessageSelector, TransportError};
use std::time::Duration;

/// Channel transport (Driven Port)
///
/// Point-to-point delivery: a published message is taken by at most one
/// receiver, and receivers only take messages their selector accepts.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// Publish without waiting for a consumer.
    async fn publish(&self, destination: &str, message: Message) -> Result<(), TransportError>;

    /// Take the first message on `destination` accepted by `selector`,
    /// waiting up to `timeout`.
    ///
    /// Fails with `TransportError::Timeout` when nothing matches in time.
    async fn receive(
        &self,
        destination: &str,
        selector: &MessageSelector,
        timeout: Duration,
    ) -> Result<Message, TransportError>;

    /// Open an anonymous destination for a single exchange.
    async fn open_temporary(&self) -> Result<DestinationHandle, TransportError>;

    /// Remove a temporary destination. Unknown handles are ignored.
    async fn close_temporary(&self, handle: &DestinationHandle);
}

/// Destination resolver (Driven Port)
///
/// Turns a destination name carried by a message into a usable handle.
pub trait DestinationResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<DestinationHandle, TransportError>;
}
