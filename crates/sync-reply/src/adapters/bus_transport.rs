//! Channel transport over the in-memory bus
//!
//! Maps the bus's queue operations onto the `ChannelTransport` and
//! `DestinationResolver` ports.

use async_trait::async_trait;
use shared_bus::{BusError, ChannelPublisher, InMemoryChannelBus};
use shared_types::{DestinationHandle, Message, MessageSelector, TransportError};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::ports::{ChannelTransport, DestinationResolver};

/// Adapter connecting the correlation layer to an [`InMemoryChannelBus`].
#[derive(Clone)]
pub struct BusTransportAdapter {
    bus: Arc<InMemoryChannelBus>,
}

impl BusTransportAdapter {
    pub fn new(bus: Arc<InMemoryChannelBus>) -> Self {
        Self { bus }
    }

    /// The underlying bus
    #[must_use]
    pub fn bus(&self) -> &Arc<InMemoryChannelBus> {
        &self.bus
    }
}

fn into_transport_error(err: BusError) -> TransportError {
    match err {
        BusError::DestinationNotFound(name) => TransportError::DestinationNotFound(name),
        BusError::DestinationFull {
            destination,
            capacity,
        } => TransportError::DestinationFull {
            destination,
            capacity,
        },
        BusError::Timeout {
            destination,
            timeout,
        } => TransportError::Timeout {
            destination,
            timeout,
        },
        BusError::DestinationRemoved(name) => TransportError::Closed(name),
    }
}

#[async_trait]
impl ChannelTransport for BusTransportAdapter {
    async fn publish(&self, destination: &str, message: Message) -> Result<(), TransportError> {
        self.bus
            .publish(destination, message)
            .await
            .map(|_| ())
            .map_err(into_transport_error)
    }

    async fn receive(
        &self,
        destination: &str,
        selector: &MessageSelector,
        timeout: Duration,
    ) -> Result<Message, TransportError> {
        self.bus
            .receive_selected(destination, selector, timeout)
            .await
            .map_err(into_transport_error)
    }

    async fn open_temporary(&self) -> Result<DestinationHandle, TransportError> {
        Ok(self.bus.open_temporary())
    }

    async fn close_temporary(&self, handle: &DestinationHandle) {
        if !handle.is_temporary() {
            debug!(destination = %handle, "Refusing to close declared destination");
            return;
        }
        self.bus.remove(handle.name());
    }
}

impl DestinationResolver for BusTransportAdapter {
    fn resolve(&self, name: &str) -> Result<DestinationHandle, TransportError> {
        self.bus
            .handle(name)
            .ok_or_else(|| TransportError::Resolution {
                name: name.to_string(),
                reason: "no destination declared under this name".to_string(),
            })
    }
}
