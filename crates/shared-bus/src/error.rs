//! Errors from bus operations.

use std::time::Duration;
use thiserror::Error;

/// Errors from publishing to or receiving from the bus.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// No destination is declared under this name.
    #[error("Destination not found: {0}")]
    DestinationNotFound(String),

    /// The destination queue is at capacity.
    #[error("Destination '{destination}' is full (capacity {capacity})")]
    DestinationFull { destination: String, capacity: usize },

    /// Nothing matching the selector arrived before the deadline.
    #[error("Receive on '{destination}' timed out after {timeout:?}")]
    Timeout {
        destination: String,
        timeout: Duration,
    },

    /// The destination was removed while a receiver was waiting on it.
    #[error("Destination '{0}' was removed")]
    DestinationRemoved(String),
}
