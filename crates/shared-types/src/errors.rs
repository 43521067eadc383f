//! # Error Types
//!
//! Defines error types shared by transports and their consumers.

use std::time::Duration;
use thiserror::Error;

/// Errors reported by a channel transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Nothing matching the selector arrived before the timeout.
    #[error("No message received on '{destination}' within {timeout:?}")]
    Timeout {
        destination: String,
        timeout: Duration,
    },

    /// The destination does not exist on this transport.
    #[error("Destination not found: {0}")]
    DestinationNotFound(String),

    /// The destination queue is at capacity.
    #[error("Destination '{destination}' is full (capacity {capacity})")]
    DestinationFull { destination: String, capacity: usize },

    /// The destination was closed or removed while a receiver was waiting.
    #[error("Destination '{0}' was closed")]
    Closed(String),

    /// A named destination could not be resolved to a handle.
    #[error("Unable to resolve destination '{name}': {reason}")]
    Resolution { name: String, reason: String },
}

impl TransportError {
    /// Returns true if this is the expected "nothing arrived in time" outcome.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

/// Errors from parsing a textual message selector.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectorError {
    /// A clause has no `=` operator.
    #[error("Missing '=' operator in selector clause: {0}")]
    MissingOperator(String),

    /// A clause has an empty header name.
    #[error("Empty header name in selector clause: {0}")]
    EmptyHeaderName(String),

    /// A quoted value is not closed.
    #[error("Unterminated quote in selector clause: {0}")]
    UnterminatedQuote(String),
}
