//! Error types for the synchronous reply subsystem

use crate::domain::correlation::CorrelationKey;
use crate::domain::exchange::ExchangeState;
use shared_types::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while receiving, replying or orchestrating an exchange
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("No reply destination registered for correlation key {key}")]
    ReplyDestinationNotFound { key: CorrelationKey },

    #[error("No message received on '{destination}' within {timeout:?}")]
    ReceiveTimeout {
        destination: String,
        timeout: Duration,
    },

    #[error("Transport failure: {0}")]
    TransportFailure(TransportError),

    #[error("Invalid exchange transition from {from:?} on {operation}")]
    InvalidTransition {
        from: ExchangeState,
        operation: &'static str,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ExchangeError {
    /// True for the expected "no reply in time" outcome.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExchangeError::ReceiveTimeout { .. })
    }

    /// Errors caused by wiring or programming mistakes rather than by the
    /// transport or the peer.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExchangeError::InvalidTransition { .. } | ExchangeError::InvalidConfig(_)
        )
    }
}

// Timeouts keep their own variant so callers can branch on them
impl From<TransportError> for ExchangeError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout {
                destination,
                timeout,
            } => ExchangeError::ReceiveTimeout {
                destination,
                timeout,
            },
            other => ExchangeError::TransportFailure(other),
        }
    }
}
