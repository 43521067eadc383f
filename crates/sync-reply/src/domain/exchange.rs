//! Exchange lifecycle.
//!
//! ```text
//! Idle ──mark_sent──→ Sent ──mark_awaiting──→ AwaitingReply ──→ Replied
//!   │                   │                          ├─────────→ TimedOut
//!   └───────────────────┴──────────mark_failed─────┴─────────→ Failed
//! ```
//!
//! Terminal states accept no further transitions.

use crate::domain::correlation::CorrelationKey;
use crate::error::ExchangeError;
use serde::{Deserialize, Serialize};
use shared_types::Message;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// State of one request/reply exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExchangeState {
    Idle,
    Sent,
    AwaitingReply,
    Replied,
    TimedOut,
    Failed,
}

impl ExchangeState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExchangeState::Replied | ExchangeState::TimedOut | ExchangeState::Failed
        )
    }
}

/// Tracks a single exchange from send to completion.
#[derive(Debug)]
pub struct Exchange {
    id: Uuid,
    state: ExchangeState,
    key: Option<CorrelationKey>,
    started_at: Instant,
}

impl Exchange {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: ExchangeState::Idle,
            key: None,
            started_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Correlation key recorded when the request was sent.
    #[must_use]
    pub fn key(&self) -> Option<&CorrelationKey> {
        self.key.as_ref()
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Idle → Sent, recording the key the request was published under.
    pub fn mark_sent(&mut self, key: CorrelationKey) -> Result<(), ExchangeError> {
        self.transition(ExchangeState::Idle, ExchangeState::Sent, "mark_sent")?;
        self.key = Some(key);
        Ok(())
    }

    /// Sent → AwaitingReply
    pub fn mark_awaiting(&mut self) -> Result<(), ExchangeError> {
        self.transition(
            ExchangeState::Sent,
            ExchangeState::AwaitingReply,
            "mark_awaiting",
        )
    }

    /// AwaitingReply → Replied
    pub fn mark_replied(&mut self) -> Result<(), ExchangeError> {
        self.transition(
            ExchangeState::AwaitingReply,
            ExchangeState::Replied,
            "mark_replied",
        )
    }

    /// AwaitingReply → TimedOut
    pub fn mark_timed_out(&mut self) -> Result<(), ExchangeError> {
        self.transition(
            ExchangeState::AwaitingReply,
            ExchangeState::TimedOut,
            "mark_timed_out",
        )
    }

    /// Any non-terminal state → Failed
    pub fn mark_failed(&mut self) -> Result<(), ExchangeError> {
        if self.state.is_terminal() {
            return Err(ExchangeError::InvalidTransition {
                from: self.state,
                operation: "mark_failed",
            });
        }
        self.state = ExchangeState::Failed;
        Ok(())
    }

    fn transition(
        &mut self,
        from: ExchangeState,
        to: ExchangeState,
        operation: &'static str,
    ) -> Result<(), ExchangeError> {
        if self.state != from {
            return Err(ExchangeError::InvalidTransition {
                from: self.state,
                operation,
            });
        }
        self.state = to;
        Ok(())
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new()
    }
}

/// Coarse outcome class, used for metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Replied,
    TimedOut,
    Failed,
}

impl OutcomeKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Replied => "replied",
            OutcomeKind::TimedOut => "timed_out",
            OutcomeKind::Failed => "failed",
        }
    }
}

/// How an exchange ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    Replied(Message),
    TimedOut { after: Duration },
    Failed(ExchangeError),
}

impl ExchangeOutcome {
    #[must_use]
    pub fn kind(&self) -> OutcomeKind {
        match self {
            ExchangeOutcome::Replied(_) => OutcomeKind::Replied,
            ExchangeOutcome::TimedOut { .. } => OutcomeKind::TimedOut,
            ExchangeOutcome::Failed(_) => OutcomeKind::Failed,
        }
    }

    #[must_use]
    pub fn is_replied(&self) -> bool {
        matches!(self, ExchangeOutcome::Replied(_))
    }

    #[must_use]
    pub fn reply(&self) -> Option<&Message> {
        match self {
            ExchangeOutcome::Replied(message) => Some(message),
            _ => None,
        }
    }
}

/// Result of `send_and_receive`.
#[derive(Debug, Clone)]
pub struct ExchangeReport {
    pub exchange_id: Uuid,
    pub key: CorrelationKey,
    /// Destination the reply was awaited on, if one was established.
    pub reply_destination: Option<String>,
    pub outcome: ExchangeOutcome,
    pub elapsed: Duration,
}

impl ExchangeReport {
    #[must_use]
    pub fn is_replied(&self) -> bool {
        self.outcome.is_replied()
    }

    /// Consume the report, turning non-replies into errors.
    pub fn into_reply(self) -> Result<Message, ExchangeError> {
        match self.outcome {
            ExchangeOutcome::Replied(message) => Ok(message),
            ExchangeOutcome::TimedOut { after } => Err(ExchangeError::ReceiveTimeout {
                destination: self.reply_destination.unwrap_or_default(),
                timeout: after,
            }),
            ExchangeOutcome::Failed(err) => Err(err),
        }
    }
}
