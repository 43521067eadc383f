//! # Message Model
//!
//! The message exchanged over every transport: an opaque JSON payload plus a
//! string header map and an optional reply-destination facet.
//!
//! ## Reply Destinations
//!
//! A request expecting a reply names where the reply must go, either
//! inline (a resolved `DestinationHandle`, e.g. a temporary reply queue) or
//! by name (resolved by the receiver through a destination resolver).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Well-known header names.
pub mod headers {
    /// Conventional header carrying the correlation value of an exchange.
    pub const CORRELATION_ID: &str = "correlation-id";

    /// Reply destination carried by name as a plain header.
    ///
    /// Only consulted when the message has no dedicated reply facet.
    pub const REPLY_TO: &str = "reply-to";
}

/// How a destination came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DestinationKind {
    /// Declared up front by name.
    Declared,
    /// Opened anonymously for the lifetime of one exchange.
    Temporary,
}

/// A resolved, immutable handle to a destination a message can be published to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DestinationHandle {
    name: String,
    kind: DestinationKind,
}

impl DestinationHandle {
    /// Handle to a declared destination.
    pub fn declared(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DestinationKind::Declared,
        }
    }

    /// Handle to a temporary destination.
    pub fn temporary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DestinationKind::Temporary,
        }
    }

    /// Transport-specific destination name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> DestinationKind {
        self.kind
    }

    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.kind == DestinationKind::Temporary
    }
}

impl fmt::Display for DestinationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Where a reply must be published, as carried by an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyDestination {
    /// A handle embedded directly in the message.
    Inline(DestinationHandle),
    /// A name that must be resolved before use.
    Named(String),
}

/// A message: JSON payload, headers and an optional reply destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: Uuid,
    /// Creation time in milliseconds since the Unix epoch.
    timestamp: u64,
    headers: BTreeMap<String, String>,
    reply_to: Option<ReplyDestination>,
    payload: serde_json::Value,
}

impl Message {
    /// Create a message with the given payload and no headers.
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: current_timestamp_ms(),
            headers: BTreeMap::new(),
            reply_to: None,
            payload,
        }
    }

    /// Create a message with a plain text payload.
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(serde_json::Value::String(body.into()))
    }

    /// Add or replace a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach a reply destination.
    #[must_use]
    pub fn with_reply_to(mut self, reply_to: ReplyDestination) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Look up a header value.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    #[must_use]
    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// The dedicated reply facet only, ignoring headers.
    #[must_use]
    pub fn reply_to(&self) -> Option<&ReplyDestination> {
        self.reply_to.as_ref()
    }

    /// The reply destination of this message, if any.
    ///
    /// The dedicated reply facet wins; otherwise a non-blank
    /// [`headers::REPLY_TO`] header is read as a named destination.
    #[must_use]
    pub fn reply_destination(&self) -> Option<ReplyDestination> {
        if let Some(reply_to) = &self.reply_to {
            return Some(reply_to.clone());
        }

        self.header(headers::REPLY_TO)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| ReplyDestination::Named(name.to_string()))
    }
}

fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
