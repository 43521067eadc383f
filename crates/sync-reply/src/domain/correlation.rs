//! Correlation keys and the strategies that derive them.
//!
//! A strategy must be a pure, total function of the message: every message
//! yields a key, and the reserved default key is returned whenever nothing
//! more specific can be derived.
//!
//! # Example
//!
//! ```ignore
//! use sync_reply::domain::{CorrelationKeyStrategy, HeaderCorrelation};
//! use shared_types::Message;
//!
//! let strategy = HeaderCorrelation::new("correlation-id");
//! let msg = Message::text("ping").with_header("correlation-id", "order-42");
//! assert_eq!(strategy.derive_key(&msg).as_str(), "order-42");
//! ```

use crate::error::ExchangeError;
use serde::{Deserialize, Serialize};
use shared_types::Message;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Opaque key matching a reply to the request it answers.
///
/// The empty key is reserved for default-key mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the reserved key used when no correlation is configured.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default() {
            write!(f, "<default>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for CorrelationKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CorrelationKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Derives a correlation key from a message.
pub trait CorrelationKeyStrategy: Send + Sync + fmt::Debug {
    /// Derive the key. Must not fail and must not depend on anything but
    /// the message.
    fn derive_key(&self, message: &Message) -> CorrelationKey;

    /// Mark an outgoing reply so that `derive_key` yields `key` for it.
    ///
    /// Strategies that read the payload cannot do this and return the
    /// message unchanged.
    fn stamp(&self, message: Message, _key: &CorrelationKey) -> Message {
        message
    }

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Always yields the same key.
///
/// `FixedKeyCorrelation::default()` yields the reserved default key and is
/// the strategy installed when no correlation is configured.
#[derive(Debug, Clone, Default)]
pub struct FixedKeyCorrelation {
    key: CorrelationKey,
}

impl FixedKeyCorrelation {
    pub fn new(key: impl Into<CorrelationKey>) -> Self {
        Self { key: key.into() }
    }
}

impl CorrelationKeyStrategy for FixedKeyCorrelation {
    fn derive_key(&self, _message: &Message) -> CorrelationKey {
        self.key.clone()
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Uses the value of a header as the key.
#[derive(Debug, Clone)]
pub struct HeaderCorrelation {
    header: String,
}

impl HeaderCorrelation {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }

    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }
}

impl CorrelationKeyStrategy for HeaderCorrelation {
    fn derive_key(&self, message: &Message) -> CorrelationKey {
        match message.header(&self.header).map(str::trim) {
            Some(value) if !value.is_empty() => CorrelationKey::new(value),
            _ => {
                debug!(
                    header = %self.header,
                    message_id = %message.id(),
                    "Correlation header missing, using default key"
                );
                CorrelationKey::default()
            }
        }
    }

    fn stamp(&self, message: Message, key: &CorrelationKey) -> Message {
        if key.is_default() || message.header(&self.header).is_some() {
            return message;
        }
        message.with_header(self.header.clone(), key.as_str())
    }

    fn name(&self) -> &'static str {
        "header"
    }
}

/// Evaluates a JSON pointer (RFC 6901) against the payload.
///
/// Strings are used verbatim; numbers and booleans are rendered as text.
/// Anything else, including a missing value, yields the default key.
#[derive(Debug, Clone)]
pub struct ExpressionCorrelation {
    pointer: String,
}

impl ExpressionCorrelation {
    /// Create the strategy, rejecting malformed pointers.
    ///
    /// The empty pointer addresses the whole payload.
    pub fn new(pointer: impl Into<String>) -> Result<Self, ExchangeError> {
        let pointer = pointer.into();
        if !pointer.is_empty() && !pointer.starts_with('/') {
            return Err(ExchangeError::InvalidConfig(format!(
                "correlation expression '{}' must be empty or start with '/'",
                pointer
            )));
        }
        Ok(Self { pointer })
    }

    #[must_use]
    pub fn pointer(&self) -> &str {
        &self.pointer
    }
}

impl CorrelationKeyStrategy for ExpressionCorrelation {
    fn derive_key(&self, message: &Message) -> CorrelationKey {
        use serde_json::Value;

        match message.payload().pointer(&self.pointer) {
            Some(Value::String(s)) if !s.is_empty() => CorrelationKey::new(s.clone()),
            Some(Value::Number(n)) => CorrelationKey::new(n.to_string()),
            Some(Value::Bool(b)) => CorrelationKey::new(b.to_string()),
            _ => {
                debug!(
                    pointer = %self.pointer,
                    message_id = %message.id(),
                    "Correlation expression yielded no scalar, using default key"
                );
                CorrelationKey::default()
            }
        }
    }

    fn name(&self) -> &'static str {
        "expression"
    }
}

/// Per-exchange correlation toggle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CorrelationMode {
    /// Default-key mode: at most one exchange in flight per destination pair.
    #[default]
    None,
    /// Correlate on a header value.
    Header { name: String },
    /// Correlate on a JSON pointer into the payload.
    Expression { pointer: String },
}

impl CorrelationMode {
    /// Build the strategy this mode selects.
    pub fn build_strategy(&self) -> Result<Arc<dyn CorrelationKeyStrategy>, ExchangeError> {
        match self {
            CorrelationMode::None => Ok(Arc::new(FixedKeyCorrelation::default())),
            CorrelationMode::Header { name } => {
                if name.trim().is_empty() {
                    return Err(ExchangeError::InvalidConfig(
                        "correlation header name cannot be blank".to_string(),
                    ));
                }
                Ok(Arc::new(HeaderCorrelation::new(name.trim())))
            }
            CorrelationMode::Expression { pointer } => {
                Ok(Arc::new(ExpressionCorrelation::new(pointer.clone())?))
            }
        }
    }
}

/// Key for `message`, or the default key when no strategy is installed.
pub(crate) fn key_for(
    strategy: Option<&Arc<dyn CorrelationKeyStrategy>>,
    message: &Message,
) -> CorrelationKey {
    strategy
        .map(|s| s.derive_key(message))
        .unwrap_or_default()
}
