//! Exchange configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use sync_reply::domain::{CorrelationMode, ExchangeConfigBuilder};
//! use std::time::Duration;
//!
//! let config = ExchangeConfigBuilder::new()
//!     .correlation(CorrelationMode::Header { name: "correlation-id".into() })
//!     .timeout(Duration::from_secs(2))
//!     .build()
//!     .expect("Valid config");
//! ```

use crate::domain::correlation::CorrelationMode;
use crate::domain::registry::{DuplicatePolicy, ReplyDestinationRegistry};
use crate::error::ExchangeError;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default reply timeout.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default interval of the retention sweeper.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Settings shared by the receiver, replier and orchestrator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// How correlation keys are derived
    pub correlation: CorrelationMode,
    /// How long a receive waits for a matching message
    pub timeout: Duration,
    /// Behaviour when a key already holds a live reply destination
    pub duplicate_policy: DuplicatePolicy,
    /// Age after which unclaimed reply destinations are dropped. `None` keeps them.
    pub retention: Option<Duration>,
    /// Interval of the retention sweeper
    pub sweep_interval: Duration,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            correlation: CorrelationMode::None,
            timeout: DEFAULT_REPLY_TIMEOUT,
            duplicate_policy: DuplicatePolicy::Overwrite,
            retention: None,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl ExchangeConfig {
    /// Validate timeouts and the correlation settings.
    pub fn validate(&self) -> Result<(), ExchangeError> {
        if self.timeout.is_zero() {
            return Err(ExchangeError::InvalidConfig(
                "reply timeout cannot be 0".to_string(),
            ));
        }

        if self.retention.is_some_and(|r| r.is_zero()) {
            return Err(ExchangeError::InvalidConfig(
                "retention window cannot be 0".to_string(),
            ));
        }

        if self.sweep_interval.is_zero() {
            return Err(ExchangeError::InvalidConfig(
                "sweep interval cannot be 0".to_string(),
            ));
        }

        self.correlation.build_strategy().map(|_| ())
    }

    /// Registry configured with this policy and retention window.
    pub fn registry(&self) -> ReplyDestinationRegistry {
        ReplyDestinationRegistry::with_policy(self.duplicate_policy, self.retention)
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RELAY_CORRELATION`: `none`, `header` or `expression` (default: none)
    /// - `RELAY_CORRELATION_HEADER`: Header name (default: correlation-id)
    /// - `RELAY_CORRELATION_EXPRESSION`: JSON pointer into the payload
    /// - `RELAY_REPLY_TIMEOUT_MS`: Reply timeout (default: 5000)
    /// - `RELAY_DUPLICATE_POLICY`: `overwrite` or `reject` (default: overwrite)
    /// - `RELAY_RETENTION_MS`: Retention window, unset keeps entries
    /// - `RELAY_SWEEP_INTERVAL_MS`: Retention sweeper interval (default: 30000)
    pub fn from_env() -> Result<Self, ExchangeError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ExchangeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let correlation = match lookup("RELAY_CORRELATION")
            .map(|v| v.trim().to_lowercase())
            .as_deref()
        {
            None | Some("") | Some("none") => CorrelationMode::None,
            Some("header") => CorrelationMode::Header {
                name: lookup("RELAY_CORRELATION_HEADER")
                    .unwrap_or_else(|| shared_types::headers::CORRELATION_ID.to_string()),
            },
            Some("expression") => CorrelationMode::Expression {
                pointer: lookup("RELAY_CORRELATION_EXPRESSION").ok_or_else(|| {
                    ExchangeError::InvalidConfig(
                        "RELAY_CORRELATION_EXPRESSION is required for expression correlation"
                            .to_string(),
                    )
                })?,
            },
            Some(other) => {
                return Err(ExchangeError::InvalidConfig(format!(
                    "unknown correlation mode '{}'",
                    other
                )))
            }
        };

        let duplicate_policy = match lookup("RELAY_DUPLICATE_POLICY")
            .map(|v| v.trim().to_lowercase())
            .as_deref()
        {
            None | Some("") | Some("overwrite") => DuplicatePolicy::Overwrite,
            Some("reject") => DuplicatePolicy::Reject,
            Some(other) => {
                return Err(ExchangeError::InvalidConfig(format!(
                    "unknown duplicate policy '{}'",
                    other
                )))
            }
        };

        let config = Self {
            correlation,
            timeout: parse_millis(&lookup, "RELAY_REPLY_TIMEOUT_MS")?.unwrap_or(defaults.timeout),
            duplicate_policy,
            retention: parse_millis(&lookup, "RELAY_RETENTION_MS")?,
            sweep_interval: parse_millis(&lookup, "RELAY_SWEEP_INTERVAL_MS")?
                .unwrap_or(defaults.sweep_interval),
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_millis<F>(lookup: &F, name: &str) -> Result<Option<Duration>, ExchangeError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| ExchangeError::InvalidConfig(format!("{} must be milliseconds, got '{}'", name, raw))),
    }
}

/// Builder for ExchangeConfig with validation
#[derive(Default)]
pub struct ExchangeConfigBuilder {
    correlation: Option<CorrelationMode>,
    timeout: Option<Duration>,
    duplicate_policy: Option<DuplicatePolicy>,
    retention: Option<Duration>,
    sweep_interval: Option<Duration>,
}

impl ExchangeConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn correlation(mut self, mode: CorrelationMode) -> Self {
        self.correlation = Some(mode);
        self
    }

    /// Correlate on a header value.
    pub fn correlate_on_header(self, name: impl Into<String>) -> Self {
        self.correlation(CorrelationMode::Header { name: name.into() })
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = Some(policy);
        self
    }

    pub fn retention(mut self, retention: Duration) -> Self {
        self.retention = Some(retention);
        self
    }

    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Build and validate
    pub fn build(self) -> Result<ExchangeConfig, ExchangeError> {
        let defaults = ExchangeConfig::default();
        let config = ExchangeConfig {
            correlation: self.correlation.unwrap_or(defaults.correlation),
            timeout: self.timeout.unwrap_or(defaults.timeout),
            duplicate_policy: self.duplicate_policy.unwrap_or(defaults.duplicate_policy),
            retention: self.retention.or(defaults.retention),
            sweep_interval: self.sweep_interval.unwrap_or(defaults.sweep_interval),
        };
        config.validate()?;
        Ok(config)
    }
}
