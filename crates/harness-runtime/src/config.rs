//! # Runtime Configuration
//!
//! Everything the harness needs to start, read from the environment.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RELAY_REQUEST_DESTINATION` | `relay.requests` | Destination the responder serves |
//! | `RELAY_SELF_CHECK_EXCHANGES` | `3` | Loopback exchanges run at startup |
//! | `RELAY_RESPONDER_DELAY_MS` | `0` | Delay before the responder replies |
//!
//! Exchange and telemetry settings come from `ExchangeConfig::from_env` and
//! `TelemetryConfig::from_env`.

use std::time::Duration;

use relay_telemetry::TelemetryConfig;
use sync_reply::{ExchangeConfig, ExchangeError};
use thiserror::Error;

pub const DEFAULT_REQUEST_DESTINATION: &str = "relay.requests";
pub const DEFAULT_SELF_CHECK_EXCHANGES: usize = 3;

/// Complete harness configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Destination the loopback responder receives requests on.
    pub request_destination: String,
    /// Number of exchanges the self-check runs.
    pub self_check_exchanges: usize,
    /// Time the responder waits before replying.
    pub responder_delay: Duration,
    /// Correlation core settings.
    pub exchange: ExchangeConfig,
    /// Logging settings.
    pub telemetry: TelemetryConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            request_destination: DEFAULT_REQUEST_DESTINATION.to_string(),
            self_check_exchanges: DEFAULT_SELF_CHECK_EXCHANGES,
            responder_delay: Duration::ZERO,
            exchange: ExchangeConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be an unsigned integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("request destination must not be blank")]
    BlankDestination,

    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

impl RuntimeConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|name| std::env::var(name).ok())?;
        config.exchange = ExchangeConfig::from_env()?;
        config.telemetry = TelemetryConfig::from_env();
        Ok(config)
    }

    /// Harness settings from an arbitrary variable source.
    ///
    /// Exchange and telemetry settings keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(destination) = lookup("RELAY_REQUEST_DESTINATION") {
            let destination = destination.trim();
            if destination.is_empty() {
                return Err(ConfigError::BlankDestination);
            }
            config.request_destination = destination.to_string();
        }

        if let Some(count) = lookup("RELAY_SELF_CHECK_EXCHANGES") {
            config.self_check_exchanges = parse_number("RELAY_SELF_CHECK_EXCHANGES", &count)?;
        }

        if let Some(delay) = lookup("RELAY_RESPONDER_DELAY_MS") {
            let millis = parse_number("RELAY_RESPONDER_DELAY_MS", &delay)?;
            config.responder_delay = Duration::from_millis(millis as u64);
        }

        Ok(config)
    }
}

fn parse_number(name: &'static str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            name,
            value: value.to_string(),
        })
}
