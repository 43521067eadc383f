//! Domain Layer - correlation, registry and exchange lifecycle
//!
//! This layer contains:
//! - Correlation keys and the strategies deriving them
//! - The reply destination registry
//! - The exchange state machine and its outcome types
//! - Configuration
//!
//! RULES:
//! - No transport I/O
//! - The only async code is the registry's retention sweeper

pub mod config;
pub mod correlation;
pub mod exchange;
pub mod registry;

pub use config::{ExchangeConfig, ExchangeConfigBuilder, DEFAULT_REPLY_TIMEOUT, DEFAULT_SWEEP_INTERVAL};
pub use correlation::{
    CorrelationKey, CorrelationKeyStrategy, CorrelationMode, ExpressionCorrelation,
    FixedKeyCorrelation, HeaderCorrelation,
};
pub use exchange::{Exchange, ExchangeOutcome, ExchangeReport, ExchangeState, OutcomeKind};
pub use registry::{
    retention_sweeper, DuplicatePolicy, PutOutcome, RegistrySnapshot, RegistryStats,
    ReplyDestinationRegistry,
};
