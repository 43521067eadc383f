//! # Harness Runtime Library
//!
//! Exposes the runtime's modules for testing. The main entry point is the
//! `main.rs` binary.
//!
//! - `config` - environment-driven configuration
//! - `recorder` - Prometheus implementation of the core metrics hooks
//! - `wiring` - bus, transport adapter and orchestrator assembly
//! - `self_check` - loopback responder and requester

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod recorder;
pub mod self_check;
pub mod wiring;

pub use config::{ConfigError, RuntimeConfig};
pub use recorder::PrometheusRecorder;
pub use self_check::{run_self_check, SelfCheckSummary};
pub use wiring::RelayNode;
