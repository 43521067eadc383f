//! # Integration Tests
//!
//! Requester and responder share one bus. Unless a test says otherwise
//! they also share one reply destination registry, as a single process
//! running both sides would.

#[cfg(test)]
pub mod fixtures;

mod concurrency;
mod registry_flows;
mod scenarios;
