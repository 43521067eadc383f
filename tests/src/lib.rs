//! # Sync-Relay Test Suite
//!
//! Cross-crate flows that exercise the correlation core over the
//! in-memory channel bus.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs       # Bus + orchestrator assembly
//!     ├── scenarios.rs      # Request/reply scenarios end to end
//!     ├── registry_flows.rs # Duplicate policy, retention, resolution
//!     └── concurrency.rs    # Parallel exchanges on shared destinations
//! benches/
//! └── exchange_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p relay-tests
//! cargo test -p relay-tests integration::scenarios::
//! cargo bench -p relay-tests
//! ```

pub mod integration;
