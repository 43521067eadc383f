//! # Sync-Relay Harness
//!
//! Starts a relay node over the in-memory channel bus and proves the
//! request/reply path with a loopback self-check.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Install logging and register metrics
//! 3. Wire bus, transport adapter and orchestrator
//! 4. Start the retention sweeper (if configured)
//! 5. Run the self-check and report the outcome

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, info, info_span, Instrument};

use harness_runtime::{run_self_check, RelayNode, RuntimeConfig};
use relay_telemetry::{encode_metrics, init_telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env().context("Failed to load configuration")?;
    let _telemetry =
        init_telemetry(config.telemetry.clone()).context("Failed to initialize telemetry")?;

    let span = info_span!("relay", service = %config.telemetry.service_name);
    run(config).instrument(span).await
}

async fn run(config: RuntimeConfig) -> Result<()> {
    info!("===========================================");
    info!("  Sync-Relay Harness v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let node = Arc::new(RelayNode::new(&config).context("Failed to wire relay node")?);
    let sweeper = node.start_background_tasks();

    let summary = run_self_check(
        node.clone(),
        config.self_check_exchanges,
        config.responder_delay,
    )
    .await;

    node.report_registry_size();
    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    match encode_metrics() {
        Ok(text) => debug!(metrics = %text, "Final metrics"),
        Err(err) => debug!(error = %err, "Unable to encode metrics"),
    }

    if !summary.is_healthy() {
        bail!(
            "self-check failed: {} of {} exchanges replied ({} timed out, {} failed)",
            summary.replied,
            summary.requested,
            summary.timed_out,
            summary.failed
        );
    }

    info!(replied = summary.replied, "Self-check passed");
    Ok(())
}
