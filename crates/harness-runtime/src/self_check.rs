//! # Loopback Self-Check
//!
//! Runs a responder and a requester against the same node. The responder
//! echoes each request's payload; the requester runs the exchanges one
//! after another and tallies the outcomes.

use std::sync::Arc;
use std::time::Duration;

use relay_telemetry::log_exchange_event;
use serde_json::json;
use shared_types::{headers, Message};
use sync_reply::{ExchangeOutcome, ExchangeReport, RequestReplyApi};
use tracing::{info, warn};

use crate::wiring::RelayNode;

/// Tally of a self-check run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SelfCheckSummary {
    pub requested: usize,
    pub replied: usize,
    pub timed_out: usize,
    pub failed: usize,
    /// Replies the responder published successfully
    pub served: usize,
}

impl SelfCheckSummary {
    /// Every requested exchange got its reply.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.replied == self.requested
    }

    fn record(&mut self, report: &ExchangeReport) {
        self.requested += 1;
        match report.outcome {
            ExchangeOutcome::Replied(_) => self.replied += 1,
            ExchangeOutcome::TimedOut { .. } => self.timed_out += 1,
            ExchangeOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Run `exchanges` loopback exchanges on `node`.
pub async fn run_self_check(
    node: Arc<RelayNode>,
    exchanges: usize,
    responder_delay: Duration,
) -> SelfCheckSummary {
    info!(exchanges, delay_ms = responder_delay.as_millis() as u64, "Starting self-check");

    let responder = tokio::spawn(serve(node.clone(), exchanges, responder_delay));

    let mut summary = SelfCheckSummary::default();
    for seq in 0..exchanges {
        let request = Message::new(json!({ "seq": seq }))
            .with_header(headers::CORRELATION_ID, format!("self-check-{}", seq));

        let report = node
            .orchestrator()
            .send_and_receive(node.request_destination(), request)
            .await;

        log_exchange_event!(
            info,
            "Self-check exchange completed",
            report.exchange_id,
            report.key,
            outcome = report.outcome.kind().as_str(),
            elapsed_ms = report.elapsed.as_millis() as u64
        );
        summary.record(&report);
    }

    summary.served = match responder.await {
        Ok(served) => served,
        Err(err) => {
            warn!(error = %err, "Self-check responder task failed");
            0
        }
    };

    info!(
        requested = summary.requested,
        replied = summary.replied,
        timed_out = summary.timed_out,
        failed = summary.failed,
        served = summary.served,
        "Self-check finished"
    );
    summary
}

/// Echo up to `count` requests, returning how many replies were published.
async fn serve(node: Arc<RelayNode>, count: usize, delay: Duration) -> usize {
    let orchestrator = node.orchestrator();
    let timeout = orchestrator.config().timeout;
    let mut served = 0;

    for _ in 0..count {
        let request = match orchestrator
            .receiver()
            .receive(node.request_destination(), timeout)
            .await
        {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "Responder stopped waiting for requests");
                break;
            }
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let reply = Message::new(json!({ "echo": request.payload().clone() }));
        match orchestrator.replier().reply(&request, reply).await {
            Ok(_) => served += 1,
            Err(err) => warn!(
                request_id = %request.id(),
                error = %err,
                "Responder could not deliver reply"
            ),
        }
    }

    served
}
