//! Inbound Ports (Driving Ports)
//!
//! The API that callers use to run request/reply exchanges.

use async_trait::async_trait;
use shared_types::{Message, MessageSelector};

use crate::domain::ExchangeReport;
use crate::error::ExchangeError;

/// Request/reply API (Driving Port)
#[async_trait]
pub trait RequestReplyApi: Send + Sync {
    /// Publish `request` to `destination` and wait for the correlated reply.
    ///
    /// Never fails: timeouts and transport errors are reported in the
    /// returned [`ExchangeReport`].
    async fn send_and_receive(&self, destination: &str, request: Message) -> ExchangeReport;

    /// Serve one request from `destination` and reply to its sender.
    ///
    /// Returns the request that was answered.
    async fn receive_and_reply<F>(
        &self,
        destination: &str,
        selector: &MessageSelector,
        respond: F,
    ) -> Result<Message, ExchangeError>
    where
        F: FnOnce(&Message) -> Message + Send;
}
