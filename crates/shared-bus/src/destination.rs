//! # Destination Queue
//!
//! A single named point-to-point destination: a bounded FIFO queue plus a
//! notification used to wake waiting receivers.
//!
//! ## Waiting
//!
//! A receiver registers interest in the notification *before* scanning the
//! queue, so a publish that lands between the scan and the wait still wakes
//! it. The wait itself is bounded by `tokio::time::timeout_at`.

use crate::error::BusError;
use parking_lot::Mutex;
use shared_types::{DestinationHandle, DestinationKind, Message, MessageSelector};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// A named message queue.
pub struct Destination {
    name: String,
    kind: DestinationKind,
    queue: Mutex<VecDeque<Message>>,
    notify: Notify,
    capacity: usize,
    removed: AtomicBool,
}

impl Destination {
    pub(crate) fn new(name: String, kind: DestinationKind, capacity: usize) -> Self {
        Self {
            name,
            kind,
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            capacity,
            removed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle that publishes to this destination.
    #[must_use]
    pub fn handle(&self) -> DestinationHandle {
        match self.kind {
            DestinationKind::Declared => DestinationHandle::declared(self.name.clone()),
            DestinationKind::Temporary => DestinationHandle::temporary(self.name.clone()),
        }
    }

    /// Number of queued messages.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.queue.lock().len()
    }

    /// Append a message and wake every waiting receiver.
    ///
    /// Returns the queue depth after the push.
    pub(crate) fn push(&self, message: Message) -> Result<usize, BusError> {
        let depth = {
            // `close` flips the flag under this lock
            let mut queue = self.queue.lock();
            if self.removed.load(Ordering::Acquire) {
                return Err(BusError::DestinationNotFound(self.name.clone()));
            }
            if queue.len() >= self.capacity {
                return Err(BusError::DestinationFull {
                    destination: self.name.clone(),
                    capacity: self.capacity,
                });
            }
            queue.push_back(message);
            queue.len()
        };

        // Receivers use different selectors, so all of them re-scan.
        self.notify.notify_waiters();
        Ok(depth)
    }

    /// Take the first queued message matching `selector`, waiting up to `timeout`.
    pub(crate) async fn receive_selected(
        &self,
        selector: &MessageSelector,
        timeout: Duration,
    ) -> Result<Message, BusError> {
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.removed.load(Ordering::Acquire) {
                return Err(BusError::DestinationRemoved(self.name.clone()));
            }

            if let Some(message) = self.take_first_matching(selector) {
                return Ok(message);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(BusError::Timeout {
                    destination: self.name.clone(),
                    timeout,
                });
            }
        }
    }

    /// Mark removed, drop queued messages and release waiting receivers.
    pub(crate) fn close(&self) -> usize {
        let dropped = {
            let mut queue = self.queue.lock();
            self.removed.store(true, Ordering::Release);
            let dropped = queue.len();
            queue.clear();
            dropped
        };
        self.notify.notify_waiters();
        dropped
    }

    fn take_first_matching(&self, selector: &MessageSelector) -> Option<Message> {
        let mut queue = self.queue.lock();
        let position = queue.iter().position(|m| selector.matches(m))?;
        queue.remove(position)
    }
}
