//! Reply Destination Registry - correlation key to reply destination.
//!
//! Flow:
//! 1. A receiver takes a request and derives its correlation key
//! 2. The receiver calls `put()` with the request's reply destination
//! 3. A replier derives the same key and calls `take_by_key()`
//! 4. The entry is gone; a second take for the same key finds nothing
//!
//! Entries that are never taken can be bounded by a retention window,
//! enforced lazily on take and eagerly by `retention_sweeper`.

use crate::domain::correlation::CorrelationKey;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use shared_types::DestinationHandle;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// What `put` does when the key already holds a live entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Last write wins. The displaced destination is reported as stale.
    #[default]
    Overwrite,
    /// Keep the existing entry and refuse the new one.
    Reject,
}

/// Result of storing a reply destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// No live entry existed for the key.
    Inserted,
    /// A live entry was displaced; its requester will never get a reply.
    Replaced { previous: DestinationHandle },
    /// The existing entry was kept (`DuplicatePolicy::Reject`).
    Rejected,
}

impl PutOutcome {
    /// True if the new destination is now stored.
    #[must_use]
    pub fn is_stored(&self) -> bool {
        !matches!(self, PutOutcome::Rejected)
    }
}

/// A stored reply destination
struct RegistryEntry {
    handle: DestinationHandle,
    stored_at: Instant,
}

/// Statistics for the registry
#[derive(Debug, Default)]
pub struct RegistryStats {
    /// Entries stored without displacing anything
    pub inserted: AtomicU64,
    /// Live entries displaced under `Overwrite`
    pub replaced: AtomicU64,
    /// Puts refused under `Reject`
    pub rejected: AtomicU64,
    /// Successful takes
    pub taken: AtomicU64,
    /// Takes that found nothing
    pub misses: AtomicU64,
    /// Entries dropped by the retention window
    pub expired: AtomicU64,
    /// Entries removed by `discard`
    pub discarded: AtomicU64,
}

/// Point-in-time copy of [`RegistryStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub inserted: u64,
    pub replaced: u64,
    pub rejected: u64,
    pub taken: u64,
    pub misses: u64,
    pub expired: u64,
    pub discarded: u64,
    pub live: usize,
}

/// Concurrent map from correlation key to reply destination.
///
/// Each key maps to at most one destination, and a successful take
/// removes it atomically: two concurrent takes for one key never both
/// succeed.
pub struct ReplyDestinationRegistry {
    entries: DashMap<CorrelationKey, RegistryEntry>,
    policy: DuplicatePolicy,
    retention: Option<Duration>,
    stats: Arc<RegistryStats>,
}

impl ReplyDestinationRegistry {
    /// Registry with `Overwrite` policy and no retention window.
    pub fn new() -> Self {
        Self::with_policy(DuplicatePolicy::default(), None)
    }

    pub fn with_policy(policy: DuplicatePolicy, retention: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            policy,
            retention,
            stats: Arc::new(RegistryStats::default()),
        }
    }

    /// Store the reply destination for `key`.
    pub fn put(&self, key: CorrelationKey, handle: DestinationHandle) -> PutOutcome {
        let entry = RegistryEntry {
            handle,
            stored_at: Instant::now(),
        };

        match self.policy {
            DuplicatePolicy::Overwrite => {
                let log_key = key.clone();
                let stored = entry.handle.clone();
                match self.entries.insert(key, entry) {
                    Some(previous) if !self.is_expired(&previous) => {
                        self.stats.replaced.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            key = %log_key,
                            previous = %previous.handle,
                            destination = %stored,
                            "Reply destination replaced, earlier requester will not receive a reply"
                        );
                        PutOutcome::Replaced {
                            previous: previous.handle,
                        }
                    }
                    Some(_) => {
                        self.stats.expired.fetch_add(1, Ordering::Relaxed);
                        self.stats.inserted.fetch_add(1, Ordering::Relaxed);
                        debug!(key = %log_key, destination = %stored, "Reply destination stored over expired entry");
                        PutOutcome::Inserted
                    }
                    None => {
                        self.stats.inserted.fetch_add(1, Ordering::Relaxed);
                        debug!(key = %log_key, destination = %stored, "Reply destination stored");
                        PutOutcome::Inserted
                    }
                }
            }
            DuplicatePolicy::Reject => match self.entries.entry(key) {
                Entry::Occupied(mut occupied) => {
                    if self.is_expired(occupied.get()) {
                        debug!(key = %occupied.key(), destination = %entry.handle, "Reply destination stored over expired entry");
                        occupied.insert(entry);
                        self.stats.expired.fetch_add(1, Ordering::Relaxed);
                        self.stats.inserted.fetch_add(1, Ordering::Relaxed);
                        PutOutcome::Inserted
                    } else {
                        warn!(
                            key = %occupied.key(),
                            existing = %occupied.get().handle,
                            refused = %entry.handle,
                            "Reply destination already registered, keeping existing entry"
                        );
                        self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                        PutOutcome::Rejected
                    }
                }
                Entry::Vacant(vacant) => {
                    debug!(key = %vacant.key(), destination = %entry.handle, "Reply destination stored");
                    vacant.insert(entry);
                    self.stats.inserted.fetch_add(1, Ordering::Relaxed);
                    PutOutcome::Inserted
                }
            },
        }
    }

    /// Remove and return the destination stored under `key`.
    ///
    /// Returns `None` if nothing is stored or the entry outlived the
    /// retention window.
    pub fn take_by_key(&self, key: &CorrelationKey) -> Option<DestinationHandle> {
        match self.entries.remove(key) {
            Some((_, entry)) if self.is_expired(&entry) => {
                self.stats.expired.fetch_add(1, Ordering::Relaxed);
                debug!(
                    key = %key,
                    age_ms = entry.stored_at.elapsed().as_millis(),
                    "Reply destination expired before take"
                );
                None
            }
            Some((_, entry)) => {
                self.stats.taken.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, destination = %entry.handle, "Reply destination taken");
                Some(entry.handle)
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "No reply destination for key");
                None
            }
        }
    }

    /// Take the destination stored under the default key.
    pub fn take_default(&self) -> Option<DestinationHandle> {
        self.take_by_key(&CorrelationKey::default())
    }

    /// Drop the entry for `key` without counting it as a take.
    ///
    /// Returns true if an entry was removed.
    pub fn discard(&self, key: &CorrelationKey) -> bool {
        if self.entries.remove(key).is_some() {
            self.stats.discarded.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Reply destination discarded");
            true
        } else {
            false
        }
    }

    /// Check whether a live entry exists for `key`.
    pub fn contains(&self, key: &CorrelationKey) -> bool {
        self.entries
            .get(key)
            .map(|entry| !self.is_expired(&entry))
            .unwrap_or(false)
    }

    /// Number of stored entries, expired ones not yet purged included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry older than the retention window.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let Some(retention) = self.retention else {
            return 0;
        };

        let now = Instant::now();
        let mut removed = 0;

        self.entries.retain(|key, entry| {
            let age = now.duration_since(entry.stored_at);
            if age > retention {
                warn!(
                    key = %key,
                    destination = %entry.handle,
                    age_ms = age.as_millis(),
                    retention_ms = retention.as_millis(),
                    "Removing unclaimed reply destination"
                );
                removed += 1;
                false
            } else {
                true
            }
        });

        self.stats
            .expired
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    #[must_use]
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    #[must_use]
    pub fn retention(&self) -> Option<Duration> {
        self.retention
    }

    /// Get statistics
    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }

    /// Copy the counters and the live entry count.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            inserted: self.stats.inserted.load(Ordering::Relaxed),
            replaced: self.stats.replaced.load(Ordering::Relaxed),
            rejected: self.stats.rejected.load(Ordering::Relaxed),
            taken: self.stats.taken.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            expired: self.stats.expired.load(Ordering::Relaxed),
            discarded: self.stats.discarded.load(Ordering::Relaxed),
            live: self.entries.len(),
        }
    }

    fn is_expired(&self, entry: &RegistryEntry) -> bool {
        self.retention
            .map(|retention| entry.stored_at.elapsed() > retention)
            .unwrap_or(false)
    }
}

impl Default for ReplyDestinationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Background task that purges unclaimed reply destinations.
pub async fn retention_sweeper(registry: Arc<ReplyDestinationRegistry>, interval: Duration) {
    let mut sweep_interval = tokio::time::interval(interval);
    sweep_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        sweep_interval.tick().await;
        let removed = registry.purge_expired();
        if removed > 0 {
            debug!(removed = removed, "Swept unclaimed reply destinations");
        }
    }
}
