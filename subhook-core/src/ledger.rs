// File: subhook-core/src/ledger.rs

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

/// With a retention window, expired ids are swept after this many new records.
const PRUNE_EVERY: u64 = 1024;

/// Delivery ids already processed, so retried deliveries dispatch at most once.
///
/// Without a retention window the history grows for the life of the process.
/// With one, an id is forgotten once it is older than the window; retries
/// arriving after that would be processed again.
pub struct NotificationLedger {
    entries: DashMap<String, Instant>,
    retention: Option<Duration>,
    recorded: AtomicU64,
}

impl NotificationLedger {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            retention: None,
            recorded: AtomicU64::new(0),
        }
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            retention: Some(retention),
            ..Self::new()
        }
    }

    fn expired(&self, recorded_at: Instant, now: Instant) -> bool {
        self.retention
            .is_some_and(|keep| now.saturating_duration_since(recorded_at) > keep)
    }

    /// Returns false the first time an id is offered (and records it), true afterwards.
    /// Check and record happen under one shard lock.
    pub fn seen(&self, delivery_id: &str) -> bool {
        let now = Instant::now();
        let already = match self.entries.entry(delivery_id.to_string()) {
            Entry::Occupied(mut slot) => {
                if self.expired(*slot.get(), now) {
                    slot.insert(now);
                    false
                } else {
                    true
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                false
            }
        };

        if !already && self.retention.is_some() {
            let n = self.recorded.fetch_add(1, Ordering::Relaxed) + 1;
            if n % PRUNE_EVERY == 0 {
                self.prune();
            }
        }
        already
    }

    pub fn contains(&self, delivery_id: &str) -> bool {
        self.entries.contains_key(delivery_id)
    }

    /// Drops ids older than the retention window. Returns how many were removed.
    pub fn prune(&self) -> usize {
        if self.retention.is_none() {
            return 0;
        }
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, recorded_at| !self.expired(*recorded_at, now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!("[EventSub] ledger pruned {} expired delivery ids", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NotificationLedger {
    fn default() -> Self {
        Self::new()
    }
}
