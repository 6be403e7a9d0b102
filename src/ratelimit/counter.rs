//! In-memory counter store with fixed-window semantics.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use super::policy::Policy;
use super::store::CounterStore;
use crate::error::Result;

/// Current time as milliseconds since the Unix epoch.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// One identifier's consumption within its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterEntry {
    /// Requests admitted so far in the current window
    pub count: u64,
    /// Epoch milliseconds at which the current window ends
    pub reset_at_ms: u64,
}

/// Outcome of a single counter update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Whether the request was admitted
    pub admitted: bool,
    /// Requests admitted so far in the window, including this one if it
    /// was admitted
    pub count: u64,
    /// Epoch milliseconds at which the window ends
    pub reset_at_ms: u64,
}

/// Thread-safe mapping from identifier to [`CounterEntry`] with fixed-window
/// semantics.
///
/// All mutation for one identifier happens under that identifier's map shard
/// lock, so concurrent requests for the same identifier serialize and the cap
/// is never over-admitted. An entry whose window has expired is replaced in
/// place by the next request, or removed wholesale by
/// [`remove_expired`](Self::remove_expired).
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    entries: DashMap<String, CounterEntry>,
}

impl MemoryCounterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Record one request for `identifier` under `policy` at time `now_ms`.
    ///
    /// A fresh window starts when no entry exists or the previous window has
    /// expired (`reset_at_ms <= now_ms`). Within a live window the count
    /// rises to `policy.max_requests` and no further: requests beyond the
    /// cap are rejected without incrementing, so a retry storm can neither
    /// inflate the count nor move the reset point.
    ///
    /// Assumes `policy.max_requests` is at least 1, which the policy table
    /// guarantees.
    pub fn record(&self, identifier: &str, policy: &Policy, now_ms: u64) -> Admission {
        let fresh_reset = now_ms.saturating_add(policy.window_ms);
        let mut admitted = true;
        let mut count = 1;
        let mut reset_at_ms = fresh_reset;

        self.entries
            .entry(identifier.to_string())
            .and_modify(|entry| {
                if entry.reset_at_ms <= now_ms {
                    // Expired window: start a fresh one in place.
                    *entry = CounterEntry {
                        count: 1,
                        reset_at_ms: fresh_reset,
                    };
                } else if entry.count >= policy.max_requests {
                    admitted = false;
                } else {
                    entry.count += 1;
                }
                count = entry.count;
                reset_at_ms = entry.reset_at_ms;
            })
            .or_insert_with(|| CounterEntry {
                count: 1,
                reset_at_ms: fresh_reset,
            });

        Admission {
            admitted,
            count,
            reset_at_ms,
        }
    }

    /// Remove every entry whose window ended before `now_ms`, returning how
    /// many were removed.
    ///
    /// Staleness is re-checked under the same shard lock [`record`](Self::record)
    /// takes, so an entry concurrently replaced with a fresh window survives
    /// the sweep. An entry resetting exactly at `now_ms` also survives; it is
    /// expired for counting purposes and the next request will recycle it.
    pub fn remove_expired(&self, now_ms: u64) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let live = entry.reset_at_ms >= now_ms;
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    /// Number of identifiers currently tracked.
    pub fn tracked(&self) -> usize {
        self.entries.len()
    }

    /// Current entry for an identifier, if any. Primarily useful for
    /// testing and introspection.
    pub fn entry(&self, identifier: &str) -> Option<CounterEntry> {
        self.entries.get(identifier).map(|entry| *entry.value())
    }

    /// Drop all entries.
    pub fn reset(&self) {
        self.entries.clear();
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, identifier: &str, policy: &Policy, now_ms: u64) -> Result<Admission> {
        Ok(self.record(identifier, policy, now_ms))
    }

    async fn sweep(&self, now_ms: u64) -> Result<usize> {
        Ok(self.remove_expired(now_ms))
    }

    async fn len(&self) -> usize {
        self.tracked()
    }

    async fn clear(&self) {
        self.reset();
    }
}
