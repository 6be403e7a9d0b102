//! Core limiter implementation: named policies bound to a counter store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::counter::{epoch_millis, MemoryCounterStore};
use super::policy::{Policy, PolicyTable};
use super::store::CounterStore;
use crate::config::{FailureMode, TurnstileConfig};
use crate::error::{Result, TurnstileError};

/// The outcome of one admission check, with the quota metadata a caller
/// surfaces to its client.
///
/// A rejected decision means the caller should answer "too many requests"
/// and pass along `limit`, `remaining` and a retry hint; an admitted one
/// means proceed, optionally exposing the same fields as informational
/// headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Total requests permitted within the window
    pub limit: u64,
    /// Requests still available before the cap
    pub remaining: u64,
    /// Epoch milliseconds at which the window resets
    pub reset_at_ms: u64,
}

impl Decision {
    /// How long a rejected caller should wait before retrying, measured
    /// from `now_ms`. Zero once the reset point has passed.
    pub fn retry_after(&self, now_ms: u64) -> Duration {
        Duration::from_millis(self.reset_at_ms.saturating_sub(now_ms))
    }

    /// Seconds until the window resets, rounded up so a client that waits
    /// this long always lands in a fresh window. Suitable for a
    /// `Retry-After` header.
    pub fn retry_after_secs(&self, now_ms: u64) -> u64 {
        self.reset_at_ms.saturating_sub(now_ms).div_ceil(1_000)
    }

    /// The reset point as a UTC timestamp.
    pub fn reset_time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.reset_at_ms as i64)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// The admission-control front end used by request handlers.
///
/// Binds a counter store to the table of named policies. One instance is
/// created at process startup, shared across handlers, and shut down on
/// exit; instances are fully isolated, so tests construct their own
/// instead of sharing process state.
pub struct RateLimiter {
    /// Counter storage shared with the sweep task
    store: Arc<dyn CounterStore>,
    /// Named policy table, immutable after construction
    policies: PolicyTable,
    /// Behavior when the store cannot be consulted
    failure_mode: FailureMode,
    /// Periodic sweep task, present until shutdown
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    /// Create a limiter backed by the in-memory counter store.
    ///
    /// When the configured sweep interval is non-zero this spawns the
    /// sweep task, so it must be called from within a tokio runtime.
    pub fn new(config: TurnstileConfig) -> Result<Self> {
        Self::with_store(config, Arc::new(MemoryCounterStore::new()))
    }

    /// Create a limiter over a caller-provided counter store.
    ///
    /// This is the seam for substituting a networked atomic-counter
    /// backend; the check contract is identical for every store.
    pub fn with_store(config: TurnstileConfig, store: Arc<dyn CounterStore>) -> Result<Self> {
        let policies = PolicyTable::with_overrides(&config.policies)?;

        let sweeper = config
            .sweep_interval()
            .map(|interval| Self::spawn_sweeper(store.clone(), interval));

        info!(
            policies = policies.len(),
            sweep_interval_secs = config.sweep_interval_secs,
            failure_mode = ?config.failure_mode,
            "Admission limiter initialized"
        );

        Ok(Self {
            store,
            policies,
            failure_mode: config.failure_mode,
            sweeper: Mutex::new(sweeper),
        })
    }

    /// Check whether `identifier` may proceed under the named policy.
    ///
    /// Rejection is a normal outcome (`allowed` is false), not an error.
    /// An unknown `policy_name` is a wiring mistake in the embedding
    /// service and the only error a correctly configured caller can see
    /// with the in-memory store.
    pub async fn check(&self, identifier: &str, policy_name: &str) -> Result<Decision> {
        let policy = self.policy(policy_name)?;
        let now_ms = epoch_millis();

        match self.store.increment(identifier, &policy, now_ms).await {
            Ok(admission) => Ok(Decision {
                allowed: admission.admitted,
                limit: policy.max_requests,
                remaining: policy.max_requests.saturating_sub(admission.count),
                reset_at_ms: admission.reset_at_ms,
            }),
            Err(e) => {
                warn!(
                    policy = policy_name,
                    failure_mode = ?self.failure_mode,
                    error = %e,
                    "Counter store unavailable, applying failure mode"
                );
                Ok(Decision {
                    allowed: self.failure_mode == FailureMode::FailOpen,
                    limit: policy.max_requests,
                    remaining: 0,
                    reset_at_ms: now_ms.saturating_add(policy.window_ms),
                })
            }
        }
    }

    /// Resolve a policy by name.
    ///
    /// Lets an embedding service validate its endpoint-to-policy wiring at
    /// startup instead of discovering a typo on the first request.
    pub fn policy(&self, name: &str) -> Result<Policy> {
        self.policies
            .get(name)
            .copied()
            .ok_or_else(|| TurnstileError::UnknownPolicy(name.to_string()))
    }

    /// Number of identifiers currently tracked by the store.
    pub async fn active_identifiers(&self) -> usize {
        self.store.len().await
    }

    /// Stop the sweep task and drop all counter state.
    ///
    /// Idempotent: a second call, or dropping the limiter afterwards, is
    /// a no-op.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
            info!("Admission limiter shut down");
        }
        self.store.clear().await;
    }

    fn spawn_sweeper(store: Arc<dyn CounterStore>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match store.sweep(epoch_millis()).await {
                    Ok(removed) if removed > 0 => {
                        debug!(removed, "Swept expired counters");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "Counter sweep failed");
                    }
                }
            }
        })
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
    }
}
