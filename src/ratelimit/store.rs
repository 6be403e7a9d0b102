//! Counter store trait for abstracting over storage implementations.

use async_trait::async_trait;

use super::counter::Admission;
use super::policy::Policy;
use crate::error::Result;

/// Trait for counter store implementations.
///
/// This abstracts over the in-memory store and future networked
/// atomic-counter backends, so the limiter front end is identical for
/// both. Implementations must keep per-identifier admissions linearizable:
/// when one admission remains, two concurrent increments for the same
/// identifier must never both be admitted.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Record one request for `identifier` under `policy` at `now_ms`,
    /// admitting or rejecting it against the policy's window cap.
    async fn increment(&self, identifier: &str, policy: &Policy, now_ms: u64) -> Result<Admission>;

    /// Remove entries whose window ended before `now_ms`, returning how
    /// many were removed.
    async fn sweep(&self, now_ms: u64) -> Result<usize>;

    /// Number of identifiers currently tracked. In-memory stores report an
    /// exact figure; remote implementations may approximate.
    async fn len(&self) -> usize;

    /// Drop all counter state.
    async fn clear(&self);
}
