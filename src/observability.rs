//! Metrics hook for the orchestrator.

use crate::error::Error;
use std::time::Duration;

/// Receives one event per [`FnCache::get`](crate::FnCache::get) outcome.
///
/// All methods default to doing nothing, so implementors only override the
/// events they care about.
pub trait CacheMetrics: Send + Sync {
    /// Value served from the cache layer.
    fn record_hit(&self, _elapsed: Duration) {}

    /// Cache layer missed and the compute function ran.
    fn record_miss(&self, _elapsed: Duration) {}

    /// A call failed, or a computed value could not be stored.
    fn record_error(&self, _error: &Error) {}
}

/// Default metrics sink.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {}
