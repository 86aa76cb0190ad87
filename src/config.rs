//! Cache configuration shared by the orchestrator and the in-memory backend.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest sweep interval the in-memory backend will tick at.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// How the in-memory backend holds on to stored values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Retention {
    /// Keep only a weak reference. The entry disappears as soon as the last
    /// outside `Arc` is dropped, even if its TTL has not elapsed. A cache
    /// whose callers drop each result right away therefore recomputes on
    /// every call.
    #[default]
    Weak,
    /// Keep a strong reference. Only TTL expiry or deletion removes the entry.
    /// This is the setting for plain memoization.
    Strong,
}

/// TTL configuration.
///
/// # Example
///
/// ```
/// use fncache::CacheConfig;
/// use std::time::Duration;
///
/// let config = CacheConfig::new(Duration::from_secs(60))
///     .with_check_interval(Duration::from_secs(10));
/// assert_eq!(config.sweep_interval(), Duration::from_secs(10));
///
/// // Without an explicit interval the sweeper runs at half the TTL.
/// let config = CacheConfig::new(Duration::from_secs(60));
/// assert_eq!(config.sweep_interval(), Duration::from_secs(30));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL applied to stored entries. Must be non-zero.
    pub cache_duration: Duration,
    /// Sweep interval. `None` or zero falls back to half of `cache_duration`.
    #[serde(default)]
    pub cache_check_interval: Option<Duration>,
    #[serde(default)]
    pub retention: Retention,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            cache_duration: Duration::from_secs(60),
            cache_check_interval: None,
            retention: Retention::default(),
        }
    }
}

impl CacheConfig {
    pub fn new(cache_duration: Duration) -> Self {
        CacheConfig {
            cache_duration,
            ..Default::default()
        }
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.cache_check_interval = Some(interval);
        self
    }

    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    /// # Errors
    /// Returns `Error::ConfigError` if `cache_duration` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.cache_duration.is_zero() {
            return Err(Error::ConfigError(
                "cache_duration must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Interval the background sweeper ticks at.
    ///
    /// A configured, non-zero `cache_check_interval` is used as is. Otherwise
    /// the interval is `cache_duration / 2`, never below [`MIN_SWEEP_INTERVAL`].
    pub fn sweep_interval(&self) -> Duration {
        match self.cache_check_interval {
            Some(interval) if !interval.is_zero() => interval,
            _ => (self.cache_duration / 2).max(MIN_SWEEP_INTERVAL),
        }
    }
}
