//! Builder for [`FnCache`] instances.

use crate::backend::CacheLayer;
use crate::cache::{ComputeFn, FnCache, WriteThroughFn};
use crate::config::CacheConfig;
use crate::context::Context;
use crate::error::Result;
use crate::observability::{CacheMetrics, NoOpMetrics};
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;

/// Fluent builder that wires the compute and write-through functions to a layer.
///
/// # Example
///
/// ```ignore
/// let cache = FnCache::builder(layer, CacheConfig::new(Duration::from_secs(300)))
///     .compute(|ctx, id: u64| async move { repo.load(&ctx, id).await })
///     .write_through(|ctx, id: u64, user| async move { repo.save(&ctx, id, user).await })
///     .with_metrics(Box::new(PrometheusMetrics::new()))
///     .build()?;
/// ```
pub struct FnCacheBuilder<K, V, L> {
    layer: L,
    config: CacheConfig,
    compute: Option<ComputeFn<K, V>>,
    write_through: Option<WriteThroughFn<K, V>>,
    metrics: Box<dyn CacheMetrics>,
}

impl<K, V, L> FnCacheBuilder<K, V, L>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
    L: CacheLayer<K, V>,
{
    pub(crate) fn new(layer: L, config: CacheConfig) -> Self {
        Self {
            layer,
            config,
            compute: None,
            write_through: None,
            metrics: Box::new(NoOpMetrics),
        }
    }

    /// Function that produces the value for a key on a cache miss.
    ///
    /// Without one, [`FnCache::get`] fails with `Error::ConfigError`.
    pub fn compute<F, Fut>(mut self, compute: F) -> Self
    where
        F: Fn(Context, K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let compute: ComputeFn<K, V> = Arc::new(move |ctx: Context, key: K| compute(ctx, key).boxed());
        self.compute = Some(compute);
        self
    }

    /// Function that propagates [`FnCache::set`] to the system of record
    /// before the layer is updated.
    pub fn write_through<F, Fut>(mut self, write_through: F) -> Self
    where
        F: Fn(Context, K, V) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let write_through: WriteThroughFn<K, V> =
            Arc::new(move |ctx: Context, key: K, value: V| write_through(ctx, key, value).boxed());
        self.write_through = Some(write_through);
        self
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Validate the configuration and build the cache.
    ///
    /// # Errors
    /// Returns `Error::ConfigError` if the configuration is invalid.
    pub fn build(self) -> Result<FnCache<K, V, L>> {
        self.config.validate()?;

        debug!(
            "FnCache built (ttl: {:?}, compute: {}, write-through: {})",
            self.config.cache_duration,
            self.compute.is_some(),
            self.write_through.is_some()
        );

        Ok(FnCache {
            layer: self.layer,
            config: self.config,
            compute: self.compute,
            write_through: self.write_through,
            metrics: self.metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::time::Duration;

    struct NullLayer;

    impl CacheLayer<u8, u8> for NullLayer {
        async fn get(&self, _ctx: &Context, _key: &u8) -> Result<u8> {
            Err(Error::Miss)
        }

        async fn set(&self, _ctx: &Context, _key: &u8, _value: u8) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_builder_defaults() {
        let cache = FnCacheBuilder::<u8, u8, _>::new(NullLayer, CacheConfig::default())
            .build()
            .expect("Failed to build");

        assert!(!cache.has_compute());
        assert!(!cache.has_write_through());
        assert_eq!(cache.config().cache_duration, Duration::from_secs(60));
    }

    #[test]
    fn test_builder_wires_functions() {
        let cache = FnCacheBuilder::new(NullLayer, CacheConfig::default())
            .compute(|_ctx, key: u8| async move { Ok(key) })
            .write_through(|_ctx, _key: u8, _value: u8| async { Ok(()) })
            .build()
            .expect("Failed to build");

        assert!(cache.has_compute());
        assert!(cache.has_write_through());
    }

    #[test]
    fn test_builder_rejects_zero_ttl() {
        let result = FnCacheBuilder::<u8, u8, _>::new(NullLayer, CacheConfig::new(Duration::ZERO))
            .build();
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }
}
