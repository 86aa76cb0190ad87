//! Cache-aside orchestrator - main entry point for cached calls.

use crate::backend::CacheLayer;
use crate::builder::FnCacheBuilder;
use crate::config::CacheConfig;
use crate::context::Context;
use crate::error::{Error, GetError, Result};
use crate::observability::CacheMetrics;
use futures::future::BoxFuture;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

/// Stored compute function: produces the value for a key on a cache miss.
pub type ComputeFn<K, V> = Arc<dyn Fn(Context, K) -> BoxFuture<'static, Result<V>> + Send + Sync>;

/// Stored write-through function: propagates a value to the system of record.
pub type WriteThroughFn<K, V> =
    Arc<dyn Fn(Context, K, V) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Where a value returned by [`FnCache::get`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Served by the cache layer.
    Cache,
    /// Produced by the compute function on a miss.
    Computed,
}

/// Successful result of [`FnCache::get`].
///
/// A computed value only shows up here once it has been stored; if storing
/// failed, `get` returns [`GetError::StoreFailed`] instead.
#[derive(Debug)]
#[must_use]
pub struct Fetched<V> {
    pub value: V,
    pub origin: Origin,
}

impl<V> Fetched<V> {
    fn hit(value: V) -> Self {
        Fetched {
            value,
            origin: Origin::Cache,
        }
    }

    fn computed(value: V) -> Self {
        Fetched {
            value,
            origin: Origin::Computed,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.origin == Origin::Cache
    }

    pub fn into_value(self) -> V {
        self.value
    }
}

/// Cache-aside wrapper around an expensive function.
///
/// Composes a compute function, an optional write-through function and one
/// [`CacheLayer`]. `get` serves hits from the layer and computes on misses;
/// `set` writes through to the system of record before updating the layer.
///
/// The orchestrator spawns nothing: every call runs on the caller's task and
/// every await point is bounded by the caller's [`Context`].
///
/// Over an [`InMemoryCache`](crate::InMemoryCache) with the default
/// [`Retention::Weak`](crate::Retention::Weak), a cached value lives only as
/// long as some caller still holds the returned `Arc`. Once every copy is
/// dropped the next `get` computes again. Use
/// [`Retention::Strong`](crate::Retention::Strong) to keep results for the
/// full TTL.
///
/// # Example
///
/// ```
/// use fncache::{CacheConfig, Context, FnCache, InMemoryCache};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> fncache::Result<()> {
/// let config = CacheConfig::new(Duration::from_secs(60));
/// let layer = InMemoryCache::<u64, String>::with_config(&config)?;
///
/// let cache = FnCache::builder(layer, config)
///     .compute(|_ctx, id: u64| async move { Ok(Arc::new(format!("user-{}", id))) })
///     .build()?;
///
/// let ctx = Context::background();
/// let user = cache.get(&ctx, &7).await?.into_value();
/// assert_eq!(user.as_str(), "user-7");
/// # Ok(())
/// # }
/// ```
pub struct FnCache<K, V, L> {
    pub(crate) layer: L,
    pub(crate) config: CacheConfig,
    pub(crate) compute: Option<ComputeFn<K, V>>,
    pub(crate) write_through: Option<WriteThroughFn<K, V>>,
    pub(crate) metrics: Box<dyn CacheMetrics>,
}

impl<K, V, L> FnCache<K, V, L>
where
    K: Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    L: CacheLayer<K, V>,
{
    /// Start configuring a cache over `layer`.
    pub fn builder(layer: L, config: CacheConfig) -> FnCacheBuilder<K, V, L> {
        FnCacheBuilder::new(layer, config)
    }

    /// Return the value for `key`, computing and caching it on a miss.
    ///
    /// Hits are served without a compute function; one is only needed on a miss.
    ///
    /// # Errors
    ///
    /// - `Error::ConfigError`: miss with no compute function configured
    /// - `Error::Cancelled` / `Error::DeadlineExceeded`: `ctx` ended during lookup or compute
    /// - any error returned by the compute function, unchanged; nothing is cached
    /// - [`GetError::StoreFailed`]: the value was computed but the layer
    ///   rejected it; the value is carried in the error
    pub async fn get(
        &self,
        ctx: &Context,
        key: &K,
    ) -> std::result::Result<Fetched<V>, GetError<V>> {
        let timer = Instant::now();

        match ctx.run(self.layer.get(ctx, key)).await {
            Ok(value) => {
                debug!("✓ Cache hit for {:?}", key);
                self.metrics.record_hit(timer.elapsed());
                return Ok(Fetched::hit(value));
            }
            Err(e) if e.is_cancellation() => {
                self.metrics.record_error(&e);
                return Err(e.into());
            }
            Err(e) if e.is_miss() => {
                debug!("✗ Cache miss for {:?} ({}), computing", key, e);
            }
            Err(e) => {
                warn!("Cache layer lookup failed for {:?}, computing: {}", key, e);
            }
        }

        let Some(compute) = self.compute.as_ref() else {
            let e = Error::ConfigError(format!(
                "no compute function configured to fill miss for {:?}",
                key
            ));
            self.metrics.record_error(&e);
            return Err(e.into());
        };

        let value = match ctx.run(compute(ctx.clone(), key.clone())).await {
            Ok(value) => value,
            Err(e) => {
                debug!("Compute failed for {:?}: {}", key, e);
                self.metrics.record_error(&e);
                return Err(e.into());
            }
        };
        self.metrics.record_miss(timer.elapsed());

        if let Err(source) = ctx.run(self.layer.set(ctx, key, value.clone())).await {
            warn!("Computed value for {:?} could not be cached: {}", key, source);
            self.metrics.record_error(&source);
            return Err(GetError::StoreFailed { value, source });
        }

        Ok(Fetched::computed(value))
    }

    /// Write `value` through to the system of record, then cache it.
    ///
    /// Without a write-through function only the cache layer is updated.
    ///
    /// # Errors
    ///
    /// - the write-through function's error; the layer is left untouched
    /// - the layer's error if caching fails after a successful write-through
    /// - `Error::Cancelled` / `Error::DeadlineExceeded` if `ctx` ends first
    pub async fn set(&self, ctx: &Context, key: &K, value: V) -> Result<()> {
        if let Some(write_through) = &self.write_through {
            if let Err(e) = ctx
                .run(write_through(ctx.clone(), key.clone(), value.clone()))
                .await
            {
                warn!("Write-through failed for {:?}: {}", key, e);
                return Err(e);
            }
        }

        ctx.run(self.layer.set(ctx, key, value)).await?;
        debug!("✓ Cache set for {:?}", key);
        Ok(())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get the cache layer (for advanced use).
    pub fn layer(&self) -> &L {
        &self.layer
    }

    pub fn has_compute(&self) -> bool {
        self.compute.is_some()
    }

    pub fn has_write_through(&self) -> bool {
        self.write_through.is_some()
    }
}
