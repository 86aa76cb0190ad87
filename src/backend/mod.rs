//! Storage layers the orchestrator can sit on top of.
//!
//! Every backend implements [`CacheLayer`]. The orchestrator only ever talks
//! to this trait, so a remote backend is swapped in without touching it.

use crate::context::Context;
use crate::error::Result;
use std::future::Future;
use std::sync::Arc;

#[cfg(feature = "inmemory")]
pub mod memory;

#[cfg(feature = "memcached")]
pub mod memcached;

#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "inmemory")]
pub use memory::InMemoryCache;

#[cfg(feature = "memcached")]
pub use memcached::{MemcachedCache, MemcachedConfig};

#[cfg(feature = "redis")]
pub use redis::{RedisCache, RedisConfig};

/// Concurrency-safe key/value storage with backend-defined TTL.
///
/// `get` must report an absent, expired or reclaimed entry with an error for
/// which [`Error::is_miss`](crate::Error::is_miss) holds. Both methods may be
/// called from any number of tasks at once.
pub trait CacheLayer<K, V>: Send + Sync {
    /// Fetch the live value stored for `key`.
    fn get(&self, ctx: &Context, key: &K) -> impl Future<Output = Result<V>> + Send;

    /// Store `value` for `key`, overwriting any previous entry.
    fn set(&self, ctx: &Context, key: &K, value: V) -> impl Future<Output = Result<()>> + Send;
}

impl<K, V, L> CacheLayer<K, V> for Arc<L>
where
    L: CacheLayer<K, V>,
{
    fn get(&self, ctx: &Context, key: &K) -> impl Future<Output = Result<V>> + Send {
        (**self).get(ctx, key)
    }

    fn set(&self, ctx: &Context, key: &K, value: V) -> impl Future<Output = Result<()>> + Send {
        (**self).set(ctx, key, value)
    }
}
