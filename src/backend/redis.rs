//! Redis cache backend implementation.

use super::CacheLayer;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::key::CacheKeyBuilder;
use crate::serialization::{deserialize_from_cache, serialize_for_cache};
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Config, Pool, Runtime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::time::Duration;

/// Default Redis connection pool size.
/// Override with REDIS_POOL_SIZE environment variable
const DEFAULT_POOL_SIZE: usize = 16;

/// Configuration for Redis backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String, // e.g., "redis://localhost:6379/0"
    pub pool_size: usize,
    /// Namespace prepended to every key.
    pub prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        RedisConfig {
            url: "redis://localhost:6379".to_string(),
            pool_size: DEFAULT_POOL_SIZE,
            prefix: "fncache".to_string(),
        }
    }
}

/// Redis-backed cache layer shared across processes.
///
/// Keys are derived with [`CacheKeyBuilder`] and values are stored in the
/// versioned envelope from [`crate::serialization`]. Entries expire through
/// Redis' own TTL (`PSETEX`), so there is no sweeper. A missing key is
/// reported as `Error::Miss`, same as the in-memory backend.
///
/// # Example
///
/// ```no_run
/// # use fncache::backend::{RedisCache, RedisConfig};
/// # use fncache::{CacheLayer, Context};
/// # use std::time::Duration;
/// # async fn example() -> fncache::Result<()> {
/// let config = RedisConfig {
///     prefix: "reports".to_string(),
///     ..Default::default()
/// };
/// let cache = RedisCache::<u64, String>::new(config, Duration::from_secs(60))?;
///
/// let ctx = Context::background();
/// cache.set(&ctx, &1, "ready".to_string()).await?;
/// let value = cache.get(&ctx, &1).await?;
/// # Ok(())
/// # }
/// ```
pub struct RedisCache<K, V> {
    pool: Pool,
    ttl: Duration,
    prefix: String,
    _marker: PhantomData<fn(K) -> V>,
}

impl<K, V> Clone for RedisCache<K, V> {
    fn clone(&self) -> Self {
        RedisCache {
            pool: self.pool.clone(),
            ttl: self.ttl,
            prefix: self.prefix.clone(),
            _marker: PhantomData,
        }
    }
}

impl<K, V> RedisCache<K, V>
where
    K: Serialize + Send + Sync,
    V: Serialize + DeserializeOwned + Send + Sync,
{
    /// Create new Redis backend from configuration.
    ///
    /// # Errors
    /// Returns `Err` if the TTL is zero or the connection pool cannot be created
    pub fn new(config: RedisConfig, ttl: Duration) -> Result<Self> {
        if ttl.is_zero() {
            return Err(Error::ConfigError(
                "Redis TTL must be greater than zero".to_string(),
            ));
        }

        let mut pool_config = Config::from_url(config.url.clone());
        pool_config.pool = Some(deadpool_redis::PoolConfig::new(config.pool_size));
        let pool = pool_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::ConfigError(format!("Failed to create connection pool: {}", e)))?;

        info!(
            "✓ Redis backend initialized for {} (pool size: {}, prefix: {})",
            config.url, config.pool_size, config.prefix
        );

        Ok(RedisCache {
            pool,
            ttl,
            prefix: config.prefix,
            _marker: PhantomData,
        })
    }

    /// Create from a connection URL directly.
    ///
    /// Pool size is determined by:
    /// 1. `REDIS_POOL_SIZE` environment variable (if set)
    /// 2. `DEFAULT_POOL_SIZE` constant (16)
    ///
    /// # Errors
    /// Returns `Err` if connection pool creation fails
    pub fn from_url(url: String, prefix: String, ttl: Duration) -> Result<Self> {
        let pool_size = std::env::var("REDIS_POOL_SIZE")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_POOL_SIZE);

        let config = RedisConfig {
            url,
            pool_size,
            prefix,
        };
        Self::new(config, ttl)
    }

    /// Remove the entry for `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    /// Returns `Error::BackendError` if Redis is unreachable
    pub async fn delete(&self, ctx: &Context, key: &K) -> Result<()> {
        let redis_key = CacheKeyBuilder::build(&self.prefix, key)?;
        ctx.run(async {
            let mut conn = self.connection().await?;
            conn.del::<_, ()>(&redis_key).await.map_err(|e| {
                Error::BackendError(format!("Redis DEL failed for key {}: {}", redis_key, e))
            })?;
            debug!("✓ Redis DEL {}", redis_key);
            Ok::<_, Error>(())
        })
        .await
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| Error::BackendError(format!("Failed to get Redis connection: {}", e)))
    }
}

impl<K, V> CacheLayer<K, V> for RedisCache<K, V>
where
    K: Serialize + Send + Sync,
    V: Serialize + DeserializeOwned + Send + Sync,
{
    async fn get(&self, ctx: &Context, key: &K) -> Result<V> {
        let redis_key = CacheKeyBuilder::build(&self.prefix, key)?;
        ctx.run(async {
            let mut conn = self.connection().await?;
            let bytes: Option<Vec<u8>> = conn.get(&redis_key).await.map_err(|e| {
                Error::BackendError(format!("Redis GET failed for key {}: {}", redis_key, e))
            })?;

            match bytes {
                Some(bytes) => {
                    debug!("✓ Redis GET {} -> HIT", redis_key);
                    deserialize_from_cache(&bytes)
                }
                None => {
                    debug!("✓ Redis GET {} -> MISS", redis_key);
                    Err(Error::Miss)
                }
            }
        })
        .await
    }

    async fn set(&self, ctx: &Context, key: &K, value: V) -> Result<()> {
        let redis_key = CacheKeyBuilder::build(&self.prefix, key)?;
        let bytes = serialize_for_cache(&value)?;
        // PSETEX rejects 0; sub-millisecond TTLs round up.
        let millis = u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        ctx.run(async {
            let mut conn = self.connection().await?;
            conn.pset_ex::<_, _, ()>(&redis_key, bytes, millis)
                .await
                .map_err(|e| {
                    Error::BackendError(format!("Redis SET failed for key {}: {}", redis_key, e))
                })?;
            debug!("✓ Redis SET {} (TTL: {:?})", redis_key, self.ttl);
            Ok::<_, Error>(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_config_default() {
        let config = RedisConfig::default();
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(config.prefix, "fncache");
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let result = RedisCache::<u32, String>::new(RedisConfig::default(), Duration::ZERO);
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_miss_against_live_server() {
        let cache =
            match RedisCache::<String, String>::new(RedisConfig::default(), Duration::from_secs(5))
            {
                Ok(cache) => cache,
                Err(_) => return,
            };
        let ctx = Context::background();
        if cache.connection().await.is_err() {
            // Skipping: Redis server not available
            return;
        }

        let result = cache.get(&ctx, &"fncache-test-nonexistent".to_string()).await;
        assert!(matches!(result, Err(Error::Miss)));

        cache
            .set(&ctx, &"fncache-test-key".to_string(), "value1".to_string())
            .await
            .expect("Failed to set");
        let value = cache
            .get(&ctx, &"fncache-test-key".to_string())
            .await
            .expect("Failed to get");
        assert_eq!(value, "value1");

        cache
            .delete(&ctx, &"fncache-test-key".to_string())
            .await
            .expect("Failed to delete");
    }
}
