//! Memcached cache backend implementation.

use super::CacheLayer;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::key::CacheKeyBuilder;
use crate::serialization::{deserialize_from_cache, serialize_for_cache};
use async_memcached::{AsciiProtocol, Status};
use deadpool_memcached::{Manager, Pool};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::time::Duration;

/// Default Memcached connection pool size.
/// Formula: (CPU cores × 2) + 1
/// For 8-core systems: 16 connections is optimal
/// Override with MEMCACHED_POOL_SIZE environment variable
const DEFAULT_POOL_SIZE: u32 = 16;

/// Configuration for Memcached backend.
#[derive(Clone, Debug)]
pub struct MemcachedConfig {
    pub servers: Vec<String>, // e.g., ["localhost:11211", "cache2:11211"]
    pub connection_timeout: Duration,
    pub pool_size: u32,
    /// Namespace prepended to every key.
    pub prefix: String,
}

impl Default for MemcachedConfig {
    fn default() -> Self {
        MemcachedConfig {
            servers: vec!["localhost:11211".to_string()],
            connection_timeout: Duration::from_secs(5),
            pool_size: 10,
            prefix: "fncache".to_string(),
        }
    }
}

/// Memcached-backed cache layer shared across processes.
///
/// Memcached expires entries with one-second granularity, so the TTL is
/// rounded up to whole seconds. A missing key is reported as `Error::Miss`.
pub struct MemcachedCache<K, V> {
    pool: Pool,
    ttl: Duration,
    prefix: String,
    _marker: PhantomData<fn(K) -> V>,
}

impl<K, V> Clone for MemcachedCache<K, V> {
    fn clone(&self) -> Self {
        MemcachedCache {
            pool: self.pool.clone(),
            ttl: self.ttl,
            prefix: self.prefix.clone(),
            _marker: PhantomData,
        }
    }
}

impl<K, V> MemcachedCache<K, V>
where
    K: Serialize + Send + Sync,
    V: Serialize + DeserializeOwned + Send + Sync,
{
    /// Create new Memcached backend from configuration.
    ///
    /// # Errors
    /// Returns `Err` if the TTL is zero, no server is given, or connection
    /// pool creation fails
    pub fn new(config: MemcachedConfig, ttl: Duration) -> Result<Self> {
        if ttl.is_zero() {
            return Err(Error::ConfigError(
                "Memcached TTL must be greater than zero".to_string(),
            ));
        }

        // deadpool-memcached Manager takes a single server address
        // Use the first server from the list
        let addr = config
            .servers
            .first()
            .ok_or_else(|| Error::ConfigError("No memcached servers specified".to_string()))?
            .clone();

        let manager = Manager::new(addr.clone());

        let pool = Pool::builder(manager)
            .max_size(config.pool_size as usize)
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to create connection pool: {}", e)))?;

        info!(
            "✓ Memcached backend initialized with server: {} (pool size: {}, prefix: {})",
            addr, config.pool_size, config.prefix
        );

        Ok(MemcachedCache {
            pool,
            ttl,
            prefix: config.prefix,
            _marker: PhantomData,
        })
    }

    /// Create from server address directly.
    ///
    /// Pool size is determined by:
    /// 1. `MEMCACHED_POOL_SIZE` environment variable (if set)
    /// 2. `DEFAULT_POOL_SIZE` constant (16)
    ///
    /// # Errors
    /// Returns `Err` if connection pool creation fails
    pub fn from_server(addr: String, prefix: String, ttl: Duration) -> Result<Self> {
        let pool_size = std::env::var("MEMCACHED_POOL_SIZE")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_POOL_SIZE);

        let config = MemcachedConfig {
            servers: vec![addr],
            pool_size,
            prefix,
            ..Default::default()
        };
        Self::new(config, ttl)
    }

    /// Remove the entry for `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    /// Returns `Error::BackendError` if Memcached is unreachable or rejects the command
    pub async fn delete(&self, ctx: &Context, key: &K) -> Result<()> {
        let mc_key = CacheKeyBuilder::build(&self.prefix, key)?;
        ctx.run(async {
            let mut conn = self.pool.get().await.map_err(|e| {
                Error::BackendError(format!("Failed to get Memcached connection: {}", e))
            })?;

            match conn.delete(&mc_key).await {
                Ok(()) => debug!("✓ Memcached DELETE {}", mc_key),
                Err(e) if is_not_found(&e) => debug!("✓ Memcached DELETE {} (absent)", mc_key),
                Err(e) => {
                    return Err(Error::BackendError(format!(
                        "Memcached DELETE failed for key {}: {}",
                        mc_key, e
                    )))
                }
            }
            Ok::<_, Error>(())
        })
        .await
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whole seconds, rounded up. Values < 2592000 (30 days) are interpreted
    /// by Memcached as seconds from now.
    fn expiration(&self) -> i64 {
        let secs = self.ttl.as_secs() + u64::from(self.ttl.subsec_nanos() > 0);
        i64::try_from(secs).unwrap_or(i64::MAX)
    }
}

/// async-memcached reports deleting an absent key as a `NOT_FOUND` status error.
fn is_not_found(err: &async_memcached::Error) -> bool {
    matches!(err, async_memcached::Error::Protocol(Status::NotFound))
}

impl<K, V> CacheLayer<K, V> for MemcachedCache<K, V>
where
    K: Serialize + Send + Sync,
    V: Serialize + DeserializeOwned + Send + Sync,
{
    async fn get(&self, ctx: &Context, key: &K) -> Result<V> {
        let mc_key = CacheKeyBuilder::build(&self.prefix, key)?;
        ctx.run(async {
            let mut conn = self.pool.get().await.map_err(|e| {
                Error::BackendError(format!("Failed to get Memcached connection: {}", e))
            })?;

            match conn.get(&mc_key).await {
                Ok(Some(value)) => match value.data {
                    Some(bytes) => {
                        debug!("✓ Memcached GET {} -> HIT", mc_key);
                        deserialize_from_cache(&bytes)
                    }
                    None => Err(Error::Miss),
                },
                Ok(None) => {
                    debug!("✓ Memcached GET {} -> MISS", mc_key);
                    Err(Error::Miss)
                }
                Err(e) => Err(Error::BackendError(format!(
                    "Memcached GET failed for key {}: {}",
                    mc_key, e
                ))),
            }
        })
        .await
    }

    async fn set(&self, ctx: &Context, key: &K, value: V) -> Result<()> {
        let mc_key = CacheKeyBuilder::build(&self.prefix, key)?;
        let bytes = serialize_for_cache(&value)?;
        let expiration = self.expiration();

        ctx.run(async {
            let mut conn = self.pool.get().await.map_err(|e| {
                Error::BackendError(format!("Failed to get Memcached connection: {}", e))
            })?;

            // Correct parameter order: set(key, value, ttl, flags)
            conn.set(&mc_key, bytes.as_slice(), Some(expiration), None)
                .await
                .map_err(|e| {
                    Error::BackendError(format!("Memcached SET failed for key {}: {}", mc_key, e))
                })?;

            debug!("✓ Memcached SET {} (TTL: {:?})", mc_key, self.ttl);
            Ok::<_, Error>(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memcached_config_default() {
        let config = MemcachedConfig::default();
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.servers[0], "localhost:11211");
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.prefix, "fncache");
    }

    #[test]
    fn test_no_servers_rejected() {
        let config = MemcachedConfig {
            servers: Vec::new(),
            ..Default::default()
        };
        let result = MemcachedCache::<u32, String>::new(config, Duration::from_secs(1));
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_only_not_found_counts_as_deleted() {
        assert!(is_not_found(&async_memcached::Error::Protocol(Status::NotFound)));
        assert!(!is_not_found(&async_memcached::Error::Protocol(Status::NotStored)));
        assert!(!is_not_found(&async_memcached::Error::Io(std::io::Error::other(
            "connection reset"
        ))));
    }

    #[test]
    fn test_expiration_rounds_up() {
        let cache = MemcachedCache::<u32, String>::new(
            MemcachedConfig::default(),
            Duration::from_millis(1500),
        )
        .expect("Failed to create backend");
        assert_eq!(cache.expiration(), 2);
    }
}
