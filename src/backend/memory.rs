//! In-process TTL backend.

use super::CacheLayer;
use crate::config::{CacheConfig, Retention};
use crate::context::Context;
use crate::error::{Error, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const RUNNING: u8 = 0;
const STOPPING: u8 = 1;
const STOPPED: u8 = 2;

enum Slot<V> {
    Weak(Weak<V>),
    Strong(Arc<V>),
}

impl<V> Slot<V> {
    fn upgrade(&self) -> Option<Arc<V>> {
        match self {
            Slot::Weak(weak) => weak.upgrade(),
            Slot::Strong(value) => Some(Arc::clone(value)),
        }
    }

    fn is_reclaimed(&self) -> bool {
        match self {
            Slot::Weak(weak) => weak.strong_count() == 0,
            Slot::Strong(_) => false,
        }
    }
}

struct CacheEntry<V> {
    value: Slot<V>,
    expires_at: Instant,
    generation: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

type Store<K, V> = DashMap<K, CacheEntry<V>>;

/// Concurrent in-process cache with per-entry TTL and a background sweeper.
///
/// Values are shared as `Arc<V>`. With the default [`Retention::Weak`] the
/// cache only keeps a weak reference, so an entry lives until its TTL
/// elapses *or* the last outside `Arc` is dropped, whichever comes first.
///
/// Construction spawns one sweeper task on the current tokio runtime. Call
/// [`stop`](Self::stop) to shut it down and wait for it; dropping the cache
/// also signals it. Any operation on a stopped cache returns
/// [`Error::Stopped`].
///
/// # Example
///
/// ```
/// use fncache::{CacheLayer, Context, InMemoryCache};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> fncache::Result<()> {
/// let cache = InMemoryCache::<String, u32>::new(Duration::from_secs(60))?;
/// let ctx = Context::background();
///
/// let value = Arc::new(42);
/// cache.set(&ctx, &"answer".to_string(), Arc::clone(&value)).await?;
/// assert_eq!(*cache.get(&ctx, &"answer".to_string()).await?, 42);
///
/// cache.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct InMemoryCache<K, V> {
    store: Arc<Store<K, V>>,
    ttl: Duration,
    sweep_interval: Duration,
    retention: Retention,
    generation: AtomicU64,
    state: AtomicU8,
    shutdown: CancellationToken,
    stopped: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> InMemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Create a cache with the given TTL and default settings.
    ///
    /// # Errors
    /// Returns `Error::ConfigError` if `ttl` is zero or no tokio runtime is running.
    pub fn new(ttl: Duration) -> Result<Self> {
        Self::with_config(&CacheConfig::new(ttl))
    }

    /// Create a cache from a full configuration.
    ///
    /// # Errors
    /// Returns `Error::ConfigError` if the configuration is invalid or no tokio
    /// runtime is running.
    pub fn with_config(config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            Error::ConfigError(format!("InMemoryCache requires a tokio runtime: {}", e))
        })?;

        let store: Arc<Store<K, V>> = Arc::new(DashMap::new());
        let shutdown = CancellationToken::new();
        let sweep_interval = config.sweep_interval();

        let handle = runtime.spawn(sweeper(
            Arc::clone(&store),
            sweep_interval,
            shutdown.clone(),
        ));

        info!(
            "✓ In-memory cache started (ttl: {:?}, sweep interval: {:?}, retention: {:?})",
            config.cache_duration, sweep_interval, config.retention
        );

        Ok(InMemoryCache {
            store,
            ttl: config.cache_duration,
            sweep_interval,
            retention: config.retention,
            generation: AtomicU64::new(0),
            state: AtomicU8::new(RUNNING),
            shutdown,
            stopped: CancellationToken::new(),
            sweeper: Mutex::new(Some(handle)),
        })
    }

    /// Remove any entry for `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    /// Returns `Error::Stopped` once the cache has been stopped.
    pub fn delete(&self, key: &K) -> Result<()> {
        self.ensure_running()?;
        if self.store.remove(key).is_some() {
            debug!("✓ In-memory DELETE");
        }
        Ok(())
    }

    /// Run one sweep now and return how many entries it removed.
    pub fn sweep(&self) -> usize {
        sweep_store(&self.store, Instant::now())
    }

    /// Stop the sweeper and wait until it has exited.
    ///
    /// Only the first call does any work. Later calls wait until that first
    /// call has finished, then return.
    pub async fn stop(&self) {
        if self
            .state
            .compare_exchange(RUNNING, STOPPING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.stopped.cancelled().await;
            return;
        }

        self.shutdown.cancel();
        let handle = self.sweeper.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("In-memory cache sweeper ended abnormally: {}", e);
            }
        }

        self.state.store(STOPPED, Ordering::Release);
        self.stopped.cancel();
        info!("✓ In-memory cache stopped");
    }

    /// True until [`stop`](Self::stop) is called.
    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING
    }

    /// Number of stored entries, including ones not yet swept.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(Error::Stopped)
        }
    }

    /// Remove `key` only if it still holds the entry stamped `generation`.
    fn evict(&self, key: &K, generation: u64) {
        self.store
            .remove_if(key, |_, entry| entry.generation == generation);
    }

    fn lookup(&self, key: &K) -> Result<Arc<V>> {
        self.ensure_running()?;

        // The shard guard must be released before evicting.
        let (outcome, generation) = {
            let entry = self.store.get(key).ok_or(Error::Miss)?;
            let outcome = if entry.is_expired(Instant::now()) {
                Err(Error::Expired)
            } else {
                entry.value.upgrade().ok_or(Error::Reclaimed)
            };
            (outcome, entry.generation)
        };

        if outcome.is_err() {
            self.evict(key, generation);
        }
        outcome
    }

    fn insert(&self, key: &K, value: Arc<V>) -> Result<()>
    where
        K: Clone,
    {
        self.ensure_running()?;

        let slot = match self.retention {
            Retention::Weak => Slot::Weak(Arc::downgrade(&value)),
            Retention::Strong => Slot::Strong(value),
        };
        let entry = CacheEntry {
            value: slot,
            expires_at: Instant::now() + self.ttl,
            generation: self.generation.fetch_add(1, Ordering::Relaxed),
        };
        self.store.insert(key.clone(), entry);
        Ok(())
    }
}

impl<K, V> CacheLayer<K, Arc<V>> for InMemoryCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    async fn get(&self, _ctx: &Context, key: &K) -> Result<Arc<V>> {
        let result = self.lookup(key);
        match &result {
            Ok(_) => debug!("✓ In-memory GET -> HIT"),
            Err(e) => debug!("✓ In-memory GET -> {}", e),
        }
        result
    }

    async fn set(&self, _ctx: &Context, key: &K, value: Arc<V>) -> Result<()> {
        self.insert(key, value)?;
        debug!("✓ In-memory SET (TTL: {:?})", self.ttl);
        Ok(())
    }
}

impl<K, V> Drop for InMemoryCache<K, V> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Remove every expired or reclaimed entry.
///
/// `retain` decides and removes under the shard's write lock, so an entry
/// inserted concurrently for the same key is never the one removed.
fn sweep_store<K, V>(store: &Store<K, V>, now: Instant) -> usize
where
    K: Eq + Hash,
{
    let before = store.len();
    store.retain(|_, entry| !entry.is_expired(now) && !entry.value.is_reclaimed());
    before.saturating_sub(store.len())
}

async fn sweeper<K, V>(store: Arc<Store<K, V>>, interval: Duration, shutdown: CancellationToken)
where
    K: Eq + Hash,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let removed = sweep_store(&store, Instant::now());
                if removed > 0 {
                    debug!("In-memory sweeper evicted {} entries", removed);
                }
            }
        }
    }

    debug!("In-memory sweeper exited");
}
