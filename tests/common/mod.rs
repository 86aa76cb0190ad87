//! Shared helpers for integration tests.

#![allow(dead_code)]

use fncache::{CacheLayer, Context, Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};

/// HashMap-backed layer that counts calls and can be told to fail writes.
pub struct MockLayer<K, V> {
    store: Mutex<HashMap<K, V>>,
    get_calls: AtomicUsize,
    set_calls: AtomicUsize,
    fail_sets: bool,
}

impl<K, V> Default for MockLayer<K, V> {
    fn default() -> Self {
        MockLayer {
            store: Mutex::new(HashMap::new()),
            get_calls: AtomicUsize::new(0),
            set_calls: AtomicUsize::new(0),
            fail_sets: false,
        }
    }
}

impl<K, V> MockLayer<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_sets() -> Self {
        MockLayer {
            fail_sets: true,
            ..Default::default()
        }
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    /// Read the store directly, bypassing the call counters.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.store.lock().get(key).cloned()
    }

    /// Write the store directly, bypassing the call counters.
    pub fn seed(&self, key: K, value: V) {
        self.store.lock().insert(key, value);
    }
}

impl<K, V> CacheLayer<K, V> for MockLayer<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, _ctx: &Context, key: &K) -> Result<V> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.store.lock().get(key).cloned().ok_or(Error::Miss)
    }

    async fn set(&self, _ctx: &Context, key: &K, value: V) -> Result<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sets {
            return Err(Error::BackendError("mock layer rejects writes".to_string()));
        }
        self.store.lock().insert(key.clone(), value);
        Ok(())
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
