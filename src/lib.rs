//! # fncache
//!
//! A generic, pluggable function-result cache.
//!
//! ## Features
//!
//! - **Cache-aside out of the box:** [`FnCache`] checks the cache, computes on
//!   a miss and stores the result; compute failures are never cached
//! - **Write-through:** optional function that updates the system of record
//!   before the cache
//! - **Backend Agnostic:** every backend implements [`CacheLayer`]; in-memory
//!   is built in, Redis and Memcached sit behind cargo features
//! - **TTL + weak retention:** the in-memory backend expires entries, sweeps
//!   them in the background, and can drop values nobody else holds
//! - **Cancellation aware:** every call takes a [`Context`] and returns
//!   promptly once it is cancelled or past its deadline
//!
//! ## Quick Start
//!
//! ```
//! use fncache::{CacheConfig, Context, FnCache, InMemoryCache};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> fncache::Result<()> {
//! // 1. Pick a backend
//! let config = CacheConfig::new(Duration::from_secs(60));
//! let layer = InMemoryCache::<u64, String>::with_config(&config)?;
//!
//! // 2. Wrap the expensive function
//! let cache = FnCache::builder(layer, config)
//!     .compute(|_ctx, id: u64| async move { Ok(Arc::new(format!("report-{}", id))) })
//!     .build()?;
//!
//! // 3. Use it
//! // The default weak retention keeps an entry only while a caller holds
//! // its `Arc`, so `first` stays alive here. For plain memoization use
//! // `CacheConfig::with_retention(Retention::Strong)`.
//! let ctx = Context::background();
//! let first = cache.get(&ctx, &1).await?;
//! let second = cache.get(&ctx, &1).await?;
//! assert!(!first.is_hit());
//! assert!(second.is_hit());
//!
//! cache.layer().stop().await;
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate log;

pub mod backend;
pub mod builder;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod key;
pub mod observability;
pub mod serialization;

// Re-exports for convenience
pub use backend::CacheLayer;
#[cfg(feature = "inmemory")]
pub use backend::InMemoryCache;
pub use builder::FnCacheBuilder;
pub use cache::{ComputeFn, Fetched, FnCache, Origin, WriteThroughFn};
pub use config::{CacheConfig, Retention};
pub use context::Context;
pub use error::{BoxError, Error, GetError, Result};
pub use observability::{CacheMetrics, NoOpMetrics};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
