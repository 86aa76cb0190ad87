//! Basic usage example of the function cache.

use fncache::{error::Result, CacheConfig, Context, Error, FnCache, InMemoryCache, Retention};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Example value: an exchange rate quote
#[derive(Debug)]
struct Quote {
    pair: String,
    rate: f64,
}

/// Mock rate service that simulates a slow upstream API
struct RateService {
    rates: HashMap<&'static str, f64>,
}

impl RateService {
    fn new() -> Self {
        let rates = HashMap::from([("EURUSD", 1.08), ("GBPUSD", 1.27)]);
        RateService { rates }
    }

    async fn fetch(&self, ctx: Context, pair: String) -> Result<Arc<Quote>> {
        println!("  [API] Fetching quote: {}", pair);
        ctx.run(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(())
        })
        .await?;

        match self.rates.get(pair.as_str()) {
            Some(rate) => Ok(Arc::new(Quote { pair, rate: *rate })),
            None => Err(Error::compute(format!("unknown pair {}", pair))),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    println!("\n=== fncache - Basic Example ===\n");

    // 1. Initialize cache backend
    println!("1. Initializing in-memory cache backend...");
    let config = CacheConfig::new(Duration::from_secs(2))
        .with_check_interval(Duration::from_millis(500))
        .with_retention(Retention::Strong);
    let layer = InMemoryCache::<String, Quote>::with_config(&config)?;

    let service = Arc::new(RateService::new());
    let upstream = Arc::clone(&service);
    let cache = FnCache::builder(layer, config)
        .compute(move |ctx, pair: String| {
            let upstream = Arc::clone(&upstream);
            async move { upstream.fetch(ctx, pair).await }
        })
        .write_through(|_ctx, pair: String, quote: Arc<Quote>| async move {
            println!("  [API] Publishing quote {} = {}", pair, quote.rate);
            Ok(())
        })
        .build()?;
    println!("   ✓ Cache ready\n");

    let ctx = Context::background();

    // 2. First request - cache miss, call the API
    println!("2. First request for EURUSD:");
    let quote = cache.get(&ctx, &"EURUSD".to_string()).await?;
    println!("   ✓ {} = {} ({:?})\n", quote.value.pair, quote.value.rate, quote.origin);

    // 3. Second request - cache hit
    println!("3. Second request for EURUSD:");
    let quote = cache.get(&ctx, &"EURUSD".to_string()).await?;
    println!("   ✓ {} = {} ({:?})\n", quote.value.pair, quote.value.rate, quote.origin);

    // 4. Failures are returned and never cached
    println!("4. Unknown pair:");
    match cache.get(&ctx, &"XXXYYY".to_string()).await {
        Ok(_) => println!("   ✗ unexpected value\n"),
        Err(e) => println!("   ✓ error returned, nothing cached: {}\n", e),
    }

    // 5. Write-through set
    println!("5. Manual update for GBPUSD:");
    let manual = Arc::new(Quote {
        pair: "GBPUSD".to_string(),
        rate: 1.30,
    });
    cache.set(&ctx, &"GBPUSD".to_string(), manual).await?;
    let quote = cache.get(&ctx, &"GBPUSD".to_string()).await?;
    println!("   ✓ {} = {} ({:?})\n", quote.value.pair, quote.value.rate, quote.origin);

    // 6. Expiry
    println!("6. Waiting for TTL to elapse...");
    tokio::time::sleep(Duration::from_millis(2500)).await;
    let quote = cache.get(&ctx, &"EURUSD".to_string()).await?;
    println!("   ✓ {} = {} ({:?})\n", quote.value.pair, quote.value.rate, quote.origin);

    // 7. Deadline
    println!("7. Request with a 10ms deadline:");
    let hurried = ctx.with_timeout(Duration::from_millis(10));
    match cache.get(&hurried, &"GBPUSD-fresh".to_string()).await {
        Ok(_) => println!("   ✗ unexpected value\n"),
        Err(e) => println!("   ✓ {}\n", e),
    }

    cache.layer().stop().await;
    println!("=== Example Complete ===\n");

    Ok(())
}
