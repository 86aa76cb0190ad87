use criterion::{criterion_group, criterion_main, Criterion};
use fncache::{CacheConfig, CacheLayer, Context, FnCache, InMemoryCache, Retention};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().expect("Failed to build runtime")
}

fn bench_memory_layer(c: &mut Criterion) {
    let rt = runtime();
    let cache = rt.block_on(async {
        InMemoryCache::<u64, String>::new(Duration::from_secs(300)).expect("Failed to create cache")
    });
    let ctx = &Context::background();
    let value = &Arc::new("payload".repeat(16));
    let cache = &cache;

    c.bench_function("memory_set", |b| {
        b.to_async(&rt).iter(|| async move {
            cache
                .set(ctx, black_box(&1), Arc::clone(value))
                .await
                .expect("Failed to set")
        })
    });

    rt.block_on(async {
        cache
            .set(ctx, &2, Arc::clone(value))
            .await
            .expect("Failed to set")
    });
    c.bench_function("memory_get_hit", |b| {
        b.to_async(&rt).iter(|| async move {
            black_box(cache.get(ctx, black_box(&2)).await.expect("Failed to get"));
        })
    });

    c.bench_function("memory_get_miss", |b| {
        b.to_async(&rt).iter(|| async move {
            black_box(cache.get(ctx, black_box(&404)).await.is_err());
        })
    });
}

fn bench_fncache_hit(c: &mut Criterion) {
    let rt = runtime();
    let config = CacheConfig::new(Duration::from_secs(300)).with_retention(Retention::Strong);
    let cache = rt.block_on(async {
        let layer = InMemoryCache::<u64, u64>::with_config(&config).expect("Failed to create cache");
        FnCache::builder(layer, config.clone())
            .compute(|_ctx, key: u64| async move { Ok(Arc::new(key * 2)) })
            .build()
            .expect("Failed to build")
    });
    let ctx = &Context::background();
    let cache = &cache;
    rt.block_on(async { cache.get(ctx, &7).await.expect("Failed to warm") });

    c.bench_function("fncache_get_hit", |b| {
        b.to_async(&rt).iter(|| async move {
            black_box(cache.get(ctx, black_box(&7)).await.expect("Failed to get"));
        })
    });
}

criterion_group!(benches, bench_memory_layer, bench_fncache_hit);
criterion_main!(benches);
