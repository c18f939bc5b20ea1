//! Stress Tests for the Concurrent Cooperative Cache
//!
//! These tests verify thread safety and budget accounting under high
//! contention: many threads share a few shards, peer probes race with
//! writers and synchronizations interleave with lookups.

#![cfg(feature = "concurrent")]

use coop_cache::config::{
    ColoringConfig, CooperativeCacheConfig, CountingBloomConfig, SummaryConfig,
};
use coop_cache::{ConcurrentCooperativeCache, Lookup};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

const NUM_THREADS: usize = 16;
const OPS_PER_THREAD: usize = 5_000;
const CLASS_NUM: usize = 4;

fn coloring_summary() -> SummaryConfig {
    SummaryConfig::Coloring(ColoringConfig {
        bucket_num: 1 << 16,
        color_num: 2,
    })
}

fn bloom_summary() -> SummaryConfig {
    SummaryConfig::CountingBloom(CountingBloomConfig {
        num_bits: 1 << 14,
        hash_count: 4,
        count_bits: 4,
    })
}

fn make_cache(
    summary: SummaryConfig,
    capacity: u64,
    threshold: f64,
) -> Arc<ConcurrentCooperativeCache<u64>> {
    let config = CooperativeCacheConfig::new(capacity, CLASS_NUM, summary).with_threshold(threshold);
    Arc::new(ConcurrentCooperativeCache::init(config).unwrap())
}

/// Mixed puts and lookups from many threads over a shared key space
fn hammer(cache: Arc<ConcurrentCooperativeCache<u64>>, capacity: u64) {
    let hits = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|t| {
            let cache = Arc::clone(&cache);
            let hits = Arc::clone(&hits);
            thread::spawn(move || {
                let shard = t % CLASS_NUM;
                for i in 0..OPS_PER_THREAD {
                    let key = ((t * 7919 + i * 31) % 2000) as u64;
                    if i % 3 == 0 {
                        cache.put(shard, key, key * 10, 1 + key % 8);
                    } else if let Some(value) = cache.get(shard, key) {
                        assert_eq!(value, key * 10);
                        hits.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    for shard in 0..CLASS_NUM {
        assert!(cache.shard_metrics(shard).cache_size_bytes <= capacity);
    }
    let metrics = cache.cooperative_metrics();
    assert_eq!(
        (metrics.local_hits + metrics.peer_hits) as usize,
        hits.load(Ordering::Relaxed)
    );
}

#[test]
fn stress_coloring_mixed_workload() {
    hammer(make_cache(coloring_summary(), 2048, 0.1), 2048);
}

#[test]
fn stress_bloom_mixed_workload() {
    hammer(make_cache(bloom_summary(), 2048, 0.1), 2048);
}

/// Synchronizations and rebuilds interleave with lookups
#[test]
fn stress_sync_races_with_lookups() {
    let cache = make_cache(coloring_summary(), 4096, 0.5);
    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let shard = t % CLASS_NUM;
                for i in 0..OPS_PER_THREAD as u64 {
                    match i % 50 {
                        0 => cache.synchronize(shard),
                        1 if t == 0 => {
                            cache.rebuild_summary();
                        }
                        _ => {
                            cache.put(shard, i % 500, i, 1);
                            let _ = cache.lookup((shard + 1) % CLASS_NUM, i % 500);
                        }
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    cache.synchronize_all();
    for shard in 0..CLASS_NUM {
        assert_eq!(cache.stats(shard).pending(), 0);
    }
}

/// Invalidation racing with peer probes never yields a stale payload
#[test]
fn stress_remove_hint_races_with_probes() {
    let cache = make_cache(bloom_summary(), 1 << 20, 0.05);
    for key in 0..1000u64 {
        cache.put(0, key, key, 1);
    }
    cache.synchronize(0);

    let remover = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            for key in (0..1000u64).step_by(2) {
                cache.remove_hint(0, key);
            }
        })
    };
    let readers: Vec<_> = (1..CLASS_NUM)
        .map(|shard| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for key in 0..1000u64 {
                    match cache.lookup(shard, key) {
                        Lookup::LocalHit(value) | Lookup::PeerHit { value, .. } => {
                            assert_eq!(value, key)
                        }
                        Lookup::Miss => {}
                    }
                }
            })
        })
        .collect();
    remover.join().expect("Thread panicked");
    for reader in readers {
        reader.join().expect("Thread panicked");
    }

    for key in (0..1000u64).step_by(2) {
        assert!(!cache.contains(0, key));
    }
}

/// Scoped pool workers, one per shard, the way a shard-per-core server runs
#[test]
fn stress_scoped_pool_shard_workers() {
    let cache = make_cache(bloom_summary(), 8192, 0.2);
    let mut pool = scoped_threadpool::Pool::new(CLASS_NUM as u32);
    pool.scoped(|scope| {
        for shard in 0..CLASS_NUM {
            let cache = &cache;
            scope.execute(move || {
                for i in 0..OPS_PER_THREAD as u64 {
                    let key = shard as u64 * 100_000 + i % 1500;
                    cache.put(shard, key, i, 4);
                }
            });
        }
    });
    cache.synchronize_all();

    for shard in 0..CLASS_NUM {
        let metrics = cache.shard_metrics(shard);
        assert!(metrics.cache_size_bytes <= 8192);
        assert_eq!(metrics.cache_size_bytes, cache.stats(shard).resident_count as u64 * 4);
    }
}
