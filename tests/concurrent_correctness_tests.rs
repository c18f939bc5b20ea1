//! Concurrent Cooperative Cache Correctness Tests
//!
//! These tests validate that the concurrent coordinator keeps the routing
//! and synchronization semantics of the single-threaded one while shards are
//! driven from separate threads.
//!
//! ## Test Strategy
//!
//! - Small shards for predictable eviction
//! - One writer thread per shard, the way a per-shard worker pool runs
//! - Checks after joining, so assertions never race with writers
//!
//! ## Segments
//!
//! 1. **Routing Correctness**: peer hits, misses and eviction visibility
//! 2. **Thread Safety Invariants**: shard budgets and metrics under concurrency

#![cfg(feature = "concurrent")]

use coop_cache::config::{
    ColoringConfig, CooperativeCacheConfig, CountingBloomConfig, SummaryConfig,
};
use coop_cache::metrics::CacheMetrics;
use coop_cache::{ConcurrentCooperativeCache, Lookup};
use std::sync::Arc;
use std::thread;

const CLASS_NUM: usize = 4;

fn bloom_cache(capacity: u64, threshold: f64) -> ConcurrentCooperativeCache<u64> {
    let summary = SummaryConfig::CountingBloom(CountingBloomConfig {
        num_bits: 1 << 15,
        hash_count: 4,
        count_bits: 4,
    });
    let config = CooperativeCacheConfig::new(capacity, CLASS_NUM, summary).with_threshold(threshold);
    ConcurrentCooperativeCache::init(config).unwrap()
}

fn coloring_cache(capacity: u64, threshold: f64) -> ConcurrentCooperativeCache<u64> {
    let summary = SummaryConfig::Coloring(ColoringConfig {
        bucket_num: 1 << 18,
        color_num: 2,
    });
    let config = CooperativeCacheConfig::new(capacity, CLASS_NUM, summary).with_threshold(threshold);
    ConcurrentCooperativeCache::init(config).unwrap()
}

fn key_of(shard: usize, i: u64) -> u64 {
    shard as u64 * 1_000_000 + i
}

// ============================================================================
// SEGMENT 1: ROUTING CORRECTNESS
// ============================================================================

#[test]
fn test_concurrent_peer_hit_after_sync() {
    for cache in [bloom_cache(1024, 1.0), coloring_cache(1024, 1.0)] {
        cache.put(2, 99, 990, 1);
        cache.synchronize(2);
        assert_eq!(cache.lookup(0, 99), Lookup::PeerHit { from: 2, value: 990 });
        assert_eq!(cache.lookup(0, 99), Lookup::LocalHit(990));
        let metrics = cache.cooperative_metrics();
        assert_eq!(metrics.peer_hits, 1);
        assert_eq!(metrics.local_hits, 1);
    }
}

#[test]
fn test_concurrent_eviction_reaches_peers() {
    let cache = bloom_cache(3, 1.0);
    for i in 0..6 {
        cache.put(1, i, i, 1);
    }
    cache.synchronize(1);
    for i in 0..3 {
        assert_eq!(cache.lookup(0, i), Lookup::Miss, "key {i} still advertised");
    }
    for i in 3..6 {
        assert!(cache.lookup(0, i).is_hit());
    }
}

#[test]
fn test_concurrent_threshold_rule() {
    let cache = bloom_cache(1024, 0.5);
    for i in 0..4 {
        cache.put(3, i, i, 1);
    }
    cache.synchronize(3);
    let before = cache.cooperative_metrics().synchronizations;
    cache.put(3, 0, 100, 1);
    assert_eq!(cache.cooperative_metrics().synchronizations, before);
    cache.put(3, 1, 101, 1);
    assert_eq!(cache.cooperative_metrics().synchronizations, before + 1);
}

// ============================================================================
// SEGMENT 2: THREAD SAFETY INVARIANTS
// ============================================================================

#[test]
fn test_per_shard_workers_find_each_other() {
    let cache = Arc::new(bloom_cache(1 << 20, 0.05));

    let handles: Vec<_> = (0..CLASS_NUM)
        .map(|shard| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..1000 {
                    cache.put(shard, key_of(shard, i), i, 16);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }
    cache.synchronize_all();

    let handles: Vec<_> = (0..CLASS_NUM)
        .map(|shard| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let owner = (shard + 1) % CLASS_NUM;
                for i in 0..1000 {
                    assert_eq!(cache.get(shard, key_of(owner, i)), Some(i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert_eq!(cache.cooperative_metrics().peer_hits, (CLASS_NUM * 1000) as u64);
}

#[test]
fn test_shard_budgets_hold_under_concurrency() {
    let capacity = 4096;
    let cache = Arc::new(coloring_cache(capacity, 0.1));

    let handles: Vec<_> = (0..CLASS_NUM)
        .map(|shard| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..2000u64 {
                    cache.put(shard, key_of(shard, i), i, 1 + i % 32);
                    let peer = (shard + 1) % CLASS_NUM;
                    let _ = cache.get(shard, key_of(peer, i / 2));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    for shard in 0..CLASS_NUM {
        let metrics = cache.shard_metrics(shard);
        assert!(metrics.cache_size_bytes <= capacity);
    }
    let report = cache.metrics();
    assert!(report.contains_key("shard3.evictions"));
    assert_eq!(cache.algorithm_name(), "ConcurrentCooperative-CC");
}

#[test]
fn test_rebuild_under_concurrent_readers() {
    let cache = Arc::new(coloring_cache(1 << 20, 0.01));
    for shard in 0..CLASS_NUM {
        for i in 0..200 {
            cache.put(shard, key_of(shard, i), i, 1);
        }
    }
    cache.synchronize_all();

    let readers: Vec<_> = (0..CLASS_NUM)
        .map(|shard| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let owner = (shard + 2) % CLASS_NUM;
                for i in 0..200 {
                    let _ = cache.get(shard, key_of(owner, i));
                }
            })
        })
        .collect();
    assert!(cache.rebuild_summary());
    for reader in readers {
        reader.join().expect("Thread panicked");
    }
    assert_eq!(cache.cooperative_metrics().summary_rebuilds, 1);
}
