//! Concurrent Cooperative Cache Usage
//!
//! One worker thread per shard, all sharing a `ConcurrentCooperativeCache`
//! behind an `Arc`. Workers populate their own shard, then read a
//! neighbour's keys and are served by peer hits.
//!
//! Run with: cargo run --example concurrent_usage --features concurrent

use coop_cache::config::{CooperativeCacheConfig, CountingBloomConfig, SummaryConfig};
use coop_cache::ConcurrentCooperativeCache;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const CLASS_NUM: usize = 4;
const KEYS_PER_SHARD: u64 = 10_000;

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_thread_names(true))
        .init();

    println!("Concurrent Cooperative Cache");
    println!("============================\n");

    let summary = SummaryConfig::CountingBloom(CountingBloomConfig {
        num_bits: 1 << 18,
        hash_count: 4,
        count_bits: 4,
    });
    let config = CooperativeCacheConfig::new(1 << 20, CLASS_NUM, summary).with_threshold(0.05);
    let cache = match ConcurrentCooperativeCache::<u64>::init(config) {
        Ok(cache) => Arc::new(cache),
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return;
        }
    };

    let start = Instant::now();
    run_workers(&cache, |cache, shard| {
        for i in 0..KEYS_PER_SHARD {
            cache.put(shard, key_of(shard, i), i, 32);
        }
    });
    cache.synchronize_all();
    println!("Populated {CLASS_NUM} shards in {:?}", start.elapsed());

    let start = Instant::now();
    run_workers(&cache, |cache, shard| {
        let neighbour = (shard + 1) % CLASS_NUM;
        for i in 0..KEYS_PER_SHARD {
            let _ = cache.get(shard, key_of(neighbour, i));
        }
    });
    println!("Cross-shard reads took {:?}\n", start.elapsed());

    let metrics = cache.cooperative_metrics();
    println!("local hits:            {}", metrics.local_hits);
    println!("peer hits:             {}", metrics.peer_hits);
    println!("false-positive probes: {}", metrics.false_positive_probes);
    println!("summary misses:        {}", metrics.summary_misses);
    println!("synchronizations:      {}", metrics.synchronizations);
    for shard in 0..CLASS_NUM {
        let stats = cache.stats(shard);
        println!(
            "shard {shard}: {} residents, {} bytes",
            stats.resident_count,
            cache.shard_metrics(shard).cache_size_bytes
        );
    }
}

fn key_of(shard: usize, i: u64) -> u64 {
    shard as u64 * 1_000_000 + i
}

fn run_workers<F>(cache: &Arc<ConcurrentCooperativeCache<u64>>, work: F)
where
    F: Fn(&ConcurrentCooperativeCache<u64>, usize) + Send + Sync + Copy + 'static,
{
    let handles: Vec<_> = (0..CLASS_NUM)
        .map(|shard| {
            let cache = Arc::clone(cache);
            thread::Builder::new()
                .name(format!("shard-{shard}"))
                .spawn(move || work(&cache, shard))
                .expect("failed to spawn worker")
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }
}
