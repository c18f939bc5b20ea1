//! Cooperative Cache Usage Example
//!
//! Walks through the single-threaded coordinator: local and peer hits, the
//! synchronization threshold, invalidation and the metrics report.
//!
//! Run with: RUST_LOG=coop_cache=debug cargo run --example cooperative_usage

use coop_cache::config::{ColoringConfig, CooperativeCacheConfig, SummaryConfig};
use coop_cache::metrics::CacheMetrics;
use coop_cache::{CooperativeCache, Lookup};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const CLASS_NUM: usize = 4;

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_target(true))
        .init();

    println!("Cooperative Cache Usage");
    println!("=======================\n");

    let summary = SummaryConfig::Coloring(ColoringConfig {
        bucket_num: 1 << 14,
        color_num: 2,
    });
    let config = CooperativeCacheConfig::new(64 * 1024, CLASS_NUM, summary).with_threshold(0.1);
    let mut cache: CooperativeCache<String> = match CooperativeCache::init(config) {
        Ok(cache) => cache,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return;
        }
    };

    basic_routing(&mut cache);
    println!();

    threshold_behaviour(&mut cache);
    println!();

    invalidation(&mut cache);
    println!();

    print_metrics(&cache);
}

/// Puts on one shard, finds the entry from every other shard
fn basic_routing(cache: &mut CooperativeCache<String>) {
    println!("1. Routing");
    println!("   -------");

    cache.put(1, 42, String::from("the answer"), 10);
    cache.synchronize(1);

    for shard in 0..CLASS_NUM {
        match cache.lookup(shard, 42) {
            Lookup::LocalHit(value) => println!("   shard {shard}: local hit  -> {value}"),
            Lookup::PeerHit { from, value } => {
                println!("   shard {shard}: peer hit from shard {from} -> {value}")
            }
            Lookup::Miss => println!("   shard {shard}: miss"),
        }
    }
}

/// Shows pending churn accumulating until the shard publishes it
fn threshold_behaviour(cache: &mut CooperativeCache<String>) {
    println!("2. Synchronization threshold ({})", cache.threshold());
    println!("   ------------------------------");

    for key in 0..40u64 {
        let before = cache.cooperative_metrics().synchronizations;
        cache.put(2, 1000 + key, format!("value-{key}"), 64);
        let stats = cache.stats(2);
        if cache.cooperative_metrics().synchronizations > before {
            println!(
                "   put #{key:>2}: synchronized with {} residents",
                stats.resident_count
            );
        }
    }
}

/// Invalidation withdraws the entry from the summary at the next sync
fn invalidation(cache: &mut CooperativeCache<String>) {
    println!("3. Invalidation");
    println!("   ------------");

    cache.put(3, 7, String::from("short-lived"), 16);
    cache.synchronize(3);
    println!("   hit before: {}", cache.lookup(0, 7).is_hit());

    // Shard 0 now holds a copy too
    cache.remove_hint(0, 7);
    cache.remove_hint(3, 7);
    cache.synchronize_all();
    println!("   hit after:  {}", cache.lookup(0, 7).is_hit());
}

fn print_metrics(cache: &CooperativeCache<String>) {
    println!("4. Metrics ({})", cache.algorithm_name());
    println!("   ----------");
    for (name, value) in cache.metrics() {
        if !name.starts_with("shard") {
            println!("   {name:<24} {value}");
        }
    }
}
