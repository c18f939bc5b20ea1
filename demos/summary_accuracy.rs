//! Summary Accuracy Comparison
//!
//! Loads the same labelled key set into both membership summaries and
//! reports how often each one answers correctly, for resident keys and for
//! keys that were never inserted.
//!
//! Run with: cargo run --example summary_accuracy

use coop_cache::config::{ColoringConfig, CountingBloomConfig};
use coop_cache::{CountingBloomFilterGroup, ShiftingColoringClassifier};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const CLASS_NUM: usize = 8;
const KEY_COUNT: u64 = 20_000;

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let items: Vec<(u64, usize)> = (0..KEY_COUNT)
        .map(|k| (mix(k), (k % CLASS_NUM as u64) as usize))
        .collect();
    let absent: Vec<u64> = (KEY_COUNT..2 * KEY_COUNT).map(mix).collect();

    println!("Summary accuracy, {KEY_COUNT} keys over {CLASS_NUM} classes");
    println!("==============================================\n");
    println!(
        "{:<28} {:>12} {:>14} {:>16}",
        "summary", "size (KiB)", "resident ok", "absent flagged"
    );

    for bucket_num in [1usize << 16, 1 << 17, 1 << 18] {
        coloring_row(&items, &absent, bucket_num);
    }
    for num_bits in [1usize << 17, 1 << 18, 1 << 19] {
        bloom_row(&items, &absent, num_bits);
    }
}

fn coloring_row(items: &[(u64, usize)], absent: &[u64], bucket_num: usize) {
    let config = ColoringConfig {
        bucket_num,
        color_num: 2,
    };
    let mut cc = ShiftingColoringClassifier::init(config, CLASS_NUM).expect("valid coloring config");
    let built = cc.build(items);
    let correct = items
        .iter()
        .filter(|&&(key, class)| cc.query(key) == class)
        .count();
    // Every key maps to some class, so absent keys are always flagged
    let size_kib = bucket_num as f64 * f64::from(cc.planes()) / 8.0 / 1024.0;
    println!(
        "{:<28} {:>12.1} {:>13.2}% {:>15.2}%{}",
        format!("{} ({bucket_num} buckets)", cc.name()),
        size_kib,
        percent(correct, items.len()),
        percent(absent.len(), absent.len()),
        if built { "" } else { "  (inconsistent)" }
    );
}

fn bloom_row(items: &[(u64, usize)], absent: &[u64], num_bits: usize) {
    let config = CountingBloomConfig {
        num_bits,
        hash_count: 4,
        count_bits: 4,
    };
    let mut group = CountingBloomFilterGroup::init(CLASS_NUM, config).expect("valid bloom config");
    for &(key, class) in items {
        group.insert(key, class);
    }
    let correct = items
        .iter()
        .filter(|&&(key, class)| group.query(key) == [class])
        .count();
    let flagged = absent
        .iter()
        .filter(|&&key| !group.query(key).is_empty())
        .count();
    let size_kib = (num_bits * CLASS_NUM) as f64 * f64::from(config.count_bits) / 8.0 / 1024.0;
    println!(
        "{:<28} {:>12.1} {:>13.2}% {:>15.2}%",
        format!("CBF ({num_bits} counters)"),
        size_kib,
        percent(correct, items.len()),
        percent(flagged, absent.len()),
    );
}

fn mix(k: u64) -> u64 {
    k.wrapping_mul(0x9e37_79b9_7f4a_7c15) ^ 0x5bd1_e995
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}
