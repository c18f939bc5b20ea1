//! Cache Metrics System
//!
//! Metrics are reported as `BTreeMap<String, f64>` so that every report has the
//! same, alphabetical key order. Two layers are tracked:
//!
//! - [`CoreCacheMetrics`]: per-shard counters (requests, hits, bytes, evictions)
//!   maintained by [`SizeBoundedLru`](crate::SizeBoundedLru).
//! - [`CooperativeCacheMetrics`]: coordinator-level counters describing how
//!   well the membership summary routes misses (peer hits, false-positive
//!   probes, synchronizations).

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

pub mod cooperative;

pub use cooperative::{CooperativeCacheMetrics, SharedCooperativeMetrics};

/// Counters tracked by every shard cache.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CoreCacheMetrics {
    /// Total number of lookups made against the shard
    pub requests: u64,

    /// Lookups that found the key resident
    pub cache_hits: u64,

    /// Total bytes served by hits
    pub bytes_served_from_cache: u64,

    /// Total bytes written into the shard (new entries and replacements)
    pub bytes_written_to_cache: u64,

    /// Entries evicted to make room
    pub evictions: u64,

    /// Entries removed explicitly (invalidation)
    pub removals: u64,

    /// Bytes currently charged against the shard budget
    pub cache_size_bytes: u64,

    /// The shard budget in bytes
    pub max_cache_size_bytes: u64,
}

impl CoreCacheMetrics {
    /// Creates an empty metrics set for a shard with the given byte budget.
    pub fn new(max_cache_size_bytes: u64) -> Self {
        Self {
            max_cache_size_bytes,
            ..Default::default()
        }
    }

    /// Records a lookup that found `object_size` bytes.
    pub fn record_hit(&mut self, object_size: u64) {
        self.requests += 1;
        self.cache_hits += 1;
        self.bytes_served_from_cache += object_size;
    }

    /// Records a lookup that found nothing.
    pub fn record_miss(&mut self) {
        self.requests += 1;
    }

    /// Records an entry evicted for space.
    pub fn record_eviction(&mut self, evicted_size: u64) {
        self.evictions += 1;
        self.cache_size_bytes = self.cache_size_bytes.saturating_sub(evicted_size);
    }

    /// Records an entry removed by invalidation.
    pub fn record_removal(&mut self, removed_size: u64) {
        self.removals += 1;
        self.cache_size_bytes = self.cache_size_bytes.saturating_sub(removed_size);
    }

    /// Records a newly admitted entry.
    pub fn record_insertion(&mut self, object_size: u64) {
        self.cache_size_bytes += object_size;
        self.bytes_written_to_cache += object_size;
    }

    /// Records a resident entry whose payload was replaced.
    pub fn record_size_change(&mut self, old_size: u64, new_size: u64) {
        self.cache_size_bytes = self.cache_size_bytes - old_size + new_size;
        self.bytes_written_to_cache += new_size;
    }

    /// Fraction of lookups that hit, or 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        if self.requests > 0 {
            self.cache_hits as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// Occupied bytes over the budget, or 0.0 for a zero budget.
    pub fn cache_utilization(&self) -> f64 {
        if self.max_cache_size_bytes > 0 {
            self.cache_size_bytes as f64 / self.max_cache_size_bytes as f64
        } else {
            0.0
        }
    }

    /// Converts the counters to a report with deterministic key order.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();

        metrics.insert("cache_hits".to_string(), self.cache_hits as f64);
        metrics.insert(
            "cache_misses".to_string(),
            (self.requests - self.cache_hits) as f64,
        );
        metrics.insert("evictions".to_string(), self.evictions as f64);
        metrics.insert("removals".to_string(), self.removals as f64);
        metrics.insert("requests".to_string(), self.requests as f64);
        metrics.insert("hit_rate".to_string(), self.hit_rate());

        metrics.insert(
            "bytes_served_from_cache".to_string(),
            self.bytes_served_from_cache as f64,
        );
        metrics.insert(
            "bytes_written_to_cache".to_string(),
            self.bytes_written_to_cache as f64,
        );

        metrics.insert("cache_size_bytes".to_string(), self.cache_size_bytes as f64);
        metrics.insert(
            "max_cache_size_bytes".to_string(),
            self.max_cache_size_bytes as f64,
        );
        metrics.insert("cache_utilization".to_string(), self.cache_utilization());

        metrics
    }
}

/// Uniform metrics reporting for shards and coordinators.
pub trait CacheMetrics {
    /// Returns all metrics as key-value pairs in deterministic order.
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Short name identifying the reporting component (e.g. `"LRU"`).
    fn algorithm_name(&self) -> &'static str;
}
