//! Cooperative Cache Metrics
//!
//! Counters describing how misses are routed through the membership summary.
//! A summary false positive is a candidate shard that was probed and did not
//! hold the key; a summary miss is a lookup that ended with no copy found
//! anywhere the summary pointed.

extern crate alloc;

use super::CacheMetrics;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use core::sync::atomic::{AtomicU64, Ordering};

/// Coordinator-level routing counters.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CooperativeCacheMetrics {
    /// Lookups answered by the caller's own shard
    pub local_hits: u64,

    /// Lookups answered by a peer shard the summary pointed to
    pub peer_hits: u64,

    /// Candidate shards probed that did not hold the key
    pub false_positive_probes: u64,

    /// Lookups that found no copy anywhere the summary pointed
    pub summary_misses: u64,

    /// Delta flushes into the summary
    pub synchronizations: u64,

    /// Coloring constraints that could not be satisfied
    pub coloring_conflicts: u64,

    /// Full summary rebuilds
    pub summary_rebuilds: u64,
}

impl CooperativeCacheMetrics {
    /// Total lookups seen by the coordinator.
    pub fn lookups(&self) -> u64 {
        self.local_hits + self.peer_hits + self.summary_misses
    }

    /// Fraction of local misses that the summary turned into peer hits.
    pub fn peer_hit_rate(&self) -> f64 {
        let misses = self.peer_hits + self.summary_misses;
        if misses > 0 {
            self.peer_hits as f64 / misses as f64
        } else {
            0.0
        }
    }

    /// Converts the counters to a report with deterministic key order.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();
        metrics.insert(
            "coloring_conflicts".to_string(),
            self.coloring_conflicts as f64,
        );
        metrics.insert(
            "false_positive_probes".to_string(),
            self.false_positive_probes as f64,
        );
        metrics.insert("local_hits".to_string(), self.local_hits as f64);
        metrics.insert("lookups".to_string(), self.lookups() as f64);
        metrics.insert("peer_hit_rate".to_string(), self.peer_hit_rate());
        metrics.insert("peer_hits".to_string(), self.peer_hits as f64);
        metrics.insert("summary_misses".to_string(), self.summary_misses as f64);
        metrics.insert("summary_rebuilds".to_string(), self.summary_rebuilds as f64);
        metrics.insert("synchronizations".to_string(), self.synchronizations as f64);
        metrics
    }
}

impl CacheMetrics for CooperativeCacheMetrics {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "Cooperative"
    }
}

/// Lock-free variant of [`CooperativeCacheMetrics`] for shared coordinators.
#[derive(Debug, Default)]
pub struct SharedCooperativeMetrics {
    local_hits: AtomicU64,
    peer_hits: AtomicU64,
    false_positive_probes: AtomicU64,
    summary_misses: AtomicU64,
    synchronizations: AtomicU64,
    coloring_conflicts: AtomicU64,
    summary_rebuilds: AtomicU64,
}

impl SharedCooperativeMetrics {
    #[inline]
    pub(crate) fn record_local_hit(&self) {
        self.local_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_peer_hit(&self) {
        self.peer_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_false_positive(&self) {
        self.false_positive_probes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_summary_miss(&self) {
        self.summary_misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_synchronization(&self) {
        self.synchronizations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_coloring_conflicts(&self, count: u64) {
        self.coloring_conflicts.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_rebuild(&self) {
        self.summary_rebuilds.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the current counter values.
    ///
    /// Counters are read independently, so a snapshot taken under load may
    /// mix values from slightly different instants.
    pub fn snapshot(&self) -> CooperativeCacheMetrics {
        CooperativeCacheMetrics {
            local_hits: self.local_hits.load(Ordering::Relaxed),
            peer_hits: self.peer_hits.load(Ordering::Relaxed),
            false_positive_probes: self.false_positive_probes.load(Ordering::Relaxed),
            summary_misses: self.summary_misses.load(Ordering::Relaxed),
            synchronizations: self.synchronizations.load(Ordering::Relaxed),
            coloring_conflicts: self.coloring_conflicts.load(Ordering::Relaxed),
            summary_rebuilds: self.summary_rebuilds.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_hit_rate() {
        let metrics = CooperativeCacheMetrics {
            local_hits: 10,
            peer_hits: 3,
            summary_misses: 1,
            ..Default::default()
        };
        assert_eq!(metrics.lookups(), 14);
        assert!((metrics.peer_hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(metrics.algorithm_name(), "Cooperative");
    }

    #[test]
    fn test_shared_snapshot() {
        let shared = SharedCooperativeMetrics::default();
        shared.record_local_hit();
        shared.record_peer_hit();
        shared.record_false_positive();
        shared.record_coloring_conflicts(2);
        let snap = shared.snapshot();
        assert_eq!(snap.local_hits, 1);
        assert_eq!(snap.peer_hits, 1);
        assert_eq!(snap.false_positive_probes, 1);
        assert_eq!(snap.coloring_conflicts, 2);
        assert_eq!(snap.synchronizations, 0);
    }
}
