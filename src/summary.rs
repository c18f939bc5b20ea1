//! Membership summaries.
//!
//! A summary predicts which shards may hold a key so that a local miss can be
//! routed to a peer instead of the origin. Two backends exist:
//!
//! | Backend | Answer | Updated |
//! |---------|--------|---------|
//! | [`ShiftingColoringClassifier`] | one predicted shard | on synchronization only |
//! | [`CountingBloomFilterGroup`] | every shard whose filter matches | own filter immediately, peers on synchronization |
//!
//! Both are driven through [`MembershipSummary`]; [`Summary`] selects one
//! from a [`SummaryConfig`].

extern crate alloc;

use crate::config::SummaryConfig;
use crate::counting_bloom::CountingBloomFilterGroup;
use crate::delta::DeltaLog;
use crate::shift_coloring::ShiftingColoringClassifier;
use alloc::string::String;
use alloc::vec::Vec;

/// Operations a coordinator needs from a membership summary.
pub trait MembershipSummary {
    /// Backend name used in logs and reports.
    fn name(&self) -> String;

    /// Number of shards the summary describes.
    fn class_num(&self) -> usize;

    /// A key became resident in `shard`.
    fn on_insert(&mut self, shard: usize, key: u64);

    /// A key left `shard` (evicted or invalidated).
    fn on_remove(&mut self, shard: usize, key: u64);

    /// Shards other than `viewer` that `viewer` should probe for `key`, in
    /// probe order.
    fn candidates(&self, viewer: usize, key: u64) -> Vec<usize>;

    /// Publishes `shard`'s pending churn. Returns the number of constraints
    /// that could not be applied.
    ///
    /// `delta.inserted` must list only keys still resident in `shard`; see
    /// [`DeltaTrackingCache::take_resident_delta`](crate::DeltaTrackingCache::take_resident_delta).
    fn synchronize(&mut self, shard: usize, delta: &DeltaLog) -> usize;

    /// Recomputes the summary from `resident`, one `(key, shard)` pair per
    /// key the shards currently hold. Returns false if the result is still
    /// inconsistent.
    fn rebuild(&mut self, resident: &[(u64, usize)]) -> bool;
}

impl MembershipSummary for ShiftingColoringClassifier {
    fn name(&self) -> String {
        ShiftingColoringClassifier::name(self)
    }

    fn class_num(&self) -> usize {
        ShiftingColoringClassifier::class_num(self)
    }

    // The classifier only learns about churn when the shard synchronizes.
    fn on_insert(&mut self, _shard: usize, _key: u64) {}

    fn on_remove(&mut self, _shard: usize, _key: u64) {}

    fn candidates(&self, viewer: usize, key: u64) -> Vec<usize> {
        let predicted = self.query(key);
        if predicted == viewer {
            Vec::new()
        } else {
            alloc::vec![predicted]
        }
    }

    fn synchronize(&mut self, shard: usize, delta: &DeltaLog) -> usize {
        // Removals first so a key evicted and re-admitted in the same window
        // ends up present.
        for &key in &delta.removed {
            self.remove(key, shard);
        }
        delta
            .inserted
            .iter()
            .filter(|&&key| !self.insert(key, shard))
            .count()
    }

    fn rebuild(&mut self, resident: &[(u64, usize)]) -> bool {
        self.build(resident)
    }
}

impl MembershipSummary for CountingBloomFilterGroup {
    fn name(&self) -> String {
        String::from("CBF")
    }

    fn class_num(&self) -> usize {
        CountingBloomFilterGroup::class_num(self)
    }

    fn on_insert(&mut self, shard: usize, key: u64) {
        self.insert(key, shard);
    }

    fn on_remove(&mut self, shard: usize, key: u64) {
        self.remove(key, shard);
    }

    fn candidates(&self, viewer: usize, key: u64) -> Vec<usize> {
        let mut classes = self.query_from(viewer, key);
        classes.retain(|&class| class != viewer);
        classes
    }

    fn synchronize(&mut self, shard: usize, _delta: &DeltaLog) -> usize {
        // The flip already mirrors the delta
        CountingBloomFilterGroup::synchronize(self, shard);
        0
    }

    // Counters track residency exactly, apart from saturation.
    fn rebuild(&mut self, _resident: &[(u64, usize)]) -> bool {
        true
    }
}

/// The summary backend selected by configuration.
#[derive(Debug)]
pub enum Summary {
    /// Shared bucket coloring classifier.
    Coloring(ShiftingColoringClassifier),
    /// Counting Bloom filters with per-shard replicas.
    CountingBloom(CountingBloomFilterGroup),
}

impl Summary {
    /// Builds an empty summary for `class_num` shards.
    ///
    /// `config` is expected to have been validated for `class_num`.
    pub fn new(config: SummaryConfig, class_num: usize) -> Self {
        match config {
            SummaryConfig::Coloring(config) => {
                Summary::Coloring(ShiftingColoringClassifier::new(config, class_num))
            }
            SummaryConfig::CountingBloom(config) => {
                Summary::CountingBloom(CountingBloomFilterGroup::new(class_num, config))
            }
        }
    }

    fn backend(&self) -> &dyn MembershipSummary {
        match self {
            Summary::Coloring(cc) => cc,
            Summary::CountingBloom(group) => group,
        }
    }

    fn backend_mut(&mut self) -> &mut dyn MembershipSummary {
        match self {
            Summary::Coloring(cc) => cc,
            Summary::CountingBloom(group) => group,
        }
    }
}

impl MembershipSummary for Summary {
    fn name(&self) -> String {
        self.backend().name()
    }

    fn class_num(&self) -> usize {
        self.backend().class_num()
    }

    fn on_insert(&mut self, shard: usize, key: u64) {
        self.backend_mut().on_insert(shard, key);
    }

    fn on_remove(&mut self, shard: usize, key: u64) {
        self.backend_mut().on_remove(shard, key);
    }

    fn candidates(&self, viewer: usize, key: u64) -> Vec<usize> {
        self.backend().candidates(viewer, key)
    }

    fn synchronize(&mut self, shard: usize, delta: &DeltaLog) -> usize {
        self.backend_mut().synchronize(shard, delta)
    }

    fn rebuild(&mut self, resident: &[(u64, usize)]) -> bool {
        self.backend_mut().rebuild(resident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColoringConfig, CountingBloomConfig};
    use alloc::vec;

    fn coloring(class_num: usize) -> Summary {
        Summary::new(
            SummaryConfig::Coloring(ColoringConfig {
                bucket_num: 1 << 12,
                color_num: 2,
            }),
            class_num,
        )
    }

    fn bloom(class_num: usize) -> Summary {
        Summary::new(
            SummaryConfig::CountingBloom(CountingBloomConfig {
                num_bits: 4096,
                hash_count: 4,
                count_bits: 4,
            }),
            class_num,
        )
    }

    #[test]
    fn test_names() {
        assert_eq!(coloring(4).name(), "CC2");
        assert_eq!(bloom(4).name(), "CBF");
        assert_eq!(bloom(3).class_num(), 3);
    }

    #[test]
    fn test_coloring_learns_only_on_synchronize() {
        let mut summary = coloring(4);
        summary.on_insert(2, 500);
        let delta = DeltaLog {
            inserted: vec![500],
            removed: vec![],
        };
        assert_eq!(summary.synchronize(2, &delta), 0);
        assert_eq!(summary.candidates(0, 500), vec![2]);
        // The owner never probes itself
        assert!(summary.candidates(2, 500).is_empty());
    }

    #[test]
    fn test_coloring_replays_removals_before_inserts() {
        let mut summary = coloring(2);
        let delta = DeltaLog {
            inserted: vec![9],
            removed: vec![9],
        };
        summary.synchronize(1, &delta);
        if let Summary::Coloring(cc) = &summary {
            assert_eq!(cc.stored_class(9), Some(1));
        }
    }

    #[test]
    fn test_bloom_candidates_follow_flips() {
        let mut summary = bloom(3);
        summary.on_insert(1, 42);
        assert!(!summary.candidates(0, 42).contains(&1));
        summary.synchronize(1, &DeltaLog::default());
        assert!(summary.candidates(0, 42).contains(&1));
        assert!(summary.candidates(2, 42).contains(&1));
        assert!(!summary.candidates(1, 42).contains(&1));
        assert!(summary.rebuild(&[]));
    }

    #[test]
    fn test_coloring_rebuild_replaces_stored_state() {
        let mut summary = coloring(4);
        let delta = DeltaLog {
            inserted: vec![1, 2],
            removed: vec![],
        };
        summary.synchronize(1, &delta);
        assert!(summary.rebuild(&[(2, 3), (5, 0)]));
        if let Summary::Coloring(cc) = &summary {
            assert!(!cc.contains(1));
            assert_eq!(cc.stored_class(2), Some(3));
            assert_eq!(cc.stored_class(5), Some(0));
        }
        assert_eq!(summary.candidates(0, 2), vec![3]);
    }
}
