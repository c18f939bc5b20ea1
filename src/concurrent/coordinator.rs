//! Concurrent cooperative cache coordinator.
//!
//! Same routing and synchronization rules as
//! [`CooperativeCache`](crate::CooperativeCache); see the
//! [module docs](crate::concurrent) for the locking layout.
//!
//! # Thread Safety
//!
//! `ConcurrentCooperativeCache<V>` is `Send + Sync` whenever `V` is, and is
//! meant to be shared through an `Arc`.

extern crate alloc;

use crate::config::{CooperativeCacheConfig, SummaryConfig};
use crate::coordinator::{collect_holders, shard_stats, sync_due, Lookup, ShardStats};
use crate::counting_bloom::CountingBloomFilter;
use crate::delta::DeltaTrackingCache;
use crate::error::ConfigError;
use crate::metrics::{
    CacheMetrics, CooperativeCacheMetrics, CoreCacheMetrics, SharedCooperativeMetrics,
};
use crate::shift_coloring::ShiftingColoringClassifier;
use crate::summary::MembershipSummary;
use crate::HashMap;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use parking_lot::RwLock;

enum SharedSummary {
    Coloring(RwLock<ShiftingColoringClassifier>),
    CountingBloom(Box<[RwLock<CountingBloomFilter>]>),
}

/// Thread-safe cooperative cache.
///
/// Every method takes `&self`. Payloads are cloned out under the shard lock,
/// which is released before the call returns.
///
/// # Panics
///
/// Every method taking a `shard_idx` panics if it is not below
/// [`class_num`](Self::class_num).
pub struct ConcurrentCooperativeCache<V> {
    shards: Box<[RwLock<DeltaTrackingCache<V>>]>,
    summary: SharedSummary,
    threshold: f64,
    metrics: SharedCooperativeMetrics,
}

impl<V: Clone> ConcurrentCooperativeCache<V> {
    /// Creates a concurrent cooperative cache from a validated configuration.
    pub fn init(config: CooperativeCacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let class_num = config.class_num;
        let summary = match config.summary {
            SummaryConfig::Coloring(coloring) => SharedSummary::Coloring(RwLock::new(
                ShiftingColoringClassifier::new(coloring, class_num),
            )),
            SummaryConfig::CountingBloom(bloom) => SharedSummary::CountingBloom(
                (0..class_num)
                    .map(|idx| RwLock::new(CountingBloomFilter::new(idx, class_num, bloom)))
                    .collect(),
            ),
        };
        Ok(ConcurrentCooperativeCache {
            shards: (0..class_num)
                .map(|_| RwLock::new(DeltaTrackingCache::init(config.shard_config())))
                .collect(),
            summary,
            threshold: config.threshold,
            metrics: SharedCooperativeMetrics::default(),
        })
    }

    /// Number of shards.
    #[inline]
    pub fn class_num(&self) -> usize {
        self.shards.len()
    }

    /// Churn fraction that triggers synchronization.
    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Looks `key` up on behalf of `shard_idx`, falling back to the peers
    /// the summary names.
    ///
    /// The local shard is write-locked for the promotion; peers are probed
    /// under read locks without touching their recency.
    pub fn lookup(&self, shard_idx: usize, key: u64) -> Lookup<V> {
        self.check_shard(shard_idx);

        let local = {
            let mut shard = self.shards[shard_idx].write();
            shard.get(key).map(|(value, _)| value.clone())
        };
        if let Some(value) = local {
            self.metrics.record_local_hit();
            return Lookup::LocalHit(value);
        }

        for peer in self.candidates(shard_idx, key) {
            let found = {
                let shard = self.shards[peer].read();
                shard.peek(key).map(|(value, size)| (value.clone(), size))
            };
            match found {
                Some((value, size)) => {
                    self.metrics.record_peer_hit();
                    tracing::trace!(shard = shard_idx, peer, key, "peer hit");
                    self.insert_local(shard_idx, key, value.clone(), size);
                    return Lookup::PeerHit { from: peer, value };
                }
                None => self.metrics.record_false_positive(),
            }
        }

        self.metrics.record_summary_miss();
        Lookup::Miss
    }

    /// [`lookup`](Self::lookup) reduced to the payload.
    pub fn get(&self, shard_idx: usize, key: u64) -> Option<V> {
        self.lookup(shard_idx, key).into_value()
    }

    /// Stores `key` in `shard_idx`.
    pub fn put(&self, shard_idx: usize, key: u64, value: V, size: u64) {
        self.check_shard(shard_idx);
        self.insert_local(shard_idx, key, value, size);
    }

    /// Invalidates `key` in `shard_idx`. Returns true if it was resident.
    pub fn remove_hint(&self, shard_idx: usize, key: u64) -> bool {
        self.check_shard(shard_idx);
        let mut shard = self.shards[shard_idx].write();
        if shard.remove(key).is_none() {
            return false;
        }
        if let SharedSummary::CountingBloom(filters) = &self.summary {
            filters[shard_idx].write().remove(key);
        }
        self.sync_if_due(shard_idx, &mut shard);
        true
    }

    /// Residency and pending churn of `shard_idx`.
    pub fn stats(&self, shard_idx: usize) -> ShardStats {
        self.check_shard(shard_idx);
        shard_stats(&*self.shards[shard_idx].read())
    }

    /// Synchronizes `shard_idx` if its pending churn has reached the
    /// threshold. Returns true if it synchronized.
    pub fn check_and_sync(&self, shard_idx: usize) -> bool {
        self.check_shard(shard_idx);
        let mut shard = self.shards[shard_idx].write();
        self.sync_if_due(shard_idx, &mut shard)
    }

    /// Pushes `shard_idx`'s pending churn into the summary and clears it.
    pub fn synchronize(&self, shard_idx: usize) {
        self.check_shard(shard_idx);
        let mut shard = self.shards[shard_idx].write();
        self.synchronize_locked(shard_idx, &mut shard);
    }

    /// Synchronizes every shard, in index order.
    pub fn synchronize_all(&self) {
        for shard_idx in 0..self.shards.len() {
            self.synchronize(shard_idx);
        }
    }

    /// Recomputes the summary from what the shards hold.
    ///
    /// Shards are snapshotted one read lock at a time before the summary is
    /// locked, so a removal a shard synchronizes while the snapshot is taken
    /// can be overwritten; the next rebuild drops it. A key resident in
    /// several shards is attributed to the lowest-indexed one. Returns false
    /// if the resulting constraints are inconsistent.
    pub fn rebuild_summary(&self) -> bool {
        let consistent = match &self.summary {
            SharedSummary::Coloring(cc) => {
                let mut holders = HashMap::new();
                for (idx, shard) in self.shards.iter().enumerate() {
                    collect_holders(&mut holders, idx, &*shard.read());
                }
                let resident: Vec<(u64, usize)> = holders.into_iter().collect();
                cc.write().build(&resident)
            }
            SharedSummary::CountingBloom(_) => true,
        };
        self.metrics.record_rebuild();
        tracing::debug!(consistent, "rebuilt summary");
        consistent
    }

    /// Snapshot of the routing counters.
    pub fn cooperative_metrics(&self) -> CooperativeCacheMetrics {
        self.metrics.snapshot()
    }

    /// Snapshot of the per-shard counters of `shard_idx`.
    pub fn shard_metrics(&self, shard_idx: usize) -> CoreCacheMetrics {
        self.check_shard(shard_idx);
        self.shards[shard_idx].read().cache().core_metrics().clone()
    }

    /// Returns true if `key` is resident in `shard_idx`.
    pub fn contains(&self, shard_idx: usize, key: u64) -> bool {
        self.check_shard(shard_idx);
        self.shards[shard_idx].read().contains(key)
    }

    fn candidates(&self, viewer: usize, key: u64) -> Vec<usize> {
        match &self.summary {
            SharedSummary::Coloring(cc) => cc.read().candidates(viewer, key),
            SharedSummary::CountingBloom(filters) => {
                let mut classes = filters[viewer].read().query_multiway(key);
                classes.retain(|&class| class != viewer);
                classes
            }
        }
    }

    fn insert_local(&self, shard_idx: usize, key: u64, value: V, size: u64) {
        let mut shard = self.shards[shard_idx].write();
        let is_new = !shard.contains(key);
        let evicted = shard.set(key, value, size);
        if let SharedSummary::CountingBloom(filters) = &self.summary {
            let mut filter = filters[shard_idx].write();
            for &gone in evicted {
                filter.remove(gone);
            }
            if is_new {
                filter.insert(key);
            }
        }
        self.sync_if_due(shard_idx, &mut shard);
    }

    fn sync_if_due(&self, shard_idx: usize, shard: &mut DeltaTrackingCache<V>) -> bool {
        if !sync_due(&shard_stats(&*shard), self.threshold) {
            return false;
        }
        self.synchronize_locked(shard_idx, shard);
        true
    }

    fn synchronize_locked(&self, shard_idx: usize, shard: &mut DeltaTrackingCache<V>) {
        let delta = shard.take_resident_delta();
        let conflicts = match &self.summary {
            SharedSummary::Coloring(cc) => cc.write().synchronize(shard_idx, &delta),
            SharedSummary::CountingBloom(filters) => {
                let flip = filters[shard_idx].write().take_flip();
                for (peer, filter) in filters.iter().enumerate() {
                    if peer != shard_idx {
                        filter.write().update(shard_idx, &flip);
                    }
                }
                0
            }
        };
        self.metrics.record_synchronization();
        self.metrics.record_coloring_conflicts(conflicts as u64);
        tracing::debug!(
            shard = shard_idx,
            inserted = delta.inserted.len(),
            removed = delta.removed.len(),
            conflicts,
            "synchronized shard"
        );
    }

    fn check_shard(&self, shard_idx: usize) {
        assert!(
            shard_idx < self.shards.len(),
            "shard index {} out of range for {} shards",
            shard_idx,
            self.shards.len()
        );
    }
}

impl<V: Clone> CacheMetrics for ConcurrentCooperativeCache<V> {
    /// Routing counters plus per-shard counters prefixed with `shard<i>.`.
    fn metrics(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.metrics.snapshot().to_btreemap();
        for (idx, shard) in self.shards.iter().enumerate() {
            let shard_metrics = shard.read().cache().core_metrics().to_btreemap();
            for (name, value) in shard_metrics {
                metrics.insert(alloc::format!("shard{}.{}", idx, name), value);
            }
        }
        metrics
    }

    fn algorithm_name(&self) -> &'static str {
        match self.summary {
            SharedSummary::Coloring(_) => "ConcurrentCooperative-CC",
            SharedSummary::CountingBloom(_) => "ConcurrentCooperative-CBF",
        }
    }
}

impl<V> core::fmt::Debug for ConcurrentCooperativeCache<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConcurrentCooperativeCache")
            .field("class_num", &self.shards.len())
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}
