//! Cooperative cache coordinator.
//!
//! Owns `class_num` [`DeltaTrackingCache`] shards and one [`Summary`]. A
//! lookup on shard `i` first checks shard `i`; on a miss it asks the summary
//! which peers may hold the key, probes them in the order returned and, on the
//! first peer hit, copies the entry into shard `i`.
//!
//! ```text
//!   lookup(i, key)
//!        │
//!        ▼
//!   shard i ──hit──▶ LocalHit
//!        │ miss
//!        ▼
//!   summary.candidates(i, key) ──▶ [j, k, ..]
//!        │
//!        ▼
//!   probe shard j ──hit──▶ copy into shard i ──▶ PeerHit { from: j }
//!        │ miss (false positive)
//!        ▼
//!   probe shard k ...                          ──▶ Miss
//! ```
//!
//! # Synchronization
//!
//! Every mutation of a shard is followed by a threshold check: once
//! `pending_inserted + pending_removed >= threshold * resident_count` the
//! shard's delta is pushed into the summary. The threshold bounds how many
//! unsynchronized mutations a shard's summary entry can lag behind by; it is
//! not a time bound, and an idle shard can stay stale indefinitely.
//! [`synchronize_all`](CooperativeCache::synchronize_all) flushes every shard.
//!
//! Summary errors never affect cached data: a wrong prediction costs a wasted
//! probe or an unnecessary origin fetch.

extern crate alloc;

use crate::config::CooperativeCacheConfig;
use crate::delta::DeltaTrackingCache;
use crate::error::ConfigError;
use crate::metrics::{CacheMetrics, CooperativeCacheMetrics, CoreCacheMetrics};
use crate::summary::{MembershipSummary, Summary};
use crate::HashMap;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Outcome of a cooperative lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    /// The calling shard held the key.
    LocalHit(V),
    /// A peer held the key; it has been copied into the calling shard.
    PeerHit {
        /// Shard that answered.
        from: usize,
        /// The payload.
        value: V,
    },
    /// No shard the summary pointed to held the key.
    Miss,
}

impl<V> Lookup<V> {
    /// Returns true for local and peer hits.
    pub fn is_hit(&self) -> bool {
        !matches!(self, Lookup::Miss)
    }

    /// The payload, if any.
    pub fn into_value(self) -> Option<V> {
        match self {
            Lookup::LocalHit(value) | Lookup::PeerHit { value, .. } => Some(value),
            Lookup::Miss => None,
        }
    }
}

/// Residency and pending churn of one shard.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShardStats {
    /// Entries currently resident.
    pub resident_count: usize,
    /// Keys written since the last synchronization.
    pub pending_inserted: usize,
    /// Keys evicted or invalidated since the last synchronization.
    pub pending_removed: usize,
}

impl ShardStats {
    /// Total unsynchronized changes.
    #[inline]
    pub fn pending(&self) -> usize {
        self.pending_inserted + self.pending_removed
    }
}

/// Single-threaded cooperative cache.
///
/// Payloads are cloned out of the shards, so `V` is typically cheap to clone
/// (`Arc<[u8]>`, `Bytes`, small structs).
///
/// # Panics
///
/// Every method taking a `shard_idx` panics if it is not below
/// [`class_num`](Self::class_num).
///
/// # Examples
///
/// ```
/// use coop_cache::{CooperativeCache, Lookup};
/// use coop_cache::config::{CooperativeCacheConfig, CountingBloomConfig, SummaryConfig};
///
/// let summary = SummaryConfig::CountingBloom(CountingBloomConfig {
///     num_bits: 8192,
///     hash_count: 4,
///     count_bits: 4,
/// });
/// let config = CooperativeCacheConfig::new(1024, 4, summary).with_threshold(0.5);
/// let mut cache = CooperativeCache::init(config).unwrap();
///
/// cache.put(0, 7, "seven", 10);
/// cache.synchronize(0);
///
/// // Shard 2 misses locally but finds the key on shard 0
/// assert_eq!(cache.lookup(2, 7), Lookup::PeerHit { from: 0, value: "seven" });
/// assert_eq!(cache.lookup(2, 7), Lookup::LocalHit("seven"));
/// ```
pub struct CooperativeCache<V> {
    shards: Vec<DeltaTrackingCache<V>>,
    summary: Summary,
    threshold: f64,
    metrics: CooperativeCacheMetrics,
}

impl<V: Clone> CooperativeCache<V> {
    /// Creates a cooperative cache from a validated configuration.
    pub fn init(config: CooperativeCacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(CooperativeCache {
            shards: (0..config.class_num)
                .map(|_| DeltaTrackingCache::init(config.shard_config()))
                .collect(),
            summary: Summary::new(config.summary, config.class_num),
            threshold: config.threshold,
            metrics: CooperativeCacheMetrics::default(),
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
    pub fn lookup(&mut self, shard_idx: usize, key: u64) -> Lookup<V> {
        self.check_shard(shard_idx);

        if let Some(value) = self.shards[shard_idx].get(key).map(|(v, _)| v.clone()) {
            self.metrics.local_hits += 1;
            return Lookup::LocalHit(value);
        }

        for peer in self.summary.candidates(shard_idx, key) {
            let found = self.shards[peer]
                .get(key)
                .map(|(value, size)| (value.clone(), size));
            match found {
                Some((value, size)) => {
                    self.metrics.peer_hits += 1;
                    tracing::trace!(shard = shard_idx, peer, key, "peer hit");
                    self.insert_local(shard_idx, key, value.clone(), size);
                    return Lookup::PeerHit { from: peer, value };
                }
                None => self.metrics.false_positive_probes += 1,
            }
        }

        self.metrics.summary_misses += 1;
        Lookup::Miss
    }

    /// [`lookup`](Self::lookup) reduced to the payload.
    pub fn get(&mut self, shard_idx: usize, key: u64) -> Option<V> {
        self.lookup(shard_idx, key).into_value()
    }

    /// Stores `key` in `shard_idx`, typically after an origin fetch that
    /// followed a [`Lookup::Miss`].
    pub fn put(&mut self, shard_idx: usize, key: u64, value: V, size: u64) {
        self.check_shard(shard_idx);
        self.insert_local(shard_idx, key, value, size);
    }

    /// Invalidates `key` in `shard_idx`. Returns true if it was resident.
    pub fn remove_hint(&mut self, shard_idx: usize, key: u64) -> bool {
        self.check_shard(shard_idx);
        if self.shards[shard_idx].remove(key).is_none() {
            return false;
        }
        self.summary.on_remove(shard_idx, key);
        self.check_and_sync(shard_idx);
        true
    }

    /// Residency and pending churn of `shard_idx`.
    pub fn stats(&self, shard_idx: usize) -> ShardStats {
        self.check_shard(shard_idx);
        shard_stats(&self.shards[shard_idx])
    }

    /// Synchronizes `shard_idx` if its pending churn has reached the
    /// threshold. Returns true if it synchronized.
    pub fn check_and_sync(&mut self, shard_idx: usize) -> bool {
        let stats = self.stats(shard_idx);
        if !sync_due(&stats, self.threshold) {
            return false;
        }
        self.synchronize(shard_idx);
        true
    }

    /// Pushes `shard_idx`'s pending churn into the summary and clears it.
    ///
    /// Keys written and then evicted or invalidated since the last
    /// synchronization are published as removals only.
    pub fn synchronize(&mut self, shard_idx: usize) {
        self.check_shard(shard_idx);
        let delta = self.shards[shard_idx].take_resident_delta();
        let conflicts = self.summary.synchronize(shard_idx, &delta);
        self.metrics.synchronizations += 1;
        self.metrics.coloring_conflicts += conflicts as u64;
        tracing::debug!(
            shard = shard_idx,
            inserted = delta.inserted.len(),
            removed = delta.removed.len(),
            conflicts,
            "synchronized shard"
        );
    }

    /// Synchronizes every shard, in index order.
    pub fn synchronize_all(&mut self) {
        for shard_idx in 0..self.shards.len() {
            self.synchronize(shard_idx);
        }
    }

    /// Recomputes the summary from what the shards hold right now.
    ///
    /// For the coloring backend this is the only way to undo the drift left
    /// by removals, conflicting inserts and keys whose last advertised holder
    /// dropped them. A key resident in several shards is attributed to the
    /// lowest-indexed one. Returns false if the resulting constraints are
    /// inconsistent.
    pub fn rebuild_summary(&mut self) -> bool {
        let resident: Vec<(u64, usize)> = match self.summary {
            Summary::Coloring(_) => {
                let mut holders = HashMap::new();
                for (idx, shard) in self.shards.iter().enumerate() {
                    collect_holders(&mut holders, idx, shard);
                }
                holders.into_iter().collect()
            }
            Summary::CountingBloom(_) => Vec::new(),
        };
        let consistent = self.summary.rebuild(&resident);
        self.metrics.summary_rebuilds += 1;
        tracing::debug!(
            backend = %self.summary.name(),
            keys = resident.len(),
            consistent,
            "rebuilt summary"
        );
        consistent
    }

    /// Routing counters.
    #[inline]
    pub fn cooperative_metrics(&self) -> &CooperativeCacheMetrics {
        &self.metrics
    }

    /// Per-shard counters of `shard_idx`.
    pub fn shard_metrics(&self, shard_idx: usize) -> &CoreCacheMetrics {
        self.check_shard(shard_idx);
        self.shards[shard_idx].cache().core_metrics()
    }

    /// Read access to one shard.
    pub fn shard(&self, shard_idx: usize) -> &DeltaTrackingCache<V> {
        self.check_shard(shard_idx);
        &self.shards[shard_idx]
    }

    /// Read access to the summary.
    #[inline]
    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    fn insert_local(&mut self, shard_idx: usize, key: u64, value: V, size: u64) {
        let shard = &mut self.shards[shard_idx];
        let is_new = !shard.contains(key);
        for &evicted in shard.set(key, value, size) {
            self.summary.on_remove(shard_idx, evicted);
        }
        if is_new {
            self.summary.on_insert(shard_idx, key);
        }
        self.check_and_sync(shard_idx);
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

pub(crate) fn shard_stats<V>(shard: &DeltaTrackingCache<V>) -> ShardStats {
    ShardStats {
        resident_count: shard.resident_count(),
        pending_inserted: shard.pending_inserted_count(),
        pending_removed: shard.pending_removed_count(),
    }
}

/// Records `shard`'s resident keys in `holders`, keeping earlier holders.
pub(crate) fn collect_holders<V>(
    holders: &mut HashMap<u64, usize>,
    shard_idx: usize,
    shard: &DeltaTrackingCache<V>,
) {
    for key in shard.cache().keys() {
        holders.entry(key).or_insert(shard_idx);
    }
}

/// `pending >= threshold * resident`, ignoring shards with nothing pending.
pub(crate) fn sync_due(stats: &ShardStats, threshold: f64) -> bool {
    let pending = stats.pending();
    pending > 0 && pending as f64 >= threshold * stats.resident_count as f64
}

impl<V: Clone> CacheMetrics for CooperativeCache<V> {
    /// Routing counters plus per-shard counters prefixed with `shard<i>.`.
    fn metrics(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.metrics.to_btreemap();
        for (idx, shard) in self.shards.iter().enumerate() {
            for (name, value) in shard.cache().core_metrics().to_btreemap() {
                metrics.insert(alloc::format!("shard{}.{}", idx, name), value);
            }
        }
        metrics
    }

    fn algorithm_name(&self) -> &'static str {
        match self.summary {
            Summary::Coloring(_) => "Cooperative-CC",
            Summary::CountingBloom(_) => "Cooperative-CBF",
        }
    }
}

impl<V> fmt::Debug for CooperativeCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CooperativeCache")
            .field("class_num", &self.shards.len())
            .field("threshold", &self.threshold)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}
