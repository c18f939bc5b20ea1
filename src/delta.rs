//! Delta-tracking shard cache.
//!
//! Wraps [`SizeBoundedLru`] and records the churn a shard has accumulated
//! since its membership summary was last synchronized: every key written by
//! `set`, and every key that left the shard (evicted or invalidated). Both
//! logs are chronological and may contain duplicates. They are cleared only
//! when the coordinator synchronizes the shard.

extern crate alloc;

use crate::config::SizeBoundedLruConfig;
use crate::entry::CacheEntry;
use crate::lru::SizeBoundedLru;
use alloc::vec::Vec;

/// Keys inserted into and removed from a shard since its last synchronization.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeltaLog {
    /// Keys written, oldest first.
    pub inserted: Vec<u64>,
    /// Keys that left the shard, oldest first.
    pub removed: Vec<u64>,
}

impl DeltaLog {
    /// Total number of pending changes.
    #[inline]
    pub fn len(&self) -> usize {
        self.inserted.len() + self.removed.len()
    }

    /// Returns true if nothing changed since the last flush.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.removed.is_empty()
    }

    /// Empties both logs.
    pub fn clear(&mut self) {
        self.inserted.clear();
        self.removed.clear();
    }
}

/// A shard cache that remembers its churn.
///
/// # Examples
///
/// ```
/// use coop_cache::DeltaTrackingCache;
///
/// let mut shard = DeltaTrackingCache::new(2);
/// shard.set(1, "a", 1);
/// shard.set(2, "b", 1);
/// shard.set(3, "c", 1); // evicts 1
///
/// assert_eq!(shard.pending_inserted_count(), 3);
/// assert_eq!(shard.pending_removed_count(), 1);
/// assert_eq!(shard.last_evicted(), &[1]);
///
/// let delta = shard.take_delta();
/// assert_eq!(delta.inserted, vec![1, 2, 3]);
/// assert_eq!(shard.pending_inserted_count(), 0);
/// ```
#[derive(Debug)]
pub struct DeltaTrackingCache<V> {
    cache: SizeBoundedLru<V>,
    delta: DeltaLog,
    last_evicted: Vec<u64>,
}

impl<V> DeltaTrackingCache<V> {
    /// Creates an empty shard with a budget of `capacity` bytes.
    pub fn new(capacity: u64) -> Self {
        DeltaTrackingCache::init(SizeBoundedLruConfig { capacity })
    }

    /// Creates an empty shard from `config`.
    pub fn init(config: SizeBoundedLruConfig) -> Self {
        DeltaTrackingCache {
            cache: SizeBoundedLru::init(config),
            delta: DeltaLog::default(),
            last_evicted: Vec::new(),
        }
    }

    /// Looks up `key`, promoting it on a hit.
    #[inline]
    pub fn get(&mut self, key: u64) -> Option<(&V, u64)> {
        self.cache.get(key)
    }

    /// Looks up `key` without touching recency.
    #[inline]
    pub fn peek(&self, key: u64) -> Option<(&V, u64)> {
        self.cache.peek(key)
    }

    /// Returns true if `key` is resident.
    #[inline]
    pub fn contains(&self, key: u64) -> bool {
        self.cache.contains(key)
    }

    /// Writes `key`, logging it as inserted and logging whatever it evicted
    /// as removed. Returns the evicted keys.
    pub fn set(&mut self, key: u64, value: V, size: u64) -> &[u64] {
        self.delta.inserted.push(key);
        self.last_evicted = self.cache.set(key, value, size);
        self.delta.removed.extend_from_slice(&self.last_evicted);
        &self.last_evicted
    }

    /// Invalidates `key`. A resident key is logged as removed.
    pub fn remove(&mut self, key: u64) -> Option<CacheEntry<V>> {
        self.last_evicted.clear();
        let entry = self.cache.remove(key)?;
        self.delta.removed.push(key);
        Some(entry)
    }

    /// Keys evicted by the most recent `set` (empty after a `remove`).
    #[inline]
    pub fn last_evicted(&self) -> &[u64] {
        &self.last_evicted
    }

    /// Number of keys written since the last flush.
    #[inline]
    pub fn pending_inserted_count(&self) -> usize {
        self.delta.inserted.len()
    }

    /// Number of keys removed since the last flush.
    #[inline]
    pub fn pending_removed_count(&self) -> usize {
        self.delta.removed.len()
    }

    /// Number of resident entries.
    #[inline]
    pub fn resident_count(&self) -> usize {
        self.cache.len()
    }

    /// The pending churn.
    #[inline]
    pub fn delta(&self) -> &DeltaLog {
        &self.delta
    }

    /// Clears both logs. Callers must have consumed them already.
    pub fn flush(&mut self) {
        self.delta.clear();
    }

    /// Hands the pending churn to the caller and starts a fresh log.
    pub fn take_delta(&mut self) -> DeltaLog {
        core::mem::take(&mut self.delta)
    }

    /// Like [`take_delta`](Self::take_delta), but drops inserted keys that
    /// are no longer resident.
    ///
    /// A key written and then evicted or invalidated within one window shows
    /// up in both logs. Summaries that replay removals before inserts would
    /// otherwise advertise it after it is gone.
    pub fn take_resident_delta(&mut self) -> DeltaLog {
        let mut delta = self.take_delta();
        delta.inserted.retain(|&key| self.cache.contains(key));
        delta
    }

    /// The wrapped shard cache.
    #[inline]
    pub fn cache(&self) -> &SizeBoundedLru<V> {
        &self.cache
    }
}
