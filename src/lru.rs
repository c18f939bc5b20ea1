//! Size-Bounded Least Recently Used (LRU) Shard Cache
//!
//! This module provides the cache that backs a single shard: 64-bit keys,
//! opaque payloads, and a byte budget that every resident entry's declared
//! size is charged against.
//!
//! # Algorithm
//!
//! Entries are kept in recency order, most recently used at the head. When an
//! insertion would push the occupied bytes over the budget, entries are
//! evicted from the tail until the new entry fits. Every call that can evict
//! returns the evicted keys in eviction order (tail first), which is what the
//! delta tracking layer above records.
//!
//! An entry larger than the whole budget empties the shard and is then
//! admitted anyway; occupancy exceeds the budget until the next insertion
//! evicts it. This is accepted rather than treated as an error.
//!
//! # Performance Characteristics
//!
//! - Get / Peek: O(1) average
//! - Set: O(1) average plus O(e) for `e` evictions
//! - Remove: O(1) average
//!
//! # Thread Safety
//!
//! Not thread-safe. [`ConcurrentCooperativeCache`](crate::ConcurrentCooperativeCache)
//! wraps each shard in a `parking_lot::RwLock`; [`SizeBoundedLru::peek`] is the
//! read-lock path used by peer shards.

extern crate alloc;

use crate::config::SizeBoundedLruConfig;
use crate::entry::CacheEntry;
use crate::list::{List, NodeId};
use crate::metrics::{CacheMetrics, CoreCacheMetrics};
use crate::HashMap;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// A byte-budgeted LRU cache keyed by `u64`.
///
/// # Examples
///
/// ```
/// use coop_cache::SizeBoundedLru;
///
/// let mut cache = SizeBoundedLru::new(3);
/// cache.set(1, "a", 1);
/// cache.set(2, "b", 1);
/// cache.set(3, "c", 1);
///
/// // Touching 1 makes 2 the least recently used entry
/// assert!(cache.get(1).is_some());
/// assert_eq!(cache.set(4, "d", 1), vec![2]);
/// ```
pub struct SizeBoundedLru<V> {
    capacity: u64,
    occupied: u64,
    list: List<CacheEntry<V>>,
    map: HashMap<u64, NodeId>,
    metrics: CoreCacheMetrics,
}

impl<V> SizeBoundedLru<V> {
    /// Creates an empty shard with a budget of `capacity` bytes.
    pub fn new(capacity: u64) -> Self {
        SizeBoundedLru::init(SizeBoundedLruConfig { capacity })
    }

    /// Creates an empty shard from `config`.
    pub fn init(config: SizeBoundedLruConfig) -> Self {
        let capacity = config.capacity;
        SizeBoundedLru {
            capacity,
            occupied: 0,
            list: List::new(),
            map: HashMap::new(),
            metrics: CoreCacheMetrics::new(capacity),
        }
    }

    /// The byte budget.
    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Bytes currently charged against the budget.
    #[inline]
    pub fn occupied(&self) -> u64 {
        self.occupied
    }

    /// Number of resident entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if no entry is resident.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns true if `key` is resident. Does not touch recency.
    #[inline]
    pub fn contains(&self, key: u64) -> bool {
        self.map.contains_key(&key)
    }

    /// Per-shard counters.
    #[inline]
    pub fn core_metrics(&self) -> &CoreCacheMetrics {
        &self.metrics
    }

    /// Looks up `key`, promoting it to the head on a hit.
    ///
    /// Returns the payload and its declared size.
    pub fn get(&mut self, key: u64) -> Option<(&V, u64)> {
        match self.map.get(&key).copied() {
            Some(node) => {
                self.list.move_to_front(node);
                let entry = self.list.get(node)?;
                self.metrics.record_hit(entry.size);
                Some((&entry.value, entry.size))
            }
            None => {
                self.metrics.record_miss();
                None
            }
        }
    }

    /// Looks up `key` without changing recency or metrics.
    pub fn peek(&self, key: u64) -> Option<(&V, u64)> {
        let node = self.map.get(&key)?;
        self.list
            .get(*node)
            .map(|entry| (&entry.value, entry.size))
    }

    /// Inserts or replaces `key` and returns the keys evicted to make room,
    /// tail first.
    ///
    /// Replacing a resident key promotes it and recomputes occupancy with the
    /// new size; if that no longer fits, other entries are evicted from the
    /// tail. The key being set is never evicted by its own call.
    pub fn set(&mut self, key: u64, value: V, size: u64) -> Vec<u64> {
        let mut evicted = Vec::new();

        if let Some(node) = self.map.get(&key).copied() {
            self.list.move_to_front(node);
            if let Some(entry) = self.list.get_mut(node) {
                let old_size = entry.replace(value, size);
                self.occupied = self.occupied - old_size + size;
                self.metrics.record_size_change(old_size, size);
            }
            while self.occupied > self.capacity && self.list.len() > 1 {
                self.evict_tail(&mut evicted);
            }
            return evicted;
        }

        while self.occupied + size > self.capacity && !self.map.is_empty() {
            self.evict_tail(&mut evicted);
        }

        let node = self.list.push_front(CacheEntry::new(key, value, size));
        self.map.insert(key, node);
        self.occupied += size;
        self.metrics.record_insertion(size);

        evicted
    }

    /// Removes `key`, returning its entry if it was resident.
    pub fn remove(&mut self, key: u64) -> Option<CacheEntry<V>> {
        let node = self.map.remove(&key)?;
        let entry = self.list.remove(node)?;
        self.occupied -= entry.size;
        self.metrics.record_removal(entry.size);
        Some(entry)
    }

    /// Changes the byte budget. Shrinking evicts from the tail until the
    /// resident entries fit again and returns the evicted keys.
    pub fn set_capacity(&mut self, capacity: u64) -> Vec<u64> {
        self.capacity = capacity;
        self.metrics.max_cache_size_bytes = capacity;
        let mut evicted = Vec::new();
        while self.occupied > self.capacity && !self.map.is_empty() {
            self.evict_tail(&mut evicted);
        }
        evicted
    }

    /// Resident keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.list.iter().map(|entry| entry.key)
    }

    /// Drops every entry. Dropped entries are not reported as evictions.
    pub fn clear(&mut self) {
        self.map.clear();
        self.list.clear();
        self.occupied = 0;
        self.metrics.cache_size_bytes = 0;
    }

    fn evict_tail(&mut self, evicted: &mut Vec<u64>) {
        if let Some(entry) = self.list.pop_back() {
            self.map.remove(&entry.key);
            self.occupied -= entry.size;
            self.metrics.record_eviction(entry.size);
            tracing::trace!(key = entry.key, size = entry.size, "evicted");
            evicted.push(entry.key);
        }
    }
}

impl<V> CacheMetrics for SizeBoundedLru<V> {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.metrics.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "LRU"
    }
}

impl<V> fmt::Debug for SizeBoundedLru<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SizeBoundedLru")
            .field("capacity", &self.capacity)
            .field("occupied", &self.occupied)
            .field("len", &self.map.len())
            .finish()
    }
}
