//! Counting Bloom filter group with per-shard replicas.
//!
//! Every class (shard) owns one counting Bloom filter describing the keys it
//! holds. To answer "which shards might hold this key?" without a network
//! round trip, every shard also keeps a replica of every peer's filter. The
//! authoritative filter changes immediately on insert/remove; the changes
//! are buffered in a [`Flip`] and pushed into the peers' replicas when the
//! owning shard synchronizes.
//!
//! ```text
//!                 shard 0 view               shard 1 view
//!              ┌──────────────────┐       ┌──────────────────┐
//!   class 0    │ authoritative    │──flip─▶ replica          │
//!   class 1    │ replica          ◀─flip──│ authoritative    │
//!              └──────────────────┘       └──────────────────┘
//! ```
//!
//! # Counters
//!
//! Each bit position has a `count_bits`-wide counter; the bit is set exactly
//! while its counter is non-zero. Counters stop at `2^count_bits - 1` and,
//! once there, are never decremented again: a saturated position stays set,
//! trading extra false positives for never producing a false negative.
//!
//! Removing a key is only applied when all of its probed counters are
//! non-zero. A key that was never inserted (and is not a false positive) is
//! therefore a true no-op and is not recorded in the flip.

extern crate alloc;

use crate::config::CountingBloomConfig;
use crate::error::ConfigError;
use crate::hash::bloom_position;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

/// Buffered membership changes of one filter since its last broadcast.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Flip {
    /// Keys inserted, oldest first.
    pub inserted: Vec<u64>,
    /// Keys removed, oldest first.
    pub removed: Vec<u64>,
}

impl Flip {
    /// Returns true if there is nothing to broadcast.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.removed.is_empty()
    }

    /// Total number of buffered changes.
    #[inline]
    pub fn len(&self) -> usize {
        self.inserted.len() + self.removed.len()
    }
}

/// Bit array plus saturating counters for one class.
#[derive(Clone, PartialEq, Eq)]
pub struct CountingBits {
    counters: Vec<u8>,
    bits: Vec<u64>,
    max_count: u8,
}

impl CountingBits {
    /// Creates an empty filter of `num_bits` positions with counters that
    /// saturate at `max_count`.
    pub fn new(num_bits: usize, max_count: u8) -> Self {
        CountingBits {
            counters: vec![0; num_bits],
            bits: vec![0; num_bits.div_ceil(64)],
            max_count,
        }
    }

    /// Number of bit positions.
    #[inline]
    pub fn num_bits(&self) -> usize {
        self.counters.len()
    }

    /// Counter at `pos`.
    #[inline]
    pub fn count(&self, pos: usize) -> u8 {
        self.counters[pos]
    }

    /// Bit at `pos`.
    #[inline]
    pub fn is_set(&self, pos: usize) -> bool {
        self.bits[pos / 64] & (1 << (pos % 64)) != 0
    }

    /// Fraction of positions currently set.
    pub fn fill_ratio(&self) -> f64 {
        let set: u32 = self.bits.iter().map(|word| word.count_ones()).sum();
        set as f64 / self.num_bits() as f64
    }

    fn increment(&mut self, pos: usize) {
        let counter = &mut self.counters[pos];
        if *counter < self.max_count {
            *counter += 1;
        }
        self.bits[pos / 64] |= 1 << (pos % 64);
    }

    fn decrement(&mut self, pos: usize) {
        let counter = &mut self.counters[pos];
        if *counter == 0 || *counter == self.max_count {
            return;
        }
        *counter -= 1;
        if *counter == 0 {
            self.bits[pos / 64] &= !(1 << (pos % 64));
        }
    }

    pub(crate) fn insert_key(&mut self, key: u64, hash_count: u32) {
        let num_bits = self.num_bits();
        for i in 0..hash_count {
            self.increment(bloom_position(key, i, num_bits));
        }
    }

    pub(crate) fn remove_key(&mut self, key: u64, hash_count: u32) -> bool {
        if !self.contains_key(key, hash_count) {
            return false;
        }
        let num_bits = self.num_bits();
        for i in 0..hash_count {
            self.decrement(bloom_position(key, i, num_bits));
        }
        true
    }

    pub(crate) fn contains_key(&self, key: u64, hash_count: u32) -> bool {
        let num_bits = self.num_bits();
        (0..hash_count).all(|i| self.is_set(bloom_position(key, i, num_bits)))
    }
}

impl fmt::Debug for CountingBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountingBits")
            .field("num_bits", &self.num_bits())
            .field("max_count", &self.max_count)
            .finish()
    }
}

/// One shard's filter state: its own authoritative filter, a replica of every
/// peer's filter, and the flip not yet broadcast.
///
/// # Examples
///
/// ```
/// use coop_cache::CountingBloomFilter;
/// use coop_cache::config::CountingBloomConfig;
///
/// let config = CountingBloomConfig { num_bits: 1024, hash_count: 4, count_bits: 4 };
/// let mut shard0 = CountingBloomFilter::init(0, 2, config).unwrap();
/// let mut shard1 = CountingBloomFilter::init(1, 2, config).unwrap();
///
/// shard0.insert(42);
/// assert!(shard0.query_bf(42, 0));
/// assert!(!shard1.query_multiway(42).contains(&0));
///
/// let flip = shard0.take_flip();
/// shard1.update(0, &flip);
/// assert!(shard1.query_multiway(42).contains(&0));
/// ```
pub struct CountingBloomFilter {
    class_idx: usize,
    hash_count: u32,
    filters: Vec<CountingBits>,
    flip: Flip,
}

impl CountingBloomFilter {
    /// Creates the filter state of shard `class_idx` in a group of
    /// `class_num` shards.
    pub fn init(
        class_idx: usize,
        class_num: usize,
        config: CountingBloomConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if class_idx >= class_num {
            return Err(ConfigError::ClassIndexOutOfRange {
                class_idx,
                class_num,
            });
        }
        Ok(CountingBloomFilter::new(class_idx, class_num, config))
    }

    /// Unchecked constructor for callers that already validated `config`.
    pub(crate) fn new(class_idx: usize, class_num: usize, config: CountingBloomConfig) -> Self {
        debug_assert!(config.validate().is_ok());
        debug_assert!(class_idx < class_num);
        let filter = CountingBits::new(config.num_bits, config.max_count());
        CountingBloomFilter {
            class_idx,
            hash_count: config.hash_count,
            filters: vec![filter; class_num],
            flip: Flip::default(),
        }
    }

    /// The class this state is authoritative for.
    #[inline]
    pub fn class_idx(&self) -> usize {
        self.class_idx
    }

    /// Number of classes in the group.
    #[inline]
    pub fn class_num(&self) -> usize {
        self.filters.len()
    }

    /// Adds `key` to the authoritative filter and buffers it for broadcast.
    pub fn insert(&mut self, key: u64) {
        self.filters[self.class_idx].insert_key(key, self.hash_count);
        self.flip.inserted.push(key);
    }

    /// Removes `key` from the authoritative filter and buffers it for
    /// broadcast. Returns false (and buffers nothing) if the filter did not
    /// report `key` as present.
    pub fn remove(&mut self, key: u64) -> bool {
        if !self.filters[self.class_idx].remove_key(key, self.hash_count) {
            return false;
        }
        self.flip.removed.push(key);
        true
    }

    /// Returns true if this shard's copy of `class_idx`'s filter reports
    /// `key` present.
    pub fn query_bf(&self, key: u64, class_idx: usize) -> bool {
        self.filters[class_idx].contains_key(key, self.hash_count)
    }

    /// Every class whose filter, as known locally, reports `key` present.
    pub fn query_multiway(&self, key: u64) -> Vec<usize> {
        (0..self.filters.len())
            .filter(|&class| self.query_bf(key, class))
            .collect()
    }

    /// Applies `target_idx`'s broadcast flip to the local replica of its
    /// filter: insertions first, then removals.
    ///
    /// A flip addressed to this shard's own class is ignored; the
    /// authoritative filter is never written through a replica update.
    pub fn update(&mut self, target_idx: usize, flip: &Flip) {
        if target_idx == self.class_idx {
            return;
        }
        let replica = &mut self.filters[target_idx];
        for &key in &flip.inserted {
            replica.insert_key(key, self.hash_count);
        }
        for &key in &flip.removed {
            replica.remove_key(key, self.hash_count);
        }
        tracing::debug!(
            shard = self.class_idx,
            source = target_idx,
            inserted = flip.inserted.len(),
            removed = flip.removed.len(),
            "applied flip to replica"
        );
    }

    /// Changes buffered since the last broadcast.
    #[inline]
    pub fn pending_flip(&self) -> &Flip {
        &self.flip
    }

    /// Takes the buffered changes for broadcast, leaving an empty flip.
    pub fn take_flip(&mut self) -> Flip {
        core::mem::take(&mut self.flip)
    }

    /// This shard's copy of `class_idx`'s filter.
    #[inline]
    pub fn filter(&self, class_idx: usize) -> &CountingBits {
        &self.filters[class_idx]
    }

    /// Fill ratio of this shard's copy of `class_idx`'s filter.
    pub fn fill_ratio(&self, class_idx: usize) -> f64 {
        self.filters[class_idx].fill_ratio()
    }
}

impl fmt::Debug for CountingBloomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountingBloomFilter")
            .field("class_idx", &self.class_idx)
            .field("class_num", &self.filters.len())
            .field("hash_count", &self.hash_count)
            .field("pending_flip", &self.flip.len())
            .finish()
    }
}

/// The filter states of every shard in one place.
///
/// Useful on its own for single-process experiments and used by
/// [`CooperativeCache`](crate::CooperativeCache) as its Bloom backend.
///
/// # Examples
///
/// ```
/// use coop_cache::CountingBloomFilterGroup;
/// use coop_cache::config::CountingBloomConfig;
///
/// let config = CountingBloomConfig { num_bits: 4096, hash_count: 4, count_bits: 4 };
/// let mut group = CountingBloomFilterGroup::init(4, config).unwrap();
///
/// group.insert(7, 2);
/// assert!(group.query(7).contains(&2));
///
/// // Peers learn about it only after class 2 synchronizes
/// assert!(!group.query_from(0, 7).contains(&2));
/// group.synchronize(2);
/// assert!(group.query_from(0, 7).contains(&2));
/// ```
#[derive(Debug)]
pub struct CountingBloomFilterGroup {
    filters: Vec<CountingBloomFilter>,
}

impl CountingBloomFilterGroup {
    /// Creates `class_num` empty filter states.
    pub fn init(class_num: usize, config: CountingBloomConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        if class_num == 0 {
            return Err(ConfigError::NoShards);
        }
        Ok(CountingBloomFilterGroup::new(class_num, config))
    }

    /// Unchecked constructor for callers that already validated `config`.
    pub(crate) fn new(class_num: usize, config: CountingBloomConfig) -> Self {
        CountingBloomFilterGroup {
            filters: (0..class_num)
                .map(|idx| CountingBloomFilter::new(idx, class_num, config))
                .collect(),
        }
    }

    /// Number of classes.
    #[inline]
    pub fn class_num(&self) -> usize {
        self.filters.len()
    }

    /// Adds `key` to `class`'s authoritative filter.
    pub fn insert(&mut self, key: u64, class: usize) {
        self.filters[class].insert(key);
    }

    /// Removes `key` from `class`'s authoritative filter.
    pub fn remove(&mut self, key: u64, class: usize) -> bool {
        self.filters[class].remove(key)
    }

    /// Classes whose authoritative filter reports `key` present.
    pub fn query(&self, key: u64) -> Vec<usize> {
        self.filters
            .iter()
            .filter(|filter| filter.query_bf(key, filter.class_idx()))
            .map(CountingBloomFilter::class_idx)
            .collect()
    }

    /// Classes that `viewer` believes may hold `key`, answered from its
    /// local replicas (and its own authoritative filter).
    pub fn query_from(&self, viewer: usize, key: u64) -> Vec<usize> {
        self.filters[viewer].query_multiway(key)
    }

    /// Broadcasts `class`'s buffered flip into every peer's replica and
    /// clears it. Returns the number of changes broadcast.
    pub fn synchronize(&mut self, class: usize) -> usize {
        let flip = self.filters[class].take_flip();
        for peer in self.filters.iter_mut() {
            peer.update(class, &flip);
        }
        flip.len()
    }

    /// The filter state of shard `class`.
    #[inline]
    pub fn filter(&self, class: usize) -> &CountingBloomFilter {
        &self.filters[class]
    }
}
