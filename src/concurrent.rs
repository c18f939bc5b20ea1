//! Concurrent Cooperative Cache
//!
//! A thread-safe version of [`CooperativeCache`](crate::CooperativeCache) for
//! deployments with one worker thread per shard (or any other mix of threads
//! calling into arbitrary shards).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                  ConcurrentCooperativeCache<V>                   │
//! │                                                                  │
//! │  shards:   RwLock<shard 0>  RwLock<shard 1>  ...  RwLock<shard n>│
//! │                                                                  │
//! │  summary (coloring):  RwLock<ShiftingColoringClassifier>         │
//! │  summary (bloom):     RwLock<filter 0>  ...  RwLock<filter n>    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unlike the segment locks of a plain concurrent LRU, the shard locks are
//! `RwLock`s: a shard's own lookups promote entries and take the write lock,
//! but probes from peers use `peek` under a read lock and can proceed
//! alongside each other.
//!
//! # Lock discipline
//!
//! - At most one shard lock is held at a time.
//! - A summary lock may be taken while holding a shard lock; a shard lock is
//!   never taken while holding a summary lock.
//! - Synchronizing shard `i` holds shard `i`'s write lock throughout, so flips
//!   from one shard reach every replica in order.
//! - Each replica update happens under that replica's own lock, so readers
//!   see a flip either fully applied or not at all.
//!
//! # Example
//!
//! ```rust
//! use coop_cache::concurrent::ConcurrentCooperativeCache;
//! use coop_cache::config::{CooperativeCacheConfig, CountingBloomConfig, SummaryConfig};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let summary = SummaryConfig::CountingBloom(CountingBloomConfig {
//!     num_bits: 8192,
//!     hash_count: 4,
//!     count_bits: 4,
//! });
//! let config = CooperativeCacheConfig::new(1 << 20, 4, summary);
//! let cache = Arc::new(ConcurrentCooperativeCache::init(config).unwrap());
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|shard| {
//!         let cache = Arc::clone(&cache);
//!         thread::spawn(move || {
//!             for i in 0..100u64 {
//!                 let key = shard as u64 * 1000 + i;
//!                 if cache.get(shard, key).is_none() {
//!                     cache.put(shard, key, key * 2, 64);
//!                 }
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! cache.synchronize_all();
//! assert_eq!(cache.get(1, 2005), Some(4010));
//! ```

pub mod coordinator;

pub use self::coordinator::ConcurrentCooperativeCache;
