#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ## Components
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        CooperativeCache<V>                           │
//! │                                                                      │
//! │  ┌────────────────────┐ ┌────────────────────┐   ┌────────────────┐  │
//! │  │ DeltaTrackingCache │ │ DeltaTrackingCache │...│      ...       │  │
//! │  │  SizeBoundedLru    │ │  SizeBoundedLru    │   │                │  │
//! │  │  DeltaLog          │ │  DeltaLog          │   │                │  │
//! │  └─────────┬──────────┘ └─────────┬──────────┘   └───────┬────────┘  │
//! │            │ synchronize          │                      │           │
//! │            ▼                      ▼                      ▼           │
//! │  ┌────────────────────────────────────────────────────────────────┐  │
//! │  │ Summary: ShiftingColoringClassifier | CountingBloomFilterGroup │  │
//! │  └────────────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Reference
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SizeBoundedLru`] | Byte-budgeted LRU shard |
//! | [`DeltaTrackingCache`] | Shard that logs inserts and removals since the last sync |
//! | [`ShiftingColoringClassifier`] | Bucket coloring summary, one predicted shard per key |
//! | [`CountingBloomFilterGroup`] | Counting Bloom filters with per-shard replicas |
//! | [`CooperativeCache`] | Single-threaded coordinator |
//! | `ConcurrentCooperativeCache` | Thread-safe coordinator (`concurrent` feature) |
//!
//! ## Choosing a Summary
//!
//! | | Coloring | Counting Bloom |
//! |---|---|---|
//! | Memory | one bucket per ~4 key-planes, shared | `class_num²` counter arrays across all shards |
//! | Answer | exactly one shard | every possibly-matching shard |
//! | Never-inserted keys | always name some shard | usually name none |
//! | Degrades with churn | yes, until [`rebuild_summary`](CooperativeCache::rebuild_summary) | no |
//!
//! ## Modules
//!
//! - [`lru`]: size-bounded LRU shard cache
//! - [`delta`]: delta-tracking wrapper
//! - [`hash`]: deterministic hash family
//! - [`coloring`]: union-find bucket coloring engine
//! - [`shift_coloring`]: shifting multi-plane coloring classifier
//! - [`counting_bloom`]: counting Bloom filters, flips and replicas
//! - [`summary`]: the summary trait and backend selection
//! - [`coordinator`]: the cooperative cache
//! - [`config`]: configuration structures
//! - [`error`]: configuration errors
//! - [`metrics`]: metrics collection
//! - `concurrent`: thread-safe coordinator (requires `concurrent` feature)

#![no_std]

#[cfg(any(feature = "std", not(feature = "hashbrown")))]
extern crate std;

#[cfg(test)]
extern crate scoped_threadpool;

#[cfg(feature = "hashbrown")]
pub(crate) use hashbrown::HashMap;
#[cfg(not(feature = "hashbrown"))]
pub(crate) use std::collections::HashMap;

/// Cache entry type holding a key, its payload and its declared size.
pub mod entry;

/// Index-linked doubly linked list backing the LRU order.
///
/// Internal infrastructure: nodes live in a slot arena and are addressed by
/// stable indices, so no raw pointers are involved.
pub(crate) mod list;

/// Size-bounded LRU cache.
///
/// One shard of a cooperative cache: a byte budget, recency order, and the
/// list of keys each insertion evicted.
pub mod lru;

/// Delta-tracking shard cache.
pub mod delta;

/// Deterministic hash family shared by every summary replica.
pub mod hash;

/// Union-find bucket coloring engine.
pub mod coloring;

/// Shifting bucket coloring classifier.
pub mod shift_coloring;

/// Counting Bloom filter group.
pub mod counting_bloom;

/// Membership summary trait and backend selection.
pub mod summary;

/// Cooperative cache coordinator.
pub mod coordinator;

/// Cache configuration structures.
pub mod config;

/// Configuration errors.
pub mod error;

/// Cache metrics system.
///
/// Per-shard counters plus coordinator-level routing counters, all reported
/// through the [`CacheMetrics`](metrics::CacheMetrics) trait.
pub mod metrics;

/// Concurrent cooperative cache.
///
/// Available when the `concurrent` feature is enabled.
#[cfg(feature = "concurrent")]
pub mod concurrent;

pub use coloring::{ColorEdge, ColoringEngine, Polarity};
pub use coordinator::{CooperativeCache, Lookup, ShardStats};
pub use counting_bloom::{CountingBits, CountingBloomFilter, CountingBloomFilterGroup, Flip};
pub use delta::{DeltaLog, DeltaTrackingCache};
pub use entry::CacheEntry;
pub use error::ConfigError;
pub use lru::SizeBoundedLru;
pub use shift_coloring::ShiftingColoringClassifier;
pub use summary::{MembershipSummary, Summary};

#[cfg(feature = "concurrent")]
pub use concurrent::ConcurrentCooperativeCache;
