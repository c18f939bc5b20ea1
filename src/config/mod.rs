//! Cache Configuration Module
//!
//! Configuration structs have public fields for simple instantiation and a
//! `validate()` method; constructors (`init`) call `validate()` and return the
//! [`ConfigError`] instead of building a cache with unusable parameters.
//!
//! | Config | Used by | Description |
//! |--------|---------|-------------|
//! | [`CooperativeCacheConfig`] | [`CooperativeCache`](crate::CooperativeCache) | Shard count, per-shard budget, sync threshold, summary |
//! | [`SummaryConfig`] | both coordinators | Which summary backend and its parameters |
//! | [`ColoringConfig`] | [`ShiftingColoringClassifier`](crate::ShiftingColoringClassifier) | Bucket count and palette |
//! | [`CountingBloomConfig`] | [`CountingBloomFilterGroup`](crate::CountingBloomFilterGroup) | Bits, probes, counter width |
//! | [`SizeBoundedLruConfig`] | [`SizeBoundedLru`](crate::SizeBoundedLru) | Byte budget of one shard |
//!
//! The concurrent coordinator takes the same [`CooperativeCacheConfig`].
//!
//! # Examples
//!
//! ```
//! use coop_cache::config::{ColoringConfig, CooperativeCacheConfig, SummaryConfig};
//! use coop_cache::CooperativeCache;
//!
//! let config = CooperativeCacheConfig::new(
//!     64 * 1024,
//!     4,
//!     SummaryConfig::Coloring(ColoringConfig { bucket_num: 4096, color_num: 2 }),
//! )
//! .with_threshold(0.05);
//!
//! let cache: CooperativeCache<Vec<u8>> = CooperativeCache::init(config).unwrap();
//! assert_eq!(cache.class_num(), 4);
//! ```

pub mod lru;
pub mod summary;

pub use lru::SizeBoundedLruConfig;
pub use summary::{ColoringConfig, CountingBloomConfig, SummaryConfig};

use crate::error::ConfigError;
use core::fmt;

/// Default fraction of a shard's resident entries that may churn before the
/// shard synchronizes its summary.
pub const DEFAULT_SYNC_THRESHOLD: f64 = 0.01;

/// Configuration for a cooperative cache.
///
/// # Fields
///
/// - `capacity_per_shard`: byte budget of every shard.
/// - `class_num`: number of shards (classes).
/// - `threshold`: a shard synchronizes once
///   `pending_inserted + pending_removed >= threshold * resident_count`.
///   Must lie in `(0, 1]`. It bounds how many unsynchronized mutations a
///   summary can lag behind by, not how long.
/// - `summary`: the membership summary backend.
#[derive(Clone, Copy, PartialEq)]
pub struct CooperativeCacheConfig {
    /// Byte budget of each shard.
    pub capacity_per_shard: u64,
    /// Number of shards.
    pub class_num: usize,
    /// Churn fraction that triggers synchronization.
    pub threshold: f64,
    /// Summary backend and its parameters.
    pub summary: SummaryConfig,
}

impl CooperativeCacheConfig {
    /// Configuration of each shard's cache.
    #[inline]
    pub fn shard_config(&self) -> SizeBoundedLruConfig {
        SizeBoundedLruConfig {
            capacity: self.capacity_per_shard,
        }
    }

    /// Creates a configuration with the default threshold.
    pub fn new(capacity_per_shard: u64, class_num: usize, summary: SummaryConfig) -> Self {
        Self {
            capacity_per_shard,
            class_num,
            threshold: DEFAULT_SYNC_THRESHOLD,
            summary,
        }
    }

    /// Overrides the synchronization threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Checks every parameter, including the summary's.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.class_num == 0 {
            return Err(ConfigError::NoShards);
        }
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        self.summary.validate(self.class_num)
    }
}

impl fmt::Debug for CooperativeCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CooperativeCacheConfig")
            .field("capacity_per_shard", &self.capacity_per_shard)
            .field("class_num", &self.class_num)
            .field("threshold", &self.threshold)
            .field("summary", &self.summary)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bloom() -> SummaryConfig {
        SummaryConfig::CountingBloom(CountingBloomConfig {
            num_bits: 1024,
            hash_count: 4,
            count_bits: 4,
        })
    }

    #[test]
    fn test_default_threshold() {
        let config = CooperativeCacheConfig::new(100, 2, bloom());
        assert_eq!(config.threshold, DEFAULT_SYNC_THRESHOLD);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_bounds() {
        let base = CooperativeCacheConfig::new(100, 2, bloom());
        assert!(base.with_threshold(1.0).validate().is_ok());
        assert_eq!(
            base.with_threshold(0.0).validate(),
            Err(ConfigError::InvalidThreshold(0.0))
        );
        assert!(base.with_threshold(1.5).validate().is_err());
        assert!(base.with_threshold(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_zero_shards_rejected() {
        let config = CooperativeCacheConfig::new(100, 0, bloom());
        assert_eq!(config.validate(), Err(ConfigError::NoShards));
    }

    #[test]
    fn test_summary_errors_propagate() {
        let config = CooperativeCacheConfig::new(
            100,
            3,
            SummaryConfig::Coloring(ColoringConfig {
                bucket_num: 64,
                color_num: 2,
            }),
        );
        assert_eq!(
            config.validate(),
            Err(ConfigError::ClassNumNotPowerOfTwo(3))
        );
    }
}
