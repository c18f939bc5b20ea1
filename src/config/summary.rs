//! Configuration for the membership summary backends.
//!
//! # Sizing Guidelines
//!
//! ## Coloring classifier
//!
//! Every live key contributes `log2(class_num)` edges to a graph over
//! `bucket_num` buckets. A 2-coloring satisfying all edges exists with high
//! probability only while the graph stays mostly acyclic, which needs well
//! under one edge per two buckets:
//!
//! ```text
//! bucket_num ≳ 4 × expected_keys × log2(class_num)
//! ```
//!
//! ## Counting Bloom filters
//!
//! Every shard holds `class_num` filters of `num_bits` one-byte counters (its
//! own plus a replica of each peer), so memory per shard is
//! `class_num × num_bits` bytes. The usual Bloom sizing applies per class:
//! `num_bits ≈ 10 × keys_per_shard` with `hash_count = 4..7` for ~1% false
//! positives. 4-bit counters saturate at 15, which is plenty at that load.

use crate::error::ConfigError;
use core::fmt;

/// Parameters of the bucket coloring classifier.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ColoringConfig {
    /// Number of buckets. Must be in `[2, 2^32)`.
    pub bucket_num: usize,
    /// Colors per bucket. Only 2 is supported.
    pub color_num: u32,
}

impl ColoringConfig {
    /// Checks the parameters for a cache with `class_num` shards.
    pub fn validate(&self, class_num: usize) -> Result<(), ConfigError> {
        if class_num < 2 || !class_num.is_power_of_two() {
            return Err(ConfigError::ClassNumNotPowerOfTwo(class_num));
        }
        if self.bucket_num < 2 || self.bucket_num > u32::MAX as usize {
            return Err(ConfigError::InvalidBucketNum(self.bucket_num));
        }
        if self.color_num != 2 {
            return Err(ConfigError::UnsupportedColorNum(self.color_num));
        }
        Ok(())
    }
}

impl fmt::Debug for ColoringConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColoringConfig")
            .field("bucket_num", &self.bucket_num)
            .field("color_num", &self.color_num)
            .finish()
    }
}

/// Parameters shared by every counting Bloom filter in a group.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CountingBloomConfig {
    /// Number of bit positions (and counters) per filter.
    pub num_bits: usize,
    /// Number of hash probes per key (`k`).
    pub hash_count: u32,
    /// Width of each counter in bits, 1 to 8.
    pub count_bits: u8,
}

impl CountingBloomConfig {
    /// Checks the parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_bits == 0 {
            return Err(ConfigError::EmptyFilter);
        }
        if self.hash_count == 0 {
            return Err(ConfigError::NoHashProbes);
        }
        if !(1..=8).contains(&self.count_bits) {
            return Err(ConfigError::InvalidCounterWidth(self.count_bits));
        }
        Ok(())
    }

    /// Largest value a counter can hold, `2^count_bits - 1`.
    #[inline]
    pub fn max_count(&self) -> u8 {
        ((1u16 << self.count_bits) - 1) as u8
    }
}

impl fmt::Debug for CountingBloomConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountingBloomConfig")
            .field("num_bits", &self.num_bits)
            .field("hash_count", &self.hash_count)
            .field("count_bits", &self.count_bits)
            .finish()
    }
}

/// Selects the membership summary backend.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum SummaryConfig {
    /// Shared bucket coloring classifier (point estimate of the owning shard).
    Coloring(ColoringConfig),
    /// Per-shard counting Bloom filters with peer replicas.
    CountingBloom(CountingBloomConfig),
}

impl SummaryConfig {
    /// Checks the backend parameters for a cache with `class_num` shards.
    pub fn validate(&self, class_num: usize) -> Result<(), ConfigError> {
        match self {
            SummaryConfig::Coloring(config) => config.validate(class_num),
            SummaryConfig::CountingBloom(config) => config.validate(),
        }
    }
}

impl fmt::Debug for SummaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryConfig::Coloring(config) => f.debug_tuple("Coloring").field(config).finish(),
            SummaryConfig::CountingBloom(config) => {
                f.debug_tuple("CountingBloom").field(config).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coloring_config_validation() {
        let ok = ColoringConfig {
            bucket_num: 128,
            color_num: 2,
        };
        assert!(ok.validate(8).is_ok());
        assert_eq!(
            ok.validate(1),
            Err(ConfigError::ClassNumNotPowerOfTwo(1))
        );
        assert_eq!(
            ColoringConfig {
                bucket_num: 1,
                color_num: 2
            }
            .validate(2),
            Err(ConfigError::InvalidBucketNum(1))
        );
        assert_eq!(
            ColoringConfig {
                bucket_num: 128,
                color_num: 4
            }
            .validate(2),
            Err(ConfigError::UnsupportedColorNum(4))
        );
    }

    #[test]
    fn test_bloom_config_validation() {
        let ok = CountingBloomConfig {
            num_bits: 64,
            hash_count: 3,
            count_bits: 4,
        };
        assert!(ok.validate().is_ok());
        assert_eq!(ok.max_count(), 15);
        assert_eq!(
            CountingBloomConfig { num_bits: 0, ..ok }.validate(),
            Err(ConfigError::EmptyFilter)
        );
        assert_eq!(
            CountingBloomConfig { hash_count: 0, ..ok }.validate(),
            Err(ConfigError::NoHashProbes)
        );
        assert_eq!(
            CountingBloomConfig { count_bits: 9, ..ok }.validate(),
            Err(ConfigError::InvalidCounterWidth(9))
        );
        assert_eq!(CountingBloomConfig { count_bits: 8, ..ok }.max_count(), 255);
    }
}
