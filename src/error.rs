//! Construction errors.
//!
//! Only invalid parameters are errors. Everything that can go wrong while the
//! cache is running (coloring conflicts, counter saturation, summary misses)
//! degrades summary accuracy and is reported through return values and
//! metrics instead.

use thiserror::Error;

/// Rejected configuration for a cooperative cache or one of its summaries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// At least one shard is required.
    #[error("class_num must be at least 1")]
    NoShards,

    /// The synchronization threshold must lie in `(0, 1]`.
    #[error("threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f64),

    /// The coloring classifier encodes class ids as bit-planes.
    #[error("coloring backend needs a power-of-two class_num >= 2, got {0}")]
    ClassNumNotPowerOfTwo(usize),

    /// Bucket count outside the addressable range.
    #[error("bucket_num must be in [2, 2^32), got {0}")]
    InvalidBucketNum(usize),

    /// Only two-color palettes are supported by the parity engine.
    #[error("color_num must be 2, got {0}")]
    UnsupportedColorNum(u32),

    /// A counting filter needs at least one counter.
    #[error("num_bits must be non-zero")]
    EmptyFilter,

    /// A counting filter needs at least one probe.
    #[error("hash_count must be non-zero")]
    NoHashProbes,

    /// A filter state must belong to one of its group's classes.
    #[error("class_idx {class_idx} out of range for {class_num} classes")]
    ClassIndexOutOfRange {
        /// The requested class.
        class_idx: usize,
        /// Classes in the group.
        class_num: usize,
    },

    /// Counters are stored in a byte each.
    #[error("count_bits must be in 1..=8, got {0}")]
    InvalidCounterWidth(u8),
}

#[cfg(test)]
mod tests {
    use super::*;
    extern crate alloc;
    use alloc::string::ToString;

    #[test]
    fn test_error_messages_name_the_parameter() {
        assert_eq!(
            ConfigError::InvalidCounterWidth(9).to_string(),
            "count_bits must be in 1..=8, got 9"
        );
        assert!(ConfigError::ClassNumNotPowerOfTwo(3)
            .to_string()
            .contains("power-of-two"));
    }
}
