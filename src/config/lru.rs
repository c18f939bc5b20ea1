//! Configuration for the size-bounded LRU shard cache.
//!
//! # Sizing Guidelines
//!
//! `capacity` is a byte budget charged with each entry's declared size, not
//! an entry count. Per-entry bookkeeping (map slot, list node, key) is not
//! charged:
//!
//! ```text
//! Total Memory ≈ capacity + (resident_entries × overhead_per_entry)
//! ```
//!
//! In a cooperative cache every shard gets the same budget, so the whole
//! cache holds at most `class_num × capacity` bytes of payload.

use core::fmt;

/// Configuration for a [`SizeBoundedLru`](crate::SizeBoundedLru) shard.
///
/// # Examples
///
/// ```
/// use coop_cache::config::SizeBoundedLruConfig;
/// use coop_cache::SizeBoundedLru;
///
/// // 4MB budget for payloads
/// let config = SizeBoundedLruConfig { capacity: 4 * 1024 * 1024 };
/// let cache: SizeBoundedLru<Vec<u8>> = SizeBoundedLru::init(config);
/// assert_eq!(cache.capacity(), 4 * 1024 * 1024);
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SizeBoundedLruConfig {
    /// Byte budget for resident payloads.
    pub capacity: u64,
}

impl fmt::Debug for SizeBoundedLruConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SizeBoundedLruConfig")
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_config_creation() {
        let config = SizeBoundedLruConfig { capacity: 1 << 20 };
        assert_eq!(config.capacity, 1 << 20);
    }
}
