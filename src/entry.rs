//! Shard Cache Entry Type
//!
//! A `CacheEntry<V>` is one resident value in a shard: the 64-bit key it is
//! stored under, the opaque payload, and the byte size the caller declared for
//! it. The size is what the shard's byte budget is charged; it does not have
//! to match `size_of::<V>()` (payloads are frequently handles to data that
//! lives elsewhere).
//!
//! # Memory Layout
//!
//! - `key: u64` - 8 bytes
//! - `value: V` - user's payload type
//! - `size: u64` - 8 bytes (declared content size)
//!
//! List links live in the arena node that wraps the entry, not in the entry
//! itself, see [`crate::list`].

use core::fmt;

/// One cached value together with its key and declared size.
///
/// # Examples
///
/// ```
/// use coop_cache::entry::CacheEntry;
///
/// let entry = CacheEntry::new(42, "payload", 7);
/// assert_eq!(entry.key, 42);
/// assert_eq!(entry.value, "payload");
/// assert_eq!(entry.size, 7);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct CacheEntry<V> {
    /// The key this entry is indexed under.
    pub key: u64,

    /// The cached payload.
    pub value: V,

    /// Declared size of the payload in bytes (or any unit the shard budget
    /// is expressed in; use 1 for count-based shards).
    pub size: u64,
}

impl<V> CacheEntry<V> {
    /// Creates a new entry.
    #[inline]
    pub fn new(key: u64, value: V, size: u64) -> Self {
        Self { key, value, size }
    }

    /// Replaces the payload and size, returning the previous size.
    #[inline]
    pub(crate) fn replace(&mut self, value: V, size: u64) -> u64 {
        self.value = value;
        core::mem::replace(&mut self.size, size)
    }
}

impl<V> fmt::Debug for CacheEntry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}
