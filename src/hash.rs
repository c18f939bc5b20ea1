//! Key-to-position hashing shared by the summary backends.
//!
//! Every replica of a summary must map a key to the same positions, so the
//! hash family is seeded with fixed salts rather than a per-process random
//! state. Positions come from XXH3 over the key's little-endian bytes.

use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Salt of the first candidate bucket in the coloring classifier.
pub(crate) const BUCKET_SALT_A: u64 = 0x9e37_79b9_7f4a_7c15;
/// Salt of the second candidate bucket in the coloring classifier.
pub(crate) const BUCKET_SALT_B: u64 = 0xc2b2_ae3d_27d4_eb4f;
/// Base salt for Bloom filter probes; probe `i` uses `BLOOM_SALT + i`.
pub(crate) const BLOOM_SALT: u64 = 0x1656_67b1_9e37_79f9;

/// Hashes `key` with `salt`.
#[inline]
pub fn probe(key: u64, salt: u64) -> u64 {
    xxh3_64_with_seed(&key.to_le_bytes(), salt)
}

/// The two distinct candidate buckets of `key` among `bucket_num` buckets.
///
/// The second bucket is drawn from the `bucket_num - 1` buckets other than
/// the first, so the pair never collapses into a self-loop. Adding the same
/// offset to both modulo `bucket_num` preserves distinctness.
///
/// `bucket_num` must be at least 2.
#[inline]
pub fn bucket_pair(key: u64, bucket_num: u32) -> (u32, u32) {
    debug_assert!(bucket_num >= 2);
    let n = u64::from(bucket_num);
    let a = probe(key, BUCKET_SALT_A) % n;
    let mut b = probe(key, BUCKET_SALT_B) % (n - 1);
    if b >= a {
        b += 1;
    }
    (a as u32, b as u32)
}

/// Bit position of Bloom probe `index` for `key` in a filter of `num_bits`.
#[inline]
pub fn bloom_position(key: u64, index: u32, num_bits: usize) -> usize {
    (probe(key, BLOOM_SALT.wrapping_add(u64::from(index))) % num_bits as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_is_deterministic() {
        assert_eq!(probe(12345, 7), probe(12345, 7));
        assert_ne!(probe(12345, 7), probe(12345, 8));
    }

    #[test]
    fn test_bucket_pair_is_distinct_and_in_range() {
        for key in 0..10_000u64 {
            let (a, b) = bucket_pair(key, 2);
            assert_ne!(a, b);
            assert!(a < 2 && b < 2);

            let (a, b) = bucket_pair(key, 97);
            assert_ne!(a, b);
            assert!(a < 97 && b < 97);
        }
    }

    #[test]
    fn test_bloom_positions_in_range() {
        for key in 0..1_000u64 {
            for i in 0..4 {
                assert!(bloom_position(key, i, 13) < 13);
            }
        }
    }
}
