//! Summary Backend Tests
//!
//! Exercises the two membership summaries through their public APIs:
//! exactness of the coloring classifier after a build, and replica
//! consistency of the counting Bloom filter group after synchronization.

use coop_cache::config::{ColoringConfig, CountingBloomConfig};
use coop_cache::{
    CountingBloomFilter, CountingBloomFilterGroup, DeltaLog, MembershipSummary,
    ShiftingColoringClassifier,
};

fn classifier(bucket_num: usize, class_num: usize) -> ShiftingColoringClassifier {
    ShiftingColoringClassifier::init(
        ColoringConfig {
            bucket_num,
            color_num: 2,
        },
        class_num,
    )
    .unwrap()
}

fn bloom_config() -> CountingBloomConfig {
    CountingBloomConfig {
        num_bits: 1 << 13,
        hash_count: 4,
        count_bits: 4,
    }
}

// ============================================================================
// COLORING CLASSIFIER
// ============================================================================

#[test]
fn test_build_then_query_is_exact() {
    let mut cc = classifier(1 << 18, 8);
    let items: Vec<(u64, usize)> = (0..500u64)
        .map(|i| (i.wrapping_mul(0x9e37_79b9), (i % 8) as usize))
        .collect();
    assert!(cc.build(&items));
    let errors = items
        .iter()
        .filter(|&&(key, class)| cc.query(key) != class)
        .count();
    assert_eq!(errors, 0);
    assert_eq!(cc.query_multiway(items[5].0), vec![items[5].1]);
}

#[test]
fn test_rebuild_restores_exactness_after_removals() {
    let mut cc = classifier(1 << 14, 4);
    for key in 0..200u64 {
        cc.insert(key, (key % 4) as usize);
    }
    for key in 0..100u64 {
        assert!(cc.remove(key, (key % 4) as usize));
    }
    // Reassign the survivors to a rotated class
    for key in 100..200u64 {
        cc.insert(key, ((key + 1) % 4) as usize);
    }
    assert!(cc.rebuild());
    assert!(cc.is_consistent());
    for key in 100..200u64 {
        assert_eq!(cc.query(key), ((key + 1) % 4) as usize);
    }
    assert_eq!(cc.key_count(), 100);
}

#[test]
fn test_classifier_remove_absent_is_noop() {
    let mut cc = classifier(1 << 12, 2);
    cc.insert(1, 1);
    let before = cc.query(1);
    assert!(!cc.remove(999, 0));
    assert!(!cc.remove(1, 0));
    assert_eq!(cc.query(1), before);
    assert_eq!(cc.key_count(), 1);
}

#[test]
fn test_classifier_as_summary_excludes_viewer() {
    let mut cc = classifier(1 << 12, 4);
    let delta = DeltaLog {
        inserted: vec![10, 11],
        removed: vec![],
    };
    assert_eq!(cc.synchronize(3, &delta), 0);
    assert_eq!(cc.candidates(0, 10), vec![3]);
    assert!(cc.candidates(3, 11).is_empty());
}

// ============================================================================
// COUNTING BLOOM FILTER GROUP
// ============================================================================

#[test]
fn test_multiway_consistency_after_sync() {
    let mut group = CountingBloomFilterGroup::init(4, bloom_config()).unwrap();
    for key in 0..50u64 {
        group.insert(key, (key % 4) as usize);
    }
    for class in 0..4 {
        group.synchronize(class);
    }
    for key in 0..50u64 {
        let owner = (key % 4) as usize;
        for viewer in 0..4 {
            assert!(
                group.query_from(viewer, key).contains(&owner),
                "viewer {viewer} cannot see key {key} in class {owner}"
            );
        }
    }
}

#[test]
fn test_remove_of_absent_key_changes_nothing() {
    let mut group = CountingBloomFilterGroup::init(2, bloom_config()).unwrap();
    for key in 0..20u64 {
        group.insert(key, 0);
    }
    let snapshot = group.filter(0).filter(0).clone();
    assert!(!group.remove(10_000, 0));
    assert_eq!(group.filter(0).filter(0), &snapshot);
    for key in 0..20u64 {
        assert!(group.query(key).contains(&0));
    }
}

#[test]
fn test_replica_matches_authoritative_after_churn() {
    let config = bloom_config();
    let mut owner = CountingBloomFilter::init(0, 3, config).unwrap();
    let mut peers = [
        CountingBloomFilter::init(1, 3, config).unwrap(),
        CountingBloomFilter::init(2, 3, config).unwrap(),
    ];

    for round in 0..5u64 {
        for key in 0..40u64 {
            owner.insert(round * 100 + key);
        }
        for key in 0..20u64 {
            owner.remove(round * 100 + key);
        }
        let flip = owner.take_flip();
        for peer in peers.iter_mut() {
            peer.update(0, &flip);
        }
    }

    for peer in &peers {
        assert_eq!(peer.filter(0), owner.filter(0));
    }
    assert!((peers[0].fill_ratio(0) - owner.fill_ratio(0)).abs() < f64::EPSILON);
}

#[test]
fn test_saturated_counters_never_forget() {
    let config = CountingBloomConfig {
        num_bits: 1,
        hash_count: 1,
        count_bits: 2,
    };
    let mut filter = CountingBloomFilter::init(0, 1, config).unwrap();
    // Every key lands on the single position; the counter saturates at 3
    for key in 0..5u64 {
        filter.insert(key);
    }
    assert_eq!(filter.filter(0).count(0), 3);
    for key in 0..5u64 {
        assert!(filter.remove(key));
    }
    assert!(filter.query_bf(42, 0));
    assert_eq!(filter.filter(0).count(0), 3);
}

#[test]
fn test_group_as_summary() {
    let mut group = CountingBloomFilterGroup::init(3, bloom_config()).unwrap();
    group.on_insert(2, 77);
    assert!(group.candidates(0, 77).is_empty());
    MembershipSummary::synchronize(&mut group, 2, &DeltaLog::default());
    assert_eq!(group.candidates(0, 77), vec![2]);
    group.on_remove(2, 77);
    MembershipSummary::synchronize(&mut group, 2, &DeltaLog::default());
    assert!(group.candidates(0, 77).is_empty());
}
