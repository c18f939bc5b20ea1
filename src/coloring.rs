//! Bucket coloring engine.
//!
//! Maintains a 2-coloring of `bucket_num` buckets under pairwise constraints
//! ("these two buckets have the same color" / "these two buckets have
//! different colors"). Buckets form a union-find forest in which every bucket
//! stores its parity relative to its parent; a bucket's color is the parity
//! of its path to the root, so two buckets in one component have a fixed
//! color relation and buckets in different components are unconstrained.
//!
//! Adding a constraint between two components merges them with whatever
//! parity satisfies it. Adding one inside a component either agrees with the
//! existing parity or is a conflict (an odd cycle of "different" edges, or a
//! same/different contradiction). Conflicts leave the forest untouched.
//!
//! ```text
//!   constrain(3, 7, Different)        constrain(7, 9, Same)
//!
//!        3 (root, 0)                       3 (root, 0)
//!        └─ 7 (parity 1)                   ├─ 7 (parity 1)
//!                                          └─ 9 (parity 1)
//! ```
//!
//! Union by rank keeps trees shallow; `find` compresses paths. Read-only
//! color queries walk the tree without compressing so they can run behind a
//! shared lock.

extern crate alloc;

use alloc::vec::Vec;
use core::fmt;

/// Required relation between the colors of an edge's two buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// Both buckets must have the same color (class bit 0).
    Same,
    /// The buckets must have different colors (class bit 1).
    Different,
}

impl Polarity {
    /// Polarity that encodes `bit`.
    #[inline]
    pub fn from_bit(bit: bool) -> Self {
        if bit {
            Polarity::Different
        } else {
            Polarity::Same
        }
    }

    /// The class bit this polarity encodes.
    #[inline]
    pub fn bit(self) -> bool {
        matches!(self, Polarity::Different)
    }

    #[inline]
    fn parity(self) -> u8 {
        u8::from(self.bit())
    }
}

/// One (key, bit-plane) constraint between two buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorEdge {
    /// First bucket, already shifted by the plane offset.
    pub a: u32,
    /// Second bucket, already shifted by the plane offset.
    pub b: u32,
    /// Plane offset that was added to both base buckets.
    pub shift: u8,
    /// Required color relation.
    pub polarity: Polarity,
}

#[derive(Clone, Copy)]
struct Bucket {
    parent: u32,
    parity: u8,
    rank: u8,
}

/// Union-find with parity over a fixed set of buckets.
pub struct ColoringEngine {
    buckets: Vec<Bucket>,
}

impl ColoringEngine {
    /// Creates `bucket_num` unconstrained buckets, all colored 0.
    pub fn new(bucket_num: u32) -> Self {
        ColoringEngine {
            buckets: (0..bucket_num)
                .map(|id| Bucket {
                    parent: id,
                    parity: 0,
                    rank: 0,
                })
                .collect(),
        }
    }

    /// Number of buckets.
    #[inline]
    pub fn bucket_num(&self) -> u32 {
        self.buckets.len() as u32
    }

    /// Drops every constraint.
    pub fn reset(&mut self) {
        for (id, bucket) in self.buckets.iter_mut().enumerate() {
            *bucket = Bucket {
                parent: id as u32,
                parity: 0,
                rank: 0,
            };
        }
    }

    /// Returns true if `bucket` has never been merged with another bucket.
    pub fn is_free(&self, bucket: u32) -> bool {
        let b = self.buckets[bucket as usize];
        b.parent == bucket && b.rank == 0
    }

    /// Current color of `bucket` (0 or 1).
    pub fn color(&self, bucket: u32) -> u8 {
        let mut current = bucket;
        let mut parity = 0;
        loop {
            let b = self.buckets[current as usize];
            if b.parent == current {
                return parity;
            }
            parity ^= b.parity;
            current = b.parent;
        }
    }

    /// Returns true if the edge's endpoints currently satisfy its polarity.
    pub fn satisfied(&self, edge: &ColorEdge) -> bool {
        (self.color(edge.a) ^ self.color(edge.b)) == edge.polarity.parity()
    }

    /// Adds `edge` to the constraint set, merging components as needed.
    ///
    /// Returns false if the edge contradicts constraints already in the same
    /// component; the forest is not modified in that case.
    pub fn constrain(&mut self, edge: &ColorEdge) -> bool {
        let (root_a, parity_a) = self.find(edge.a);
        let (root_b, parity_b) = self.find(edge.b);
        let required = edge.polarity.parity();

        if root_a == root_b {
            return (parity_a ^ parity_b) == required;
        }

        let link = parity_a ^ parity_b ^ required;
        let rank_a = self.buckets[root_a as usize].rank;
        let rank_b = self.buckets[root_b as usize].rank;
        let (child, parent) = if rank_a < rank_b {
            (root_a, root_b)
        } else {
            (root_b, root_a)
        };
        self.buckets[child as usize].parent = parent;
        self.buckets[child as usize].parity = link;
        if rank_a == rank_b {
            self.buckets[parent as usize].rank += 1;
        }
        true
    }

    /// Root of `bucket` and the parity of `bucket` relative to it.
    fn find(&mut self, bucket: u32) -> (u32, u8) {
        let mut root = bucket;
        let mut total = 0;
        loop {
            let b = self.buckets[root as usize];
            if b.parent == root {
                break;
            }
            total ^= b.parity;
            root = b.parent;
        }

        let mut current = bucket;
        let mut remaining = total;
        while current != root {
            let b = self.buckets[current as usize];
            self.buckets[current as usize].parent = root;
            self.buckets[current as usize].parity = remaining;
            remaining ^= b.parity;
            current = b.parent;
        }

        (root, total)
    }
}

impl fmt::Debug for ColoringEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColoringEngine")
            .field("bucket_num", &self.buckets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(a: u32, b: u32, polarity: Polarity) -> ColorEdge {
        ColorEdge {
            a,
            b,
            shift: 0,
            polarity,
        }
    }

    #[test]
    fn test_fresh_buckets_are_free_and_equal() {
        let engine = ColoringEngine::new(4);
        assert!(engine.is_free(2));
        assert_eq!(engine.color(0), engine.color(3));
        assert!(engine.satisfied(&edge(0, 3, Polarity::Same)));
        assert!(!engine.satisfied(&edge(0, 3, Polarity::Different)));
    }

    #[test]
    fn test_constraints_chain_through_components() {
        let mut engine = ColoringEngine::new(8);
        assert!(engine.constrain(&edge(0, 1, Polarity::Different)));
        assert!(engine.constrain(&edge(1, 2, Polarity::Different)));
        assert!(engine.constrain(&edge(2, 3, Polarity::Same)));
        assert_eq!(engine.color(0), engine.color(2));
        assert_ne!(engine.color(0), engine.color(3) ^ 1);
        assert!(!engine.is_free(1));

        // Merge a second component in with a cross edge
        assert!(engine.constrain(&edge(5, 6, Polarity::Different)));
        assert!(engine.constrain(&edge(3, 6, Polarity::Same)));
        assert_ne!(engine.color(0), engine.color(5));
    }

    #[test]
    fn test_odd_cycle_of_different_is_conflict() {
        let mut engine = ColoringEngine::new(3);
        assert!(engine.constrain(&edge(0, 1, Polarity::Different)));
        assert!(engine.constrain(&edge(1, 2, Polarity::Different)));
        assert!(!engine.constrain(&edge(2, 0, Polarity::Different)));
        // The failed edge left the coloring intact
        assert!(engine.satisfied(&edge(0, 1, Polarity::Different)));
        assert!(engine.satisfied(&edge(1, 2, Polarity::Different)));
    }

    #[test]
    fn test_same_different_contradiction() {
        let mut engine = ColoringEngine::new(2);
        assert!(engine.constrain(&edge(0, 1, Polarity::Same)));
        assert!(engine.constrain(&edge(1, 0, Polarity::Same)));
        assert!(!engine.constrain(&edge(0, 1, Polarity::Different)));
    }

    #[test]
    fn test_reset_clears_constraints() {
        let mut engine = ColoringEngine::new(2);
        engine.constrain(&edge(0, 1, Polarity::Different));
        engine.reset();
        assert!(engine.is_free(0) && engine.is_free(1));
        assert!(engine.constrain(&edge(0, 1, Polarity::Same)));
    }

    #[test]
    fn test_long_chain_colors_alternate() {
        let mut engine = ColoringEngine::new(64);
        for i in 0..63 {
            assert!(engine.constrain(&edge(i, i + 1, Polarity::Different)));
        }
        for i in 0..63 {
            assert_ne!(engine.color(i), engine.color(i + 1));
        }
        assert_eq!(engine.color(0), engine.color(62));
    }
}
