//! Shifting bucket coloring classifier.
//!
//! Encodes, for every live key, its class id as `log2(class_num)` bit-planes.
//! Plane `k` of key `x` is an edge between buckets `(h_a(x) + k) mod n` and
//! `(h_b(x) + k) mod n`: class bit 1 requires the two buckets to have
//! different colors, bit 0 requires the same color. One pair of hashes serves
//! every plane (the shift), so a query costs two hash evaluations and
//! `2 × planes` color reads.
//!
//! ```text
//!  class 0b101, planes = 3, n = 16, h_a = 4, h_b = 11
//!
//!  plane 0:  bucket 4  ≠ bucket 11   (bit 1)
//!  plane 1:  bucket 5  = bucket 12   (bit 0)
//!  plane 2:  bucket 6  ≠ bucket 13   (bit 1)
//! ```
//!
//! # Exactness
//!
//! After a successful [`build`](ShiftingColoringClassifier::build) every
//! built key queries back to exactly its class. Incremental
//! [`insert`](ShiftingColoringClassifier::insert) extends the coloring and
//! reports conflicts without undoing planes that did merge. [`remove`]
//! drops a key's edges but never recolors buckets, so merges made on behalf
//! of removed keys persist and can later cause spurious conflicts.
//! [`rebuild`](ShiftingColoringClassifier::rebuild) recomputes the coloring
//! from the live edges only and is the way back to exactness; when to call it
//! is the caller's policy.
//!
//! Keys that were never inserted query to an arbitrary class.
//!
//! [`remove`]: ShiftingColoringClassifier::remove

extern crate alloc;

use crate::coloring::{ColorEdge, ColoringEngine, Polarity};
use crate::config::ColoringConfig;
use crate::error::ConfigError;
use crate::hash::bucket_pair;
use crate::HashMap;
use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

/// Multi-plane coloring classifier predicting one class per key.
///
/// # Examples
///
/// ```
/// use coop_cache::ShiftingColoringClassifier;
/// use coop_cache::config::ColoringConfig;
///
/// let config = ColoringConfig { bucket_num: 1 << 12, color_num: 2 };
/// let mut cc = ShiftingColoringClassifier::init(config, 4).unwrap();
///
/// let items = [(10, 0), (11, 1), (12, 2), (13, 3)];
/// assert!(cc.build(&items));
/// for (key, class) in items {
///     assert_eq!(cc.query(key), class);
/// }
/// ```
pub struct ShiftingColoringClassifier {
    engine: ColoringEngine,
    color_num: u32,
    class_num: usize,
    planes: u8,
    edges: HashMap<(u64, u8), ColorEdge>,
}

impl ShiftingColoringClassifier {
    /// Creates an empty classifier for `class_num` classes.
    ///
    /// `class_num` must be a power of two of at least 2; see
    /// [`ColoringConfig::validate`].
    pub fn init(config: ColoringConfig, class_num: usize) -> Result<Self, ConfigError> {
        config.validate(class_num)?;
        Ok(ShiftingColoringClassifier::new(config, class_num))
    }

    /// Unchecked constructor for callers that already validated `config`.
    pub(crate) fn new(config: ColoringConfig, class_num: usize) -> Self {
        debug_assert!(config.validate(class_num).is_ok());
        ShiftingColoringClassifier {
            engine: ColoringEngine::new(config.bucket_num as u32),
            color_num: config.color_num,
            class_num,
            planes: class_num.trailing_zeros() as u8,
            edges: HashMap::new(),
        }
    }

    /// Backend name, `CC` followed by the palette size.
    pub fn name(&self) -> String {
        format!("CC{}", self.color_num)
    }

    /// Number of classes.
    #[inline]
    pub fn class_num(&self) -> usize {
        self.class_num
    }

    /// Number of bit-planes, `log2(class_num)`.
    #[inline]
    pub fn planes(&self) -> u8 {
        self.planes
    }

    /// Number of keys with live edges.
    pub fn key_count(&self) -> usize {
        if self.planes == 0 {
            0
        } else {
            self.edges.len() / usize::from(self.planes)
        }
    }

    /// Returns true if `key` has live edges.
    pub fn contains(&self, key: u64) -> bool {
        self.edges.contains_key(&(key, 0))
    }

    /// The class `key` was last inserted with, if it has live edges.
    pub fn stored_class(&self, key: u64) -> Option<usize> {
        let mut class = 0;
        for k in 0..self.planes {
            let edge = self.edges.get(&(key, k))?;
            if edge.polarity.bit() {
                class |= 1 << k;
            }
        }
        Some(class)
    }

    /// Discards all state and builds a coloring for exactly `items`.
    ///
    /// Returns false if the constraints cannot all be satisfied; the
    /// classifier is then only partially consistent and should be rebuilt
    /// with more buckets. A key listed twice keeps its last class.
    pub fn build(&mut self, items: &[(u64, usize)]) -> bool {
        self.edges.clear();
        for &(key, class) in items {
            for k in 0..self.planes {
                let edge = self.edge(key, class, k);
                self.edges.insert((key, k), edge);
            }
        }
        self.rebuild()
    }

    /// Recomputes the coloring from the live edges only.
    ///
    /// Returns false if the live constraints are inconsistent.
    pub fn rebuild(&mut self) -> bool {
        self.engine.reset();
        let mut conflicts = 0usize;
        for edge in self.edges.values() {
            if !self.engine.constrain(edge) {
                conflicts += 1;
            }
        }
        if conflicts > 0 {
            tracing::warn!(
                conflicts,
                edges = self.edges.len(),
                buckets = self.engine.bucket_num(),
                "coloring build left constraints unsatisfied"
            );
        }
        conflicts == 0
    }

    /// Predicts the class of `key`.
    pub fn query(&self, key: u64) -> usize {
        let n = self.engine.bucket_num();
        let (a, b) = bucket_pair(key, n);
        let mut class = 0;
        for k in 0..self.planes {
            let c1 = self.engine.color(shift(a, k, n));
            let c2 = self.engine.color(shift(b, k, n));
            if c1 != c2 {
                class |= 1 << k;
            }
        }
        class
    }

    /// [`query`](Self::query) as a one-element list, matching the Bloom
    /// backend's multiway answer.
    pub fn query_multiway(&self, key: u64) -> Vec<usize> {
        vec![self.query(key)]
    }

    /// Adds `key` with `class`, extending the current coloring.
    ///
    /// A key already present under another class has its old edges replaced.
    /// Returns false if some plane conflicts with existing colors; planes
    /// that did fit stay merged, so a false return means the classifier is
    /// degraded until the next [`rebuild`](Self::rebuild).
    pub fn insert(&mut self, key: u64, class: usize) -> bool {
        let mut ok = true;
        for k in 0..self.planes {
            let edge = self.edge(key, class, k);
            if !self.engine.constrain(&edge) {
                tracing::warn!(key, plane = k, class, "coloring conflict on insert");
                ok = false;
            }
            self.edges.insert((key, k), edge);
        }
        ok
    }

    /// Drops `key`'s edges if it is stored under `class`.
    ///
    /// Bucket colors are left as they are. Returns true if edges were removed.
    pub fn remove(&mut self, key: u64, class: usize) -> bool {
        if self.stored_class(key) != Some(class) {
            return false;
        }
        for k in 0..self.planes {
            self.edges.remove(&(key, k));
        }
        true
    }

    /// Returns true if every live edge is satisfied by the current colors.
    pub fn is_consistent(&self) -> bool {
        self.edges.values().all(|edge| self.engine.satisfied(edge))
    }

    fn edge(&self, key: u64, class: usize, k: u8) -> ColorEdge {
        let n = self.engine.bucket_num();
        let (a, b) = bucket_pair(key, n);
        ColorEdge {
            a: shift(a, k, n),
            b: shift(b, k, n),
            shift: k,
            polarity: Polarity::from_bit((class >> k) & 1 == 1),
        }
    }
}

#[inline]
fn shift(bucket: u32, k: u8, n: u32) -> u32 {
    ((u64::from(bucket) + u64::from(k)) % u64::from(n)) as u32
}

impl fmt::Debug for ShiftingColoringClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShiftingColoringClassifier")
            .field("bucket_num", &self.engine.bucket_num())
            .field("class_num", &self.class_num)
            .field("keys", &self.key_count())
            .finish()
    }
}
