//! Least Recently Used (LRU) Replacement Policy.
//!
//! This policy evicts the way that has gone the longest without an access.
//! Each way carries an age, counted in set accesses since that way was last touched:
//! touching a way resets its age to zero and ages every other way of the set by one.
//! The victim is the oldest way; ties go to the lowest way index so runs are reproducible.
//!
//! # Performance
//!
//! - **Time Complexity:**
//!   - `touch()`: O(W) where W is the number of ways (associativity)
//!   - `get_victim()`: O(W)
//! - **Space Complexity:** O(S × W) where S is the number of sets
//! - **Best Case:** Working sets that fit in the set's associativity
//! - **Worst Case:** Cyclic scans one line larger than the associativity (thrashing)

use std::fmt::Write as _;

use super::ReplacementPolicy;

/// LRU Policy state.
#[derive(Debug, Clone)]
pub struct LruPolicy {
    /// Line age in set accesses since the line was last accessed, stored set-major.
    age: Vec<u64>,
    ways: usize,
}

impl LruPolicy {
    /// Creates a new LRU policy instance with every age at zero.
    ///
    /// # Arguments
    ///
    /// * `sets` - The number of sets in the cache.
    /// * `ways` - The associativity (number of ways) of the cache.
    ///
    /// `sets * ways` must fit in `usize`; `CacheConfig::validate` bounds it.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            age: vec![0; sets * ways],
            ways,
        }
    }

    /// Returns the ages of one set, indexed by way.
    pub fn ages(&self, set: usize) -> &[u64] {
        let base = set * self.ways;
        &self.age[base..base + self.ways]
    }
}

impl ReplacementPolicy for LruPolicy {
    fn touch(&mut self, set: usize, way: usize) {
        let base = set * self.ways;
        for (i, age) in self.age[base..base + self.ways].iter_mut().enumerate() {
            if i == way {
                *age = 0;
            } else {
                *age = age.saturating_add(1);
            }
        }
    }

    /// Returns the oldest way; the first maximum wins.
    fn get_victim(&mut self, set: usize) -> usize {
        let mut victim = 0;
        let mut oldest = 0;
        for (way, &age) in self.ages(set).iter().enumerate() {
            if age > oldest {
                oldest = age;
                victim = way;
            }
        }
        victim
    }

    fn describe_set(&self, set: usize) -> String {
        let mut out = format!("set {set} ages:");
        for age in self.ages(set) {
            let _ = write!(out, " {age}");
        }
        out
    }
}
