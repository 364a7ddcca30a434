//! Bit Pseudo-LRU (PLRU) Replacement Policy.
//!
//! Approximates LRU with a single "recently used" bit per way (N bits for N ways).
//! Touching a way sets its bit; when that would leave every bit set, all bits except
//! the touched way's are cleared. The victim is the lowest way whose bit is clear.
//!
//! # Performance
//!
//! - **Time Complexity:**
//!   - `touch()`: O(1)
//!   - `get_victim()`: O(1) (a trailing-ones count)
//! - **Space Complexity:** one `u64` per set, so at most 64 ways
//! - **Worst Case:** Pathological cases can cause premature eviction of useful lines

use super::ReplacementPolicy;

/// PLRU Policy state.
#[derive(Debug, Clone)]
pub struct PlruPolicy {
    /// Recently-used bitmask for each set.
    usage: Vec<u64>,
    /// Number of ways in the cache.
    ways: usize,
}

impl PlruPolicy {
    /// Creates a new PLRU policy instance.
    ///
    /// # Arguments
    ///
    /// * `sets` - The number of sets in the cache.
    /// * `ways` - The associativity, at most 64 (checked by `CacheConfig::validate`).
    pub fn new(sets: usize, ways: usize) -> Self {
        debug_assert!(ways <= 64, "PLRU tracks at most 64 ways");
        Self {
            usage: vec![0; sets],
            ways,
        }
    }

    /// Mask with one bit per way.
    const fn full_mask(&self) -> u64 {
        if self.ways >= 64 {
            u64::MAX
        } else {
            (1 << self.ways) - 1
        }
    }
}

impl ReplacementPolicy for PlruPolicy {
    fn touch(&mut self, set: usize, way: usize) {
        let mask = 1u64 << way;
        let bits = self.usage[set] | mask;
        self.usage[set] = if bits & self.full_mask() == self.full_mask() {
            mask
        } else {
            bits
        };
    }

    fn get_victim(&mut self, set: usize) -> usize {
        let way = self.usage[set].trailing_ones() as usize;
        if way < self.ways { way } else { 0 }
    }

    fn describe_set(&self, set: usize) -> String {
        format!(
            "set {set} used: {:0width$b}",
            self.usage[set],
            width = self.ways
        )
    }
}
