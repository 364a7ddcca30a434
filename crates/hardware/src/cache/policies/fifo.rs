//! Round-robin (FIFO) replacement.
//!
//! Lines leave a set in the order they were filled. Each set keeps a fill pointer
//! naming the way the next miss will overwrite; the pointer moves on only when
//! that way is touched, which for a FIFO set means it has just been refilled.
//! Hits elsewhere in the set never reorder it.
//!
//! # Performance
//!
//! - `touch()` and `get_victim()` are O(1)
//! - One pointer per set

use super::ReplacementPolicy;

/// FIFO Policy state.
#[derive(Debug, Clone)]
pub struct FifoPolicy {
    /// Way each set will overwrite next.
    fill_ptr: Vec<usize>,
    ways: usize,
}

impl FifoPolicy {
    /// Creates a policy whose sets all fill from way 0.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            fill_ptr: vec![0; sets],
            ways,
        }
    }
}

impl ReplacementPolicy for FifoPolicy {
    fn touch(&mut self, set: usize, way: usize) {
        let ptr = &mut self.fill_ptr[set];
        if *ptr == way {
            *ptr = (way + 1) % self.ways;
        }
    }

    fn get_victim(&mut self, set: usize) -> usize {
        self.fill_ptr[set]
    }

    fn describe_set(&self, set: usize) -> String {
        format!("set {set} next: {}", self.fill_ptr[set])
    }
}
