//! Seeded random replacement.
//!
//! Victims are drawn from a xorshift64 stream. The stream depends only on the
//! seed, so replaying a trace with the same configuration evicts the same ways.
//! Accesses carry no information for this policy.

use super::ReplacementPolicy;

/// Substitute seed: zero is a fixed point of xorshift.
const NONZERO_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Random Policy state.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    ways: usize,
    /// Last xorshift output; never zero.
    rng: u64,
}

impl RandomPolicy {
    /// Creates a policy drawing from `seed`; a zero seed is replaced by a fixed constant.
    pub const fn new(ways: usize, seed: u64) -> Self {
        Self {
            ways,
            rng: if seed == 0 { NONZERO_SEED } else { seed },
        }
    }

    const fn next(&mut self) -> u64 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng = x;
        x
    }
}

impl ReplacementPolicy for RandomPolicy {
    fn touch(&mut self, _set: usize, _way: usize) {}

    fn get_victim(&mut self, _set: usize) -> usize {
        (self.next() % self.ways as u64) as usize
    }

    fn describe_set(&self, set: usize) -> String {
        format!("set {set} rng: {:#018x}", self.rng)
    }
}
