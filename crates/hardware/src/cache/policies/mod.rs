//! Replacement policies.
//!
//! When a miss finds its set full, the cache asks its policy which way to
//! overwrite. Every policy here keeps its state per set and is deterministic for
//! a given configuration.
//!
//! # Policies
//!
//! - `Lru`: Least Recently Used (per-way age counters).
//! - `Fifo`: First-In, First-Out.
//! - `Plru`: Bit pseudo-LRU.
//! - `Random`: Seeded pseudo-random selection.

use std::fmt;

/// Round-robin fill order.
pub mod fifo;

/// Age-counter LRU.
pub mod lru;

/// One recently-used bit per way.
pub mod plru;

/// Seeded xorshift selection.
pub mod random;

pub use fifo::FifoPolicy;
pub use lru::LruPolicy;
pub use plru::PlruPolicy;
pub use random::RandomPolicy;

/// Victim selection for one cache.
///
/// A policy owns its per-set metadata exclusively; the cache only reports accesses
/// and asks for victims.
pub trait ReplacementPolicy: fmt::Debug + Send + Sync {
    /// Records that `way` of `set` was just hit or filled.
    fn touch(&mut self, set: usize, way: usize);

    /// Picks the way of `set` to overwrite on the next miss.
    ///
    /// The result is always `< ways`. Selecting a victim is not an access: only
    /// random replacement changes state here.
    fn get_victim(&mut self, set: usize) -> usize;

    /// Renders the policy's internal state for one set, for debugging.
    fn describe_set(&self, set: usize) -> String;
}
