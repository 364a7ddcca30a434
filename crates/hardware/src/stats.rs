//! Simulation statistics collection and reporting.
//!
//! This module tracks coherence metrics for the simulator. It provides:
//! 1. **Per-cache counters:** State transitions for every ordered pair of distinct states, hits, misses and writebacks.
//! 2. **Bus counters:** Messages issued by type, COPIES-EXIST responses and flushes.
//! 3. **Reporting:** Headerless CSV rows plus matching header lines.

use std::fmt::Write as _;

use crate::cache::line::LineState;
use crate::common::data::BusMsg;

/// Every ordered pair of distinct states, in CSV column order.
pub const TRANSITIONS: [(LineState, LineState); 12] = {
    use LineState::{Exclusive as E, Invalid as I, Modified as M, Shared as S};
    [
        (I, S),
        (I, E),
        (I, M),
        (S, I),
        (S, E),
        (S, M),
        (E, I),
        (E, S),
        (E, M),
        (M, I),
        (M, S),
        (M, E),
    ]
};

/// Runtime statistics of one cache.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Transition counts indexed by `[before.index()][after.index()]`.
    transitions: [[u64; 4]; 4],
    /// Processor accesses that found the line resident.
    pub hits: u64,
    /// Processor accesses that had to allocate the line.
    pub misses: u64,
    /// Lines written back to memory, by eviction or by snoop flush.
    pub writebacks: u64,
}

impl CacheStats {
    /// Records a state change; self-transitions are not counted.
    pub const fn record_transition(&mut self, before: LineState, after: LineState) {
        if before.index() != after.index() {
            self.transitions[before.index()][after.index()] += 1;
        }
    }

    /// Records the outcome of a processor access.
    pub const fn record_access(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    /// Number of `before → after` transitions recorded.
    pub const fn transitions(&self, before: LineState, after: LineState) -> u64 {
        self.transitions[before.index()][after.index()]
    }

    /// Total processor accesses.
    pub const fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of processor accesses that hit, or 0 for an unused cache.
    pub fn hit_rate(&self) -> f64 {
        if self.accesses() == 0 {
            0.0
        } else {
            self.hits as f64 / self.accesses() as f64
        }
    }

    /// CSV header matching [`CacheStats::csv_row`].
    pub fn csv_header() -> String {
        let mut header = String::new();
        for (before, after) in TRANSITIONS {
            let _ = write!(header, "{}->{},", before.letter(), after.letter());
        }
        header.push_str("hits,misses,writebacks");
        header
    }

    /// One headerless CSV row: transition counts, hits, misses, writebacks.
    pub fn csv_row(&self) -> String {
        let mut row = String::new();
        for (before, after) in TRANSITIONS {
            let _ = write!(row, "{},", self.transitions(before, after));
        }
        let _ = write!(row, "{},{},{}", self.hits, self.misses, self.writebacks);
        row
    }
}

/// Traffic statistics of the shared bus.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Messages issued, indexed by [`BusMsg::index`].
    messages: [u64; 3],
    /// Broadcasts answered with COPIES-EXIST.
    pub copies_exist: u64,
    /// Lines flushed to memory (snoop flushes and eviction writebacks).
    pub flushes: u64,
}

impl BusStats {
    /// Records one broadcast of `msg`.
    pub const fn record_message(&mut self, msg: BusMsg) {
        self.messages[msg.index()] += 1;
    }

    /// Number of `msg` broadcasts.
    pub const fn messages(&self, msg: BusMsg) -> u64 {
        self.messages[msg.index()]
    }

    /// Total broadcasts of any kind.
    pub fn total_messages(&self) -> u64 {
        self.messages.iter().sum()
    }

    /// CSV header matching [`BusStats::csv_row`].
    pub fn csv_header() -> String {
        let mut header = String::new();
        for msg in BusMsg::ALL {
            let _ = write!(header, "{msg},");
        }
        header.push_str("copies_exist,flushes");
        header
    }

    /// One headerless CSV row.
    pub fn csv_row(&self) -> String {
        let mut row = String::new();
        for msg in BusMsg::ALL {
            let _ = write!(row, "{},", self.messages(msg));
        }
        let _ = write!(row, "{},{}", self.copies_exist, self.flushes);
        row
    }
}
