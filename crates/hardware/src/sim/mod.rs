//! Trace input and the simulation driver.
//!
//! Parses access traces and replays them through the bus one access at a time.

/// Trace line format and streaming reader.
pub mod trace;

/// Simulator owning the bus and its caches.
pub mod simulator;

pub use simulator::{RunSummary, Simulator};
pub use trace::Access;
