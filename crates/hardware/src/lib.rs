//! Snooping cache-coherence simulator library.
//!
//! This crate models private caches kept coherent over a shared snooping bus:
//! 1. **Caches:** Set-associative storage with pluggable replacement (LRU, FIFO, PLRU, Random).
//! 2. **Coherence:** MSI, MSI with `BusUpgr`, and MESI protocol state machines.
//! 3. **Bus:** Broadcast of bus messages, COPIES-EXIST collection, and flush tracking.
//! 4. **Simulation:** Trace parsing, the access driver, configuration, and statistics.

/// Shared snooping bus owning every cache.
pub mod bus;
/// Coherent set-associative cache (lines, replacement policies, bus port).
pub mod cache;
/// Coherence protocol state machines.
pub mod coherence;
/// Common types (addresses, access and bus message kinds, errors).
pub mod common;
/// Simulator configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// Trace reader and simulation driver.
pub mod sim;
/// Per-cache and bus statistics.
pub mod stats;

/// Bus connecting the caches; construct with `MemoryBus::new`.
pub use crate::bus::MemoryBus;
/// Private cache attached to the bus.
pub use crate::cache::Cache;
/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Trace-driven simulator; owns the bus and applies accesses in order.
pub use crate::sim::Simulator;
