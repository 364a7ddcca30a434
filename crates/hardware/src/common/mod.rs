//! Common types shared by every part of the simulator.
//!
//! This module provides the fundamental building blocks used across caches, protocols
//! and the bus. It includes:
//! 1. **Address Types:** The `Addr` newtype and the tag/set/offset `AddressLayout`.
//! 2. **Events:** Processor access types and bus messages.
//! 3. **Error Handling:** Configuration, coherence, trace and simulation errors.

/// Address type and geometry-driven decomposition.
pub mod addr;

/// Processor access and bus message definitions.
pub mod data;

/// Error types.
pub mod error;

pub use addr::{Addr, AddressLayout};
pub use data::{AccessType, BusMsg};
pub use error::{CoherenceError, ConfigError, SimError, TraceError};
