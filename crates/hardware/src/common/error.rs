//! Error definitions.
//!
//! This module defines every failure the simulator can report. It provides:
//! 1. **Configuration errors:** Rejected once, when caches are built.
//! 2. **Coherence errors:** Protocol contract violations and broken invariants; these end the run.
//! 3. **Trace errors:** Malformed or unreadable access traces.
//! 4. **Simulation errors:** The umbrella type returned by the driver.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::addr::Addr;
use super::data::BusMsg;
use crate::cache::line::LineState;

/// Invalid cache geometry or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A size or count that must be non-zero was zero.
    #[error("{field} must be non-zero")]
    Zero {
        /// Name of the offending configuration field.
        field: &'static str,
    },

    /// A size that must be a power of two was not.
    #[error("{field} must be a power of two, got {value}")]
    NotPowerOfTwo {
        /// Name of the offending configuration field.
        field: &'static str,
        /// The rejected value.
        value: usize,
    },

    /// The address width is outside `1..=64`.
    #[error("address width must be between 1 and 64 bits, got {bits}")]
    AddressWidth {
        /// The rejected width.
        bits: u32,
    },

    /// Offset and index fields consume the whole address.
    #[error(
        "line offset ({offset_bits} bits) and set index ({index_bits} bits) leave no tag bits in a {address_bits}-bit address"
    )]
    NoTagBits {
        /// Bits used by the line offset.
        offset_bits: u32,
        /// Bits used by the set index.
        index_bits: u32,
        /// Configured address width.
        address_bits: u32,
    },

    /// The replacement policy cannot track this many ways.
    #[error("{policy} supports at most {max} ways, got {ways}")]
    TooManyWays {
        /// Policy name.
        policy: &'static str,
        /// Largest supported associativity.
        max: usize,
        /// Requested associativity.
        ways: usize,
    },

    /// A cache would hold more lines than the simulator allocates.
    #[error("{sets} sets of {ways} ways exceed the limit of {max} lines per cache")]
    GeometryTooLarge {
        /// Requested number of sets.
        sets: usize,
        /// Requested associativity.
        ways: usize,
        /// Largest supported line count.
        max: usize,
    },

    /// The configuration text could not be deserialized.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("failed to read configuration {}: {source}", .path.display())]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
}

/// A coherence contract violation.
///
/// These are never recoverable: they mean caches have diverged in a way the
/// protocol guarantees cannot happen, and the run must stop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoherenceError {
    /// The protocol table forbids this snooped message in this state.
    #[error("{protocol}: {event} is not allowed on a line in state {state}")]
    ProtocolViolation {
        /// Protocol name.
        protocol: &'static str,
        /// The offending message.
        event: BusMsg,
        /// State of the line when the event arrived.
        state: LineState,
    },

    /// The line holds a state outside the protocol's domain.
    #[error("{protocol} has no {state} state")]
    IllegalState {
        /// Protocol name.
        protocol: &'static str,
        /// The foreign state.
        state: LineState,
    },

    /// A bus message was issued while no processor access was in flight.
    #[error("cache {cache} issued {msg} outside of a processor access")]
    NoAccessInFlight {
        /// Issuing cache.
        cache: usize,
        /// Message that was attempted.
        msg: BusMsg,
    },

    /// An access named a cache the bus does not own.
    #[error("cache {cache} does not exist (bus has {count} caches)")]
    UnknownCache {
        /// Requested cache id.
        cache: usize,
        /// Number of caches on the bus.
        count: usize,
    },

    /// A global coherence invariant does not hold after an access.
    #[error("coherence invariant broken for line {addr}: {detail}")]
    InvariantBroken {
        /// Address of the affected line.
        addr: Addr,
        /// Description of the broken invariant.
        detail: String,
    },
}

/// Unreadable or malformed access trace.
#[derive(Debug, Error)]
pub enum TraceError {
    /// A trace line could not be parsed.
    #[error("trace line {line}: {reason}")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// The trace could not be read.
    #[error("failed to read trace: {0}")]
    Io(#[from] io::Error),
}

/// Any failure while driving a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The trace could not be read or parsed.
    #[error(transparent)]
    Trace(#[from] TraceError),

    /// An access broke the coherence contract.
    #[error("access #{index} failed: {source}")]
    Coherence {
        /// 0-based index of the failing access.
        index: u64,
        /// Underlying violation.
        source: CoherenceError,
    },

    /// An address does not fit the configured address width.
    #[error("access #{index}: address {addr} exceeds the {bits}-bit address space")]
    AddressOutOfRange {
        /// 0-based index of the failing access.
        index: u64,
        /// The rejected address.
        addr: Addr,
        /// Configured address width.
        bits: u32,
    },
}
