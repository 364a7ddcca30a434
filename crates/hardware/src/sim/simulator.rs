//! Simulator: owns the bus and drives accesses through it one at a time.
//!
//! Every access is validated against the configured address width, routed to its
//! cache, and optionally followed by a global coherence check of the touched line.
//! The first error ends the run.

use std::fmt::Write as _;

use tracing::{debug, info};

use super::trace::Access;
use crate::bus::{AccessOutcome, MemoryBus};
use crate::common::addr::AddressLayout;
use crate::common::error::{SimError, TraceError};
use crate::config::Config;
use crate::stats::{BusStats, CacheStats};

/// Counts reported at the end of [`Simulator::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Accesses performed.
    pub accesses: u64,
    /// Accesses during which at least one line was written back.
    pub flushes: u64,
}

/// Top-level simulator: configuration plus the bus and its caches.
#[derive(Debug)]
pub struct Simulator {
    config: Config,
    layout: AddressLayout,
    bus: MemoryBus,
    summary: RunSummary,
}

impl Simulator {
    /// Creates a simulator with every cache empty.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] if the configuration is invalid.
    pub fn new(config: Config) -> Result<Self, SimError> {
        config.validate()?;
        let layout = config.cache.layout()?;
        let bus = MemoryBus::new(&config.cache)?;
        info!(
            caches = config.cache.num_caches,
            sets = config.cache.num_sets,
            ways = config.cache.assoc,
            line_bytes = config.cache.line_bytes,
            protocol = %config.cache.protocol,
            policy = %config.cache.policy,
            "simulator ready"
        );
        Ok(Self {
            config,
            layout,
            bus,
            summary: RunSummary::default(),
        })
    }

    /// Configuration in use.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The bus and its caches.
    pub const fn bus(&self) -> &MemoryBus {
        &self.bus
    }

    /// Totals over every access performed so far.
    pub const fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Performs one access.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::AddressOutOfRange`] for an address wider than the
    /// configured address space, or [`SimError::Coherence`] if the access breaks the
    /// protocol or, with invariant checking enabled, leaves the line incoherent.
    pub fn step(&mut self, access: Access) -> Result<AccessOutcome, SimError> {
        let index = self.summary.accesses;
        if !self.layout.contains(access.addr) {
            return Err(SimError::AddressOutOfRange {
                index,
                addr: access.addr,
                bits: self.layout.address_bits(),
            });
        }

        let coherence = |source| SimError::Coherence { index, source };
        let outcome = self
            .bus
            .access(access.cache, access.kind, access.addr)
            .map_err(coherence)?;
        if self.config.general.check_invariants {
            self.bus.check_coherence(access.addr).map_err(coherence)?;
        }

        self.summary.accesses += 1;
        if outcome.flushed {
            self.summary.flushes += 1;
        }
        debug!(index, %access, hit = outcome.hit, flushed = outcome.flushed, "access done");
        Ok(outcome)
    }

    /// Drives a whole trace, stopping at the first error.
    ///
    /// # Returns
    ///
    /// Counts for the accesses performed by this call.
    ///
    /// # Errors
    ///
    /// Returns the first trace or simulation error.
    pub fn run<I>(&mut self, trace: I) -> Result<RunSummary, SimError>
    where
        I: IntoIterator<Item = Result<Access, TraceError>>,
    {
        let start = self.summary;
        for access in trace {
            let _ = self.step(access?)?;
        }
        let run = RunSummary {
            accesses: self.summary.accesses - start.accesses,
            flushes: self.summary.flushes - start.flushes,
        };
        info!(accesses = run.accesses, flushes = run.flushes, "run complete");
        Ok(run)
    }

    /// Renders the statistics report.
    ///
    /// The cache header is followed by one headerless row per cache that saw at
    /// least one access, in id order. The bus header and row close the report.
    pub fn stats_report(&self) -> String {
        let mut report = CacheStats::csv_header();
        report.push('\n');
        for line in self.bus.caches().iter().filter_map(|c| c.stats_line()) {
            let _ = writeln!(report, "{line}");
        }
        let _ = writeln!(report, "{}", BusStats::csv_header());
        let _ = writeln!(report, "{}", self.bus.stats().csv_row());
        report
    }

    /// Prints [`Simulator::stats_report`] to stdout.
    pub fn print_stats(&self) {
        print!("{}", self.stats_report());
    }
}
