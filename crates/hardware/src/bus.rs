//! Shared snooping bus.
//!
//! This module implements the bus that connects the private caches. It provides:
//! 1. **Ownership:** The bus owns every cache and the single-access `flushed` flag.
//! 2. **Access routing:** A processor access is delivered to one cache, which sees the rest through a `BusPort`.
//! 3. **Broadcast:** Messages reach every other cache; their replies are OR-ed into COPIES-EXIST.
//! 4. **Invariant checking:** Single-writer and no-stale-sharer checks across all caches.
//!
//! Accesses are strictly serialized: an access, including every message it triggers
//! and every writeback those cause, completes before the next one is admitted.

use tracing::{debug, warn};

use crate::cache::line::LineState;
use crate::cache::{BusPort, Cache};
use crate::common::addr::Addr;
use crate::common::data::{AccessType, BusMsg};
use crate::common::error::{CoherenceError, ConfigError};
use crate::config::CacheConfig;
use crate::stats::BusStats;

/// Result of one processor access.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccessOutcome {
    /// The accessing cache already held the line.
    pub hit: bool,
    /// Some cache wrote a line back during the access.
    pub flushed: bool,
}

/// Bus connecting every private cache.
#[derive(Debug)]
pub struct MemoryBus {
    caches: Vec<Cache>,
    /// Set by any writeback during the current access.
    flushed: bool,
    stats: BusStats,
}

/// The caches other than the accessing one, plus the bus state they share.
struct Siblings<'a> {
    before: &'a mut [Cache],
    after: &'a mut [Cache],
    flushed: &'a mut bool,
    stats: &'a mut BusStats,
}

impl BusPort for Siblings<'_> {
    fn broadcast(&mut self, from: usize, msg: BusMsg, addr: Addr) -> Result<bool, CoherenceError> {
        self.stats.record_message(msg);
        let mut copies_exist = false;
        for cache in self.before.iter_mut().chain(self.after.iter_mut()) {
            let reply = cache.receive_bus_msg(msg, addr)?;
            copies_exist |= reply.present;
            if reply.flushed {
                *self.flushed = true;
                self.stats.flushes += 1;
                debug!(from, snooper = cache.id(), %msg, %addr, "flush");
            }
        }
        if copies_exist {
            self.stats.copies_exist += 1;
        }
        Ok(copies_exist)
    }

    fn signal_flush(&mut self) {
        *self.flushed = true;
        self.stats.flushes += 1;
    }
}

impl MemoryBus {
    /// Creates a bus populated with `config.num_caches` empty caches.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is invalid.
    pub fn new(config: &CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let caches = (0..config.num_caches)
            .map(|id| Cache::new(id, config))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            caches,
            flushed: false,
            stats: BusStats::default(),
        })
    }

    /// Number of caches on the bus.
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    /// Returns `true` if the bus has no caches.
    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    /// All caches, indexed by id.
    pub fn caches(&self) -> &[Cache] {
        &self.caches
    }

    /// The cache with the given id.
    pub fn cache(&self, id: usize) -> Option<&Cache> {
        self.caches.get(id)
    }

    /// Bus traffic statistics.
    pub const fn stats(&self) -> &BusStats {
        &self.stats
    }

    /// Whether any line was written back during the last access.
    pub const fn flushed(&self) -> bool {
        self.flushed
    }

    /// Clears the flushed flag.
    pub const fn reset_flushed(&mut self) {
        self.flushed = false;
    }

    /// Processor read of `addr` on cache `cache`.
    ///
    /// # Errors
    ///
    /// See [`MemoryBus::access`].
    pub fn pr_rd(&mut self, cache: usize, addr: Addr) -> Result<AccessOutcome, CoherenceError> {
        self.access(cache, AccessType::Read, addr)
    }

    /// Processor write of `addr` on cache `cache`.
    ///
    /// # Errors
    ///
    /// See [`MemoryBus::access`].
    pub fn pr_wr(&mut self, cache: usize, addr: Addr) -> Result<AccessOutcome, CoherenceError> {
        self.access(cache, AccessType::Write, addr)
    }

    /// Runs one processor access to completion.
    ///
    /// The flushed flag is cleared first, so the returned outcome describes this
    /// access only.
    ///
    /// # Errors
    ///
    /// Returns [`CoherenceError::UnknownCache`] for an id not on the bus, or any
    /// protocol violation raised during the access.
    pub fn access(
        &mut self,
        cache: usize,
        kind: AccessType,
        addr: Addr,
    ) -> Result<AccessOutcome, CoherenceError> {
        let count = self.caches.len();
        if cache >= count {
            return Err(CoherenceError::UnknownCache { cache, count });
        }
        self.flushed = false;

        let (before, rest) = self.caches.split_at_mut(cache);
        let Some((accessor, after)) = rest.split_first_mut() else {
            return Err(CoherenceError::UnknownCache { cache, count });
        };
        let mut siblings = Siblings {
            before,
            after,
            flushed: &mut self.flushed,
            stats: &mut self.stats,
        };
        let hit = accessor.access(kind, addr, &mut siblings)?;

        Ok(AccessOutcome {
            hit,
            flushed: self.flushed,
        })
    }

    /// Checks the coherence invariants for the line of `addr` across all caches.
    ///
    /// * No cache holds the line in two ways.
    /// * At most one cache holds it Modified or Exclusive.
    /// * No cache holds it Shared while another holds it Modified or Exclusive.
    ///
    /// # Errors
    ///
    /// Returns [`CoherenceError::InvariantBroken`] describing the first violation.
    pub fn check_coherence(&self, addr: Addr) -> Result<(), CoherenceError> {
        let mut owners = Vec::new();
        let mut sharers = Vec::new();
        for cache in &self.caches {
            if cache.copies_of(addr) > 1 {
                return Err(broken(addr, format!("cache {} holds the line twice", cache.id())));
            }
            match cache.state_of(addr) {
                LineState::Modified | LineState::Exclusive => owners.push(cache.id()),
                LineState::Shared => sharers.push(cache.id()),
                LineState::Invalid => {}
            }
        }

        if owners.len() > 1 {
            return Err(broken(addr, format!("caches {owners:?} all own the line")));
        }
        if let &[owner] = owners.as_slice() {
            if !sharers.is_empty() {
                warn!(%addr, owner, ?sharers, "stale sharers");
                return Err(broken(
                    addr,
                    format!("cache {owner} owns the line while {sharers:?} share it"),
                ));
            }
        }
        Ok(())
    }
}

fn broken(addr: Addr, detail: String) -> CoherenceError {
    CoherenceError::InvariantBroken { addr, detail }
}
