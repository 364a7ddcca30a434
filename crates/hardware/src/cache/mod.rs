//! Coherent Set-Associative Cache.
//!
//! This module implements a private cache attached to a snooping bus. A `Cache`
//! decodes addresses, finds or allocates lines, delegates victim choice to its
//! replacement policy and state changes to its coherence protocol, and answers the
//! bus messages other caches broadcast.
//!
//! A cache never references its siblings. Bus traffic flows through a [`BusPort`]
//! handed in for the duration of one processor access; the bus implements it over
//! every cache except the one performing the access.

/// Line records and the set/way array holding them.
pub mod line;

/// Cache replacement policy implementations (LRU, FIFO, PLRU, Random).
pub mod policies;

use tracing::{debug, trace};

use self::line::{CacheLine, LineState, LineStore};
use self::policies::{FifoPolicy, LruPolicy, PlruPolicy, RandomPolicy, ReplacementPolicy};
use crate::coherence::{self, BusRequester, CoherenceProtocol};
use crate::common::addr::{Addr, AddressLayout};
use crate::common::data::{AccessType, BusMsg};
use crate::common::error::{CoherenceError, ConfigError};
use crate::config::{CacheConfig, ReplacementPolicy as PolicyType};
use crate::stats::CacheStats;

/// The bus as seen by one cache during one of its processor accesses.
pub trait BusPort {
    /// Broadcasts `msg` for `addr` from cache `from` to every other cache.
    ///
    /// # Returns
    ///
    /// `true` if any other cache held the line (COPIES-EXIST).
    ///
    /// # Errors
    ///
    /// Propagates the first [`CoherenceError`] raised by a snooping cache.
    fn broadcast(&mut self, from: usize, msg: BusMsg, addr: Addr) -> Result<bool, CoherenceError>;

    /// Raises the bus's flushed flag for a writeback performed by the accessing cache.
    fn signal_flush(&mut self);
}

/// A cache's answer to a snooped bus message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SnoopReply {
    /// The line was resident (contributes to COPIES-EXIST).
    pub present: bool,
    /// The line was written back while handling the message.
    pub flushed: bool,
}

/// A private L1 cache with a coherence protocol and a replacement policy.
#[derive(Debug)]
pub struct Cache {
    id: usize,
    layout: AddressLayout,
    lines: LineStore,
    protocol: Box<dyn CoherenceProtocol>,
    policy: Box<dyn ReplacementPolicy>,
    stats: CacheStats,
    /// Address of the processor access in flight.
    ///
    /// Only `Some` between the start and the end of `receive_pr_rd`/`receive_pr_wr`,
    /// including the whole cascade of bus messages they trigger. Accesses never
    /// interleave, so this never outlives the access that set it.
    current_access: Option<Addr>,
}

/// Binds the access in flight to the bus for the protocol.
struct AccessRequester<'a> {
    cache: usize,
    current_access: Option<Addr>,
    port: &'a mut dyn BusPort,
}

impl BusRequester for AccessRequester<'_> {
    fn issue(&mut self, msg: BusMsg) -> Result<bool, CoherenceError> {
        issue(self.cache, self.current_access, msg, &mut *self.port)
    }
}

/// Broadcasts `msg` for the access in flight.
fn issue(
    cache: usize,
    current_access: Option<Addr>,
    msg: BusMsg,
    port: &mut dyn BusPort,
) -> Result<bool, CoherenceError> {
    let addr = current_access.ok_or(CoherenceError::NoAccessInFlight { cache, msg })?;
    let copies_exist = port.broadcast(cache, msg, addr)?;
    debug!(cache, %msg, %addr, copies_exist, "bus message");
    Ok(copies_exist)
}

impl Cache {
    /// Creates a cache with every line Invalid.
    ///
    /// # Arguments
    ///
    /// * `id` - Index of this cache on the bus.
    /// * `config` - Geometry, protocol and replacement policy.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the geometry is invalid.
    pub fn new(id: usize, config: &CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let layout = config.layout()?;
        let (sets, ways) = (config.num_sets, config.assoc);

        let policy: Box<dyn ReplacementPolicy> = match config.policy {
            PolicyType::Lru => Box::new(LruPolicy::new(sets, ways)),
            PolicyType::Fifo => Box::new(FifoPolicy::new(sets, ways)),
            PolicyType::Plru => Box::new(PlruPolicy::new(sets, ways)),
            // Distinct streams per cache from one configured seed.
            PolicyType::Random => Box::new(RandomPolicy::new(
                ways,
                config.seed.wrapping_add(id as u64),
            )),
        };

        Ok(Self {
            id,
            layout,
            lines: LineStore::new(sets, ways),
            protocol: coherence::build(config.protocol),
            policy,
            stats: CacheStats::default(),
            current_access: None,
        })
    }

    /// Index of this cache on the bus.
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Address layout used by this cache.
    pub const fn layout(&self) -> &AddressLayout {
        &self.layout
    }

    /// Runtime statistics.
    pub const fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Name of the coherence protocol in use.
    pub fn protocol_name(&self) -> &'static str {
        self.protocol.name()
    }

    /// Address of the processor access in flight, if any.
    pub const fn current_access(&self) -> Option<Addr> {
        self.current_access
    }

    /// Handles a processor read.
    ///
    /// # Arguments
    ///
    /// * `addr` - The address accessed.
    /// * `port` - The bus, excluding this cache.
    ///
    /// # Returns
    ///
    /// `true` on a hit.
    ///
    /// # Errors
    ///
    /// Returns a [`CoherenceError`] if this cache or a sibling breaks the protocol.
    pub fn receive_pr_rd(&mut self, addr: Addr, port: &mut dyn BusPort) -> Result<bool, CoherenceError> {
        self.access(AccessType::Read, addr, port)
    }

    /// Handles a processor write.
    ///
    /// # Arguments
    ///
    /// * `addr` - The address accessed.
    /// * `port` - The bus, excluding this cache.
    ///
    /// # Returns
    ///
    /// `true` on a hit.
    ///
    /// # Errors
    ///
    /// Returns a [`CoherenceError`] if this cache or a sibling breaks the protocol.
    pub fn receive_pr_wr(&mut self, addr: Addr, port: &mut dyn BusPort) -> Result<bool, CoherenceError> {
        self.access(AccessType::Write, addr, port)
    }

    /// Handles a processor access of either kind.
    ///
    /// # Errors
    ///
    /// See [`Cache::receive_pr_rd`].
    pub fn access(
        &mut self,
        kind: AccessType,
        addr: Addr,
        port: &mut dyn BusPort,
    ) -> Result<bool, CoherenceError> {
        self.current_access = Some(addr);
        let result = self.perform(kind, addr, port);
        self.current_access = None;
        result
    }

    fn perform(&mut self, kind: AccessType, addr: Addr, port: &mut dyn BusPort) -> Result<bool, CoherenceError> {
        let set = self.layout.set_index(addr);
        let (way, hit) = match self.find_line(addr) {
            Some(way) => (way, true),
            None => (self.allocate(addr, port), false),
        };

        let line = self.lines.line_mut(set, way);
        let before = line.state;
        let mut requester = AccessRequester {
            cache: self.id,
            current_access: self.current_access,
            port,
        };
        self.protocol.on_access(kind, &mut line.state, &mut requester)?;
        let after = line.state;

        self.policy.touch(set, way);
        self.stats.record_transition(before, after);
        self.stats.record_access(hit);
        debug!(
            cache = self.id,
            %kind,
            %addr,
            set,
            way,
            hit,
            "{} -> {}",
            before,
            after
        );
        Ok(hit)
    }

    /// Broadcasts `msg` for the access currently in flight.
    ///
    /// # Returns
    ///
    /// `true` if any other cache asserted COPIES-EXIST.
    ///
    /// # Errors
    ///
    /// Returns [`CoherenceError::NoAccessInFlight`] when called outside a processor
    /// access, or any error raised by a snooping cache.
    pub fn issue_bus_msg(&self, msg: BusMsg, port: &mut dyn BusPort) -> Result<bool, CoherenceError> {
        issue(self.id, self.current_access, msg, port)
    }

    /// Handles a message broadcast by another cache.
    ///
    /// Absent lines are left alone and report no hit. Resident lines go through the
    /// protocol, which may flush them.
    ///
    /// # Errors
    ///
    /// Returns a [`CoherenceError`] if the protocol forbids `msg` in the line's state.
    pub fn receive_bus_msg(&mut self, msg: BusMsg, addr: Addr) -> Result<SnoopReply, CoherenceError> {
        let Some(way) = self.find_line(addr) else {
            return Ok(SnoopReply::default());
        };
        let set = self.layout.set_index(addr);
        let line = self.lines.line_mut(set, way);
        let before = line.state;
        let flushed = self.protocol.on_bus_msg(msg, &mut line.state)?;
        let after = line.state;

        if flushed {
            self.stats.writebacks += 1;
        }
        self.stats.record_transition(before, after);
        trace!(cache = self.id, %msg, %addr, flushed, "snoop {} -> {}", before, after);
        Ok(SnoopReply {
            present: true,
            flushed,
        })
    }

    /// Locates the way holding `addr`, if resident.
    pub fn find_line(&self, addr: Addr) -> Option<usize> {
        self.lines
            .find(self.layout.set_index(addr), self.layout.tag(addr))
    }

    /// Claims a way for `addr`, writing back the victim if the protocol requires it.
    ///
    /// The claimed line carries the new tag and is left Invalid for the protocol to
    /// transition.
    fn allocate(&mut self, addr: Addr, port: &mut dyn BusPort) -> usize {
        let set = self.layout.set_index(addr);
        let way = self.policy.get_victim(set);
        let victim = self.lines.line_mut(set, way);

        if self.protocol.is_write_back_needed(victim.state) {
            port.signal_flush();
            self.stats.writebacks += 1;
            debug!(
                cache = self.id,
                set,
                way,
                victim = %self.layout.line_base(victim.tag, set),
                "writeback on eviction"
            );
        }
        trace!(cache = self.id, set, way, "{}", self.policy.describe_set(set));

        *victim = CacheLine {
            tag: self.layout.tag(addr),
            state: LineState::Invalid,
        };
        way
    }

    /// State of `addr` in this cache, `Invalid` if absent.
    pub fn state_of(&self, addr: Addr) -> LineState {
        let set = self.layout.set_index(addr);
        self.find_line(addr)
            .map_or(LineState::Invalid, |way| self.lines.set(set)[way].state)
    }

    /// Number of valid ways holding the line of `addr`; more than one is a broken invariant.
    pub fn copies_of(&self, addr: Addr) -> usize {
        let tag = self.layout.tag(addr);
        self.lines
            .set(self.layout.set_index(addr))
            .iter()
            .filter(|line| line.holds(tag))
            .count()
    }

    /// State of the line at (`set_idx`, `way_idx`), or `None` outside the geometry.
    pub fn get_line_state(&self, set_idx: usize, way_idx: usize) -> Option<LineState> {
        self.lines.get(set_idx, way_idx).map(|line| line.state)
    }

    /// Replacement policy state of one set, for debugging.
    pub fn describe_set(&self, set_idx: usize) -> String {
        self.policy.describe_set(set_idx)
    }

    /// Headerless CSV statistics, or `None` if the cache was never accessed.
    pub fn stats_line(&self) -> Option<String> {
        (self.stats.accesses() > 0).then(|| self.stats.csv_row())
    }

    /// Prints [`Cache::stats_line`] to stdout; prints nothing for an unused cache.
    pub fn print_stats(&self) {
        if let Some(line) = self.stats_line() {
            println!("{line}");
        }
    }
}
