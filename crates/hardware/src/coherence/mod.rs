//! Snooping coherence protocols.
//!
//! A protocol is a pure state machine over one line's [`LineState`]. The owning cache
//! hands it the line state on every processor access and every snooped bus message;
//! the protocol mutates the state in place and, for processor accesses, may broadcast
//! bus messages through a [`BusRequester`] before completing its own transition.
//!
//! # Protocols
//!
//! - `Msi`: Modified/Shared/Invalid; write hits on Shared lines issue `BusRdX`.
//! - `MsiUpgr`: MSI with the data-less `BusUpgr` message for write hits on Shared lines.
//! - `Mesi`: adds Exclusive for lines no other cache holds.

use std::fmt;

use crate::cache::line::LineState;
use crate::common::data::{AccessType, BusMsg};
use crate::common::error::CoherenceError;
use crate::config::Protocol;

/// Plain MSI protocol.
pub mod msi;

/// MSI protocol with the `BusUpgr` message.
pub mod msi_upgr;

/// MESI protocol.
pub mod mesi;

pub use mesi::Mesi;
pub use msi::Msi;
pub use msi_upgr::MsiUpgr;

/// The cache-side handle a protocol uses to put messages on the bus.
///
/// Messages are always issued for the address of the processor access currently in
/// flight; siblings have applied their side of the transaction (invalidations,
/// flushes) by the time `issue` returns.
pub trait BusRequester {
    /// Broadcasts `msg` to every other cache.
    ///
    /// # Returns
    ///
    /// `true` if any other cache asserted COPIES-EXIST.
    ///
    /// # Errors
    ///
    /// Propagates any [`CoherenceError`] raised by a snooping cache.
    fn issue(&mut self, msg: BusMsg) -> Result<bool, CoherenceError>;
}

/// Trait for snooping coherence protocols.
pub trait CoherenceProtocol: fmt::Debug + Send + Sync {
    /// Protocol name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Handles a processor read of a resident or freshly allocated line.
    ///
    /// # Errors
    ///
    /// Returns [`CoherenceError::IllegalState`] if `state` is outside the protocol's
    /// domain, or any error raised while broadcasting.
    fn pr_rd(&self, state: &mut LineState, bus: &mut dyn BusRequester) -> Result<(), CoherenceError>;

    /// Handles a processor write of a resident or freshly allocated line.
    ///
    /// # Errors
    ///
    /// As [`CoherenceProtocol::pr_rd`].
    fn pr_wr(&self, state: &mut LineState, bus: &mut dyn BusRequester) -> Result<(), CoherenceError>;

    /// Handles a snooped `BusRd`.
    ///
    /// # Returns
    ///
    /// `true` if the line was flushed to the bus.
    ///
    /// # Errors
    ///
    /// Returns a [`CoherenceError`] if the protocol forbids `BusRd` in `state`.
    fn bus_rd(&self, state: &mut LineState) -> Result<bool, CoherenceError>;

    /// Handles a snooped `BusRdX`.
    ///
    /// # Returns
    ///
    /// `true` if the line was flushed to the bus.
    ///
    /// # Errors
    ///
    /// Returns a [`CoherenceError`] if the protocol forbids `BusRdX` in `state`.
    fn bus_rdx(&self, state: &mut LineState) -> Result<bool, CoherenceError>;

    /// Handles a snooped `BusUpgr`.
    ///
    /// # Returns
    ///
    /// `true` if the line was flushed to the bus.
    ///
    /// # Errors
    ///
    /// Returns [`CoherenceError::ProtocolViolation`] when the upgrade reaches a line
    /// that cannot coexist with a Shared copy elsewhere.
    fn bus_upgr(&self, state: &mut LineState) -> Result<bool, CoherenceError>;

    /// Returns `true` if a line in `state` must be written back before it is dropped.
    fn is_write_back_needed(&self, state: LineState) -> bool;

    /// Dispatches a processor access to [`pr_rd`](Self::pr_rd) or [`pr_wr`](Self::pr_wr).
    ///
    /// # Errors
    ///
    /// As the dispatched handler.
    fn on_access(
        &self,
        access: AccessType,
        state: &mut LineState,
        bus: &mut dyn BusRequester,
    ) -> Result<(), CoherenceError> {
        match access {
            AccessType::Read => self.pr_rd(state, bus),
            AccessType::Write => self.pr_wr(state, bus),
        }
    }

    /// Dispatches a snooped message to its handler.
    ///
    /// # Errors
    ///
    /// As the dispatched handler.
    fn on_bus_msg(&self, msg: BusMsg, state: &mut LineState) -> Result<bool, CoherenceError> {
        match msg {
            BusMsg::BusRd => self.bus_rd(state),
            BusMsg::BusRdX => self.bus_rdx(state),
            BusMsg::BusUpgr => self.bus_upgr(state),
        }
    }
}

/// Builds the protocol selected by the configuration.
pub fn build(protocol: Protocol) -> Box<dyn CoherenceProtocol> {
    match protocol {
        Protocol::Msi => Box::new(Msi),
        Protocol::MsiUpgr => Box::new(MsiUpgr),
        Protocol::Mesi => Box::new(Mesi),
    }
}

/// Error for an event the protocol table forbids in `state`.
pub(crate) fn violation(
    protocol: &'static str,
    event: BusMsg,
    state: LineState,
) -> CoherenceError {
    CoherenceError::ProtocolViolation {
        protocol,
        event,
        state,
    }
}

/// Error for a state outside the protocol's domain.
pub(crate) const fn illegal(protocol: &'static str, state: LineState) -> CoherenceError {
    CoherenceError::IllegalState { protocol, state }
}
