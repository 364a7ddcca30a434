//! Plain MSI.
//!
//! Identical to `MsiUpgr` except that a write hit on a Shared line re-requests the
//! line with `BusRdX`. `BusUpgr` is never issued, so snooping one is a violation.

use super::{BusRequester, CoherenceProtocol, illegal, violation};
use crate::cache::line::LineState;
use crate::common::data::BusMsg;
use crate::common::error::CoherenceError;

const NAME: &str = "MSI";

/// The plain MSI coherence protocol.
#[derive(Debug, Clone, Copy, Default)]
pub struct Msi;

impl CoherenceProtocol for Msi {
    fn name(&self) -> &'static str {
        NAME
    }

    fn pr_rd(&self, state: &mut LineState, bus: &mut dyn BusRequester) -> Result<(), CoherenceError> {
        match *state {
            LineState::Invalid => {
                let _ = bus.issue(BusMsg::BusRd)?;
                *state = LineState::Shared;
            }
            LineState::Shared | LineState::Modified => {}
            LineState::Exclusive => return Err(illegal(NAME, *state)),
        }
        Ok(())
    }

    fn pr_wr(&self, state: &mut LineState, bus: &mut dyn BusRequester) -> Result<(), CoherenceError> {
        match *state {
            LineState::Invalid | LineState::Shared => {
                let _ = bus.issue(BusMsg::BusRdX)?;
                *state = LineState::Modified;
            }
            LineState::Modified => {}
            LineState::Exclusive => return Err(illegal(NAME, *state)),
        }
        Ok(())
    }

    fn bus_rd(&self, state: &mut LineState) -> Result<bool, CoherenceError> {
        match *state {
            LineState::Invalid | LineState::Shared => Ok(false),
            LineState::Modified => {
                *state = LineState::Shared;
                Ok(true)
            }
            LineState::Exclusive => Err(illegal(NAME, *state)),
        }
    }

    fn bus_rdx(&self, state: &mut LineState) -> Result<bool, CoherenceError> {
        match *state {
            LineState::Invalid => Ok(false),
            LineState::Shared => {
                *state = LineState::Invalid;
                Ok(false)
            }
            LineState::Modified => {
                *state = LineState::Invalid;
                Ok(true)
            }
            LineState::Exclusive => Err(illegal(NAME, *state)),
        }
    }

    fn bus_upgr(&self, state: &mut LineState) -> Result<bool, CoherenceError> {
        match *state {
            LineState::Invalid => Ok(false),
            LineState::Exclusive => Err(illegal(NAME, *state)),
            LineState::Shared | LineState::Modified => {
                Err(violation(NAME, BusMsg::BusUpgr, *state))
            }
        }
    }

    fn is_write_back_needed(&self, state: LineState) -> bool {
        state == LineState::Modified
    }
}
