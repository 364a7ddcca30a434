//! MSI with `BusUpgr`.
//!
//! | Event   | Invalid              | Shared               | Modified          |
//! |---------|----------------------|----------------------|-------------------|
//! | PrRd    | BusRd → Shared       | hit                  | hit               |
//! | PrWr    | BusRdX → Modified    | BusUpgr → Modified   | hit               |
//! | BusRd   | -                    | stay Shared          | flush → Shared    |
//! | BusRdX  | -                    | → Invalid            | flush → Invalid   |
//! | BusUpgr | -                    | → Invalid            | violation         |
//!
//! A write hit on a Shared line already holds valid data, so it only needs other
//! copies invalidated: the upgrade broadcast carries no data.

use super::{BusRequester, CoherenceProtocol, illegal, violation};
use crate::cache::line::LineState;
use crate::common::data::BusMsg;
use crate::common::error::CoherenceError;

const NAME: &str = "MSIUpgr";

/// The MSI with `BusUpgr` message coherence protocol.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsiUpgr;

impl CoherenceProtocol for MsiUpgr {
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
            LineState::Invalid => {
                let _ = bus.issue(BusMsg::BusRdX)?;
                *state = LineState::Modified;
            }
            LineState::Shared => {
                let _ = bus.issue(BusMsg::BusUpgr)?;
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
            LineState::Shared => {
                *state = LineState::Invalid;
                Ok(false)
            }
            // The upgrader holds Shared, so no other cache may hold Modified.
            LineState::Modified => Err(violation(NAME, BusMsg::BusUpgr, *state)),
            LineState::Exclusive => Err(illegal(NAME, *state)),
        }
    }

    fn is_write_back_needed(&self, state: LineState) -> bool {
        state == LineState::Modified
    }
}
