//! MESI.
//!
//! | Event   | Invalid                          | Shared             | Exclusive      | Modified        |
//! |---------|----------------------------------|--------------------|----------------|-----------------|
//! | PrRd    | BusRd → Shared / Exclusive       | hit                | hit            | hit             |
//! | PrWr    | BusRdX → Modified                | BusUpgr → Modified | → Modified     | hit             |
//! | BusRd   | -                                | stay Shared        | → Shared       | flush → Shared  |
//! | BusRdX  | -                                | → Invalid          | → Invalid      | flush → Invalid |
//! | BusUpgr | -                                | → Invalid          | violation      | violation       |
//!
//! A read miss installs Exclusive only when no sibling asserted COPIES-EXIST, which
//! is why the requester's transition waits for the broadcast to finish.

use super::{BusRequester, CoherenceProtocol, violation};
use crate::cache::line::LineState;
use crate::common::data::BusMsg;
use crate::common::error::CoherenceError;

const NAME: &str = "MESI";

/// The MESI coherence protocol.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mesi;

impl CoherenceProtocol for Mesi {
    fn name(&self) -> &'static str {
        NAME
    }

    fn pr_rd(&self, state: &mut LineState, bus: &mut dyn BusRequester) -> Result<(), CoherenceError> {
        if *state == LineState::Invalid {
            let copies_exist = bus.issue(BusMsg::BusRd)?;
            *state = if copies_exist {
                LineState::Shared
            } else {
                LineState::Exclusive
            };
        }
        Ok(())
    }

    fn pr_wr(&self, state: &mut LineState, bus: &mut dyn BusRequester) -> Result<(), CoherenceError> {
        match *state {
            LineState::Invalid => {
                let _ = bus.issue(BusMsg::BusRdX)?;
            }
            LineState::Shared => {
                let _ = bus.issue(BusMsg::BusUpgr)?;
            }
            LineState::Exclusive | LineState::Modified => {}
        }
        *state = LineState::Modified;
        Ok(())
    }

    fn bus_rd(&self, state: &mut LineState) -> Result<bool, CoherenceError> {
        let flushed = *state == LineState::Modified;
        if state.is_valid() {
            *state = LineState::Shared;
        }
        Ok(flushed)
    }

    fn bus_rdx(&self, state: &mut LineState) -> Result<bool, CoherenceError> {
        let flushed = *state == LineState::Modified;
        *state = LineState::Invalid;
        Ok(flushed)
    }

    fn bus_upgr(&self, state: &mut LineState) -> Result<bool, CoherenceError> {
        match *state {
            LineState::Invalid => Ok(false),
            LineState::Shared => {
                *state = LineState::Invalid;
                Ok(false)
            }
            LineState::Exclusive | LineState::Modified => {
                Err(violation(NAME, BusMsg::BusUpgr, *state))
            }
        }
    }

    fn is_write_back_needed(&self, state: LineState) -> bool {
        state == LineState::Modified
    }
}
