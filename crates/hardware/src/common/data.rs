//! Access and bus message types.
//!
//! This module defines the events that drive the coherence state machines:
//! 1. **Processor accesses:** `AccessType` distinguishes `PrRd` from `PrWr`.
//! 2. **Snoop traffic:** `BusMsg` lists the messages a cache may broadcast.

use std::fmt;

/// Type of processor access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessType {
    /// Processor read (`PrRd`).
    Read,

    /// Processor write (`PrWr`).
    Write,
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "PrRd",
            Self::Write => "PrWr",
        })
    }
}

/// Message broadcast on the shared bus and snooped by every other cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BusMsg {
    /// Read-shared request; a Modified holder must flush and demote.
    BusRd,

    /// Read-exclusive request; every other copy is invalidated.
    BusRdX,

    /// Upgrade-to-exclusive without data transfer; the requester already holds valid data.
    BusUpgr,
}

impl BusMsg {
    /// All bus messages, in statistics order.
    pub const ALL: [Self; 3] = [Self::BusRd, Self::BusRdX, Self::BusUpgr];

    /// Returns the position of this message in [`BusMsg::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Self::BusRd => 0,
            Self::BusRdX => 1,
            Self::BusUpgr => 2,
        }
    }
}

impl fmt::Display for BusMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BusRd => "BusRd",
            Self::BusRdX => "BusRdX",
            Self::BusUpgr => "BusUpgr",
        })
    }
}
