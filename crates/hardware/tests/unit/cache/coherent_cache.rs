//! # Coherent Cache Tests
//!
//! Exercises a single `Cache` against a mocked bus port: lookups and allocation,
//! the messages it broadcasts, eviction writebacks, snoop handling, and the
//! bookkeeping of the access in flight.

use cohsim_core::Cache;
use cohsim_core::cache::SnoopReply;
use cohsim_core::cache::line::LineState;
use cohsim_core::common::{Addr, BusMsg, CoherenceError};
use cohsim_core::config::{CacheConfig, Protocol};
use mockall::predicate::eq;

use crate::common::harness::{cache_config, line};
use crate::common::mocks::bus::MockPort;

fn cache(protocol: Protocol) -> Cache {
    Cache::new(0, &cache_config(2, 2, 4, protocol)).unwrap()
}

/// Port that expects exactly `msgs` broadcasts in order, each answered with `reply`.
fn expect_broadcasts(msgs: &[BusMsg], reply: bool) -> MockPort {
    let mut port = MockPort::new();
    let mut seq = mockall::Sequence::new();
    for &msg in msgs {
        let _ = port
            .expect_broadcast()
            .with(eq(0), eq(msg), mockall::predicate::always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_, _, _| Ok(reply));
    }
    port
}

#[test]
fn test_read_miss_issues_bus_rd() {
    let mut cache = cache(Protocol::MsiUpgr);
    let mut port = MockPort::new();
    let _ = port
        .expect_broadcast()
        .with(eq(0), eq(BusMsg::BusRd), eq(Addr(0x1040)))
        .times(1)
        .returning(|_, _, _| Ok(false));

    let hit = cache.receive_pr_rd(Addr(0x1040), &mut port).unwrap();
    assert!(!hit);
    assert_eq!(cache.state_of(Addr(0x1040)), LineState::Shared);
    assert_eq!(cache.stats().misses, 1);
    assert_eq!(cache.stats().transitions(LineState::Invalid, LineState::Shared), 1);
}

#[test]
fn test_read_hit_is_silent() {
    let mut cache = cache(Protocol::MsiUpgr);
    let mut port = expect_broadcasts(&[BusMsg::BusRd], false);
    assert!(!cache.receive_pr_rd(line(1), &mut port).unwrap());
    // Same line, different byte.
    assert!(cache.receive_pr_rd(Addr(line(1).val() + 8), &mut port).unwrap());
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(cache.stats().misses, 1);
}

#[test]
fn test_write_miss_then_upgrade() {
    let mut cache = cache(Protocol::MsiUpgr);
    let mut port = expect_broadcasts(&[BusMsg::BusRd, BusMsg::BusUpgr], true);
    let _ = cache.receive_pr_rd(line(2), &mut port).unwrap();
    let hit = cache.receive_pr_wr(line(2), &mut port).unwrap();
    assert!(hit);
    assert_eq!(cache.state_of(line(2)), LineState::Modified);
    assert_eq!(cache.stats().transitions(LineState::Shared, LineState::Modified), 1);
}

#[test]
fn test_plain_msi_write_hit_reissues_bus_rdx() {
    let mut cache = cache(Protocol::Msi);
    let mut port = expect_broadcasts(&[BusMsg::BusRd, BusMsg::BusRdX], true);
    let _ = cache.receive_pr_rd(line(2), &mut port).unwrap();
    let _ = cache.receive_pr_wr(line(2), &mut port).unwrap();
    assert_eq!(cache.state_of(line(2)), LineState::Modified);
}

#[test]
fn test_mesi_read_state_follows_copies_exist() {
    let mut alone = cache(Protocol::Mesi);
    let mut port = expect_broadcasts(&[BusMsg::BusRd], false);
    let _ = alone.receive_pr_rd(line(3), &mut port).unwrap();
    assert_eq!(alone.state_of(line(3)), LineState::Exclusive);

    let mut shared = cache(Protocol::Mesi);
    let mut port = expect_broadcasts(&[BusMsg::BusRd], true);
    let _ = shared.receive_pr_rd(line(3), &mut port).unwrap();
    assert_eq!(shared.state_of(line(3)), LineState::Shared);
}

#[test]
fn test_mesi_exclusive_write_is_silent() {
    let mut cache = cache(Protocol::Mesi);
    let mut port = expect_broadcasts(&[BusMsg::BusRd], false);
    let _ = cache.receive_pr_rd(line(3), &mut port).unwrap();
    assert!(cache.receive_pr_wr(line(3), &mut port).unwrap());
    assert_eq!(cache.state_of(line(3)), LineState::Modified);
    assert_eq!(cache.stats().transitions(LineState::Exclusive, LineState::Modified), 1);
}

#[test]
fn test_evicting_modified_line_signals_flush() {
    let config = CacheConfig {
        assoc: 1,
        ..cache_config(2, 1, 1, Protocol::MsiUpgr)
    };
    let mut cache = Cache::new(0, &config).unwrap();
    let mut port = expect_broadcasts(&[BusMsg::BusRdX, BusMsg::BusRd], false);
    let _ = port.expect_signal_flush().times(1).return_const(());

    let _ = cache.receive_pr_wr(line(0), &mut port).unwrap();
    let _ = cache.receive_pr_rd(line(1), &mut port).unwrap();

    assert_eq!(cache.state_of(line(0)), LineState::Invalid);
    assert_eq!(cache.state_of(line(1)), LineState::Shared);
    assert_eq!(cache.stats().writebacks, 1);
}

#[test]
fn test_evicting_clean_line_is_silent() {
    let mut cache = Cache::new(0, &cache_config(2, 1, 1, Protocol::MsiUpgr)).unwrap();
    // No signal_flush expectation: a call would fail the test.
    let mut port = expect_broadcasts(&[BusMsg::BusRd, BusMsg::BusRd], false);
    let _ = cache.receive_pr_rd(line(0), &mut port).unwrap();
    let _ = cache.receive_pr_rd(line(1), &mut port).unwrap();
    assert_eq!(cache.stats().writebacks, 0);
}

#[test]
fn test_lru_victim_with_two_ways() {
    let mut cache = Cache::new(0, &cache_config(2, 2, 1, Protocol::MsiUpgr)).unwrap();
    let mut port = expect_broadcasts(&[BusMsg::BusRd; 4], false);
    let _ = cache.receive_pr_rd(line(0), &mut port).unwrap();
    let _ = cache.receive_pr_rd(line(1), &mut port).unwrap();
    // Hit on line 0 makes line 1 the LRU.
    assert!(cache.receive_pr_rd(line(0), &mut port).unwrap());
    let _ = cache.receive_pr_rd(line(2), &mut port).unwrap();

    assert_eq!(cache.state_of(line(0)), LineState::Shared);
    assert_eq!(cache.state_of(line(1)), LineState::Invalid);
    assert_eq!(cache.state_of(line(2)), LineState::Shared);
    // A miss after the eviction brings line 1 back over line 0.
    let _ = cache.receive_pr_rd(line(1), &mut port).unwrap();
    assert_eq!(cache.state_of(line(0)), LineState::Invalid);
}

#[test]
fn test_snoop_on_absent_line_reports_nothing() {
    let mut cache = cache(Protocol::MsiUpgr);
    let reply = cache.receive_bus_msg(BusMsg::BusRdX, line(5)).unwrap();
    assert_eq!(reply, SnoopReply::default());
    assert_eq!(cache.stats().accesses(), 0);
}

#[test]
fn test_snoop_bus_rd_flushes_modified() {
    let mut cache = cache(Protocol::MsiUpgr);
    let mut port = expect_broadcasts(&[BusMsg::BusRdX], false);
    let _ = cache.receive_pr_wr(line(5), &mut port).unwrap();

    let reply = cache.receive_bus_msg(BusMsg::BusRd, line(5)).unwrap();
    assert_eq!(
        reply,
        SnoopReply {
            present: true,
            flushed: true
        }
    );
    assert_eq!(cache.state_of(line(5)), LineState::Shared);
    assert_eq!(cache.stats().writebacks, 1);
    assert_eq!(cache.stats().transitions(LineState::Modified, LineState::Shared), 1);
}

#[test]
fn test_snoop_bus_upgr_invalidates_shared() {
    let mut cache = cache(Protocol::MsiUpgr);
    let mut port = expect_broadcasts(&[BusMsg::BusRd], true);
    let _ = cache.receive_pr_rd(line(6), &mut port).unwrap();

    let reply = cache.receive_bus_msg(BusMsg::BusUpgr, line(6)).unwrap();
    assert!(reply.present);
    assert!(!reply.flushed);
    assert_eq!(cache.state_of(line(6)), LineState::Invalid);
    assert_eq!(cache.find_line(line(6)), None);
}

#[test]
fn test_bus_upgr_on_modified_is_violation() {
    let mut cache = cache(Protocol::MsiUpgr);
    let mut port = expect_broadcasts(&[BusMsg::BusRdX], false);
    let _ = cache.receive_pr_wr(line(7), &mut port).unwrap();

    let err = cache.receive_bus_msg(BusMsg::BusUpgr, line(7)).unwrap_err();
    assert_eq!(
        err,
        CoherenceError::ProtocolViolation {
            protocol: "MSIUpgr",
            event: BusMsg::BusUpgr,
            state: LineState::Modified,
        }
    );
    assert_eq!(cache.state_of(line(7)), LineState::Modified);
}

#[test]
fn test_issue_outside_access_is_rejected() {
    let cache = cache(Protocol::MsiUpgr);
    let mut port = MockPort::new();
    let err = cache.issue_bus_msg(BusMsg::BusRd, &mut port).unwrap_err();
    assert_eq!(
        err,
        CoherenceError::NoAccessInFlight {
            cache: 0,
            msg: BusMsg::BusRd
        }
    );
}

#[test]
fn test_access_in_flight_cleared_after_error() {
    let mut cache = cache(Protocol::MsiUpgr);
    let mut port = MockPort::new();
    let _ = port
        .expect_broadcast()
        .times(1)
        .returning(|_, _, addr| {
            Err(CoherenceError::InvariantBroken {
                addr,
                detail: "sibling failed".to_string(),
            })
        });

    assert_eq!(cache.current_access(), None);
    assert!(cache.receive_pr_wr(line(8), &mut port).is_err());
    assert_eq!(cache.current_access(), None);
}

#[test]
fn test_line_inspection() {
    let mut cache = cache(Protocol::MsiUpgr);
    let mut port = expect_broadcasts(&[BusMsg::BusRdX], false);
    // Line 5 maps to set 1 in a 4-set cache.
    let _ = cache.receive_pr_wr(line(5), &mut port).unwrap();

    assert_eq!(cache.get_line_state(1, 0), Some(LineState::Modified));
    assert_eq!(cache.get_line_state(1, 1), Some(LineState::Invalid));
    assert_eq!(cache.get_line_state(4, 0), None);
    assert_eq!(cache.get_line_state(0, 2), None);
    assert_eq!(cache.copies_of(line(5)), 1);
    assert_eq!(cache.describe_set(1), "set 1 ages: 0 1");
}

#[test]
fn test_stats_line_only_after_access() {
    let mut cache = cache(Protocol::MsiUpgr);
    assert_eq!(cache.stats_line(), None);

    let mut port = expect_broadcasts(&[BusMsg::BusRd], false);
    let _ = cache.receive_pr_rd(line(0), &mut port).unwrap();
    assert_eq!(
        cache.stats_line().as_deref(),
        Some("1,0,0,0,0,0,0,0,0,0,0,0,0,1,0")
    );
}

#[test]
fn test_protocol_name() {
    assert_eq!(cache(Protocol::Mesi).protocol_name(), "MESI");
    assert_eq!(cache(Protocol::MsiUpgr).id(), 0);
}
