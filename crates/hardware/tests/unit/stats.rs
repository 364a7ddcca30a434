//! # Statistics Tests
//!
//! Verifies transition bookkeeping, derived rates, and the CSV column layout of
//! the per-cache and bus counters.

use cohsim_core::cache::line::LineState;
use cohsim_core::common::BusMsg;
use cohsim_core::stats::{BusStats, CacheStats, TRANSITIONS};
use pretty_assertions::assert_eq;

#[test]
fn test_transition_columns_cover_every_distinct_pair() {
    assert_eq!(TRANSITIONS.len(), 12);
    for (before, after) in TRANSITIONS {
        assert_ne!(before, after);
    }
    for before in LineState::ALL {
        for after in LineState::ALL {
            let listed = TRANSITIONS.contains(&(before, after));
            assert_eq!(listed, before != after, "{before} -> {after}");
        }
    }
}

#[test]
fn test_cache_csv_header() {
    assert_eq!(
        CacheStats::csv_header(),
        "I->S,I->E,I->M,S->I,S->E,S->M,E->I,E->S,E->M,M->I,M->S,M->E,hits,misses,writebacks"
    );
}

#[test]
fn test_self_transitions_not_counted() {
    let mut stats = CacheStats::default();
    for state in LineState::ALL {
        stats.record_transition(state, state);
    }
    assert_eq!(stats, CacheStats::default());
}

#[test]
fn test_csv_row_follows_header_order() {
    let mut stats = CacheStats::default();
    stats.record_transition(LineState::Invalid, LineState::Exclusive);
    stats.record_transition(LineState::Exclusive, LineState::Modified);
    stats.record_transition(LineState::Exclusive, LineState::Modified);
    stats.record_transition(LineState::Modified, LineState::Exclusive);
    stats.record_access(true);
    stats.record_access(false);
    stats.record_access(false);
    stats.writebacks = 4;

    assert_eq!(stats.csv_row(), "0,1,0,0,0,0,0,0,2,0,0,1,1,2,4");
    assert_eq!(stats.accesses(), 3);
}

#[test]
fn test_hit_rate() {
    let mut stats = CacheStats::default();
    assert!(stats.hit_rate().abs() < f64::EPSILON);
    stats.record_access(true);
    stats.record_access(true);
    stats.record_access(true);
    stats.record_access(false);
    assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
}

#[test]
fn test_bus_stats_csv() {
    let mut stats = BusStats::default();
    stats.record_message(BusMsg::BusRd);
    stats.record_message(BusMsg::BusRd);
    stats.record_message(BusMsg::BusUpgr);
    stats.copies_exist = 1;
    stats.flushes = 2;

    assert_eq!(BusStats::csv_header(), "BusRd,BusRdX,BusUpgr,copies_exist,flushes");
    assert_eq!(stats.csv_row(), "2,0,1,1,2");
    assert_eq!(stats.total_messages(), 3);
    assert_eq!(stats.messages(BusMsg::BusRdX), 0);
}
