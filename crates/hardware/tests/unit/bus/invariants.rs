//! # Coherence Invariant Properties
//!
//! Random access sequences over a small, heavily conflicting geometry, run under
//! every protocol and replacement policy. After every access:
//! - at most one cache owns the line, and never alongside a sharer;
//! - a writer holds the line Modified and every other copy is gone;
//! - a reader holds a valid copy.
//!
//! At the end, per-cache counters must agree with the bus counters.

use cohsim_core::MemoryBus;
use cohsim_core::cache::line::LineState;
use cohsim_core::common::{AccessType, BusMsg};
use cohsim_core::config::{CacheConfig, Protocol, ReplacementPolicy};
use proptest::prelude::*;
use proptest::sample::select;

use crate::common::harness::{cache_config, line};

const CACHES: usize = 4;
const LINES: u64 = 12;

fn access() -> impl Strategy<Value = (usize, AccessType, u64)> {
    (
        0..CACHES,
        prop_oneof![Just(AccessType::Read), Just(AccessType::Write)],
        0..LINES,
    )
}

fn config() -> impl Strategy<Value = CacheConfig> {
    (
        select(vec![Protocol::Msi, Protocol::MsiUpgr, Protocol::Mesi]),
        select(vec![
            ReplacementPolicy::Lru,
            ReplacementPolicy::Fifo,
            ReplacementPolicy::Plru,
            ReplacementPolicy::Random,
        ]),
        any::<u64>(),
    )
        .prop_map(|(protocol, policy, seed)| CacheConfig {
            policy,
            seed,
            ..cache_config(CACHES, 2, 2, protocol)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn coherence_holds_after_every_access(
        config in config(),
        trace in prop::collection::vec(access(), 1..200),
    ) {
        let mut bus = MemoryBus::new(&config).unwrap();
        let mut issued = [0u64; CACHES];

        for &(cache, kind, n) in &trace {
            let addr = line(n);
            let outcome = bus.access(cache, kind, addr);
            prop_assert!(outcome.is_ok(), "{:?} failed: {:?}", (cache, kind, addr), outcome);
            issued[cache] += 1;

            for other in 0..LINES {
                let checked = bus.check_coherence(line(other));
                prop_assert!(checked.is_ok(), "{:?}", checked);
            }

            let states: Vec<_> = bus.caches().iter().map(|c| c.state_of(addr)).collect();
            match kind {
                AccessType::Write => {
                    prop_assert_eq!(states[cache], LineState::Modified);
                    for (id, state) in states.iter().enumerate() {
                        if id != cache {
                            prop_assert_eq!(*state, LineState::Invalid);
                        }
                    }
                }
                AccessType::Read => prop_assert!(states[cache].is_valid()),
            }
            if config.protocol != Protocol::Mesi {
                prop_assert!(!states.contains(&LineState::Exclusive));
            }
        }

        let mut writebacks = 0;
        for cache in bus.caches() {
            let stats = cache.stats();
            prop_assert_eq!(stats.accesses(), issued[cache.id()]);
            writebacks += stats.writebacks;
        }
        prop_assert_eq!(writebacks, bus.stats().flushes);
        if config.protocol == Protocol::Msi {
            prop_assert_eq!(bus.stats().messages(BusMsg::BusUpgr), 0);
        }
    }

    /// Repeating an access from the same cache always hits and never touches the bus.
    #[test]
    fn repeated_access_is_local(
        config in config(),
        prefix in prop::collection::vec(access(), 0..50),
        (cache, kind, n) in access(),
    ) {
        let mut bus = MemoryBus::new(&config).unwrap();
        for &(c, k, l) in &prefix {
            let _ = bus.access(c, k, line(l)).unwrap();
        }
        let _ = bus.access(cache, kind, line(n)).unwrap();

        let before = bus.stats().total_messages();
        let again = bus.access(cache, kind, line(n)).unwrap();
        prop_assert!(again.hit);
        prop_assert!(!again.flushed);
        prop_assert_eq!(bus.stats().total_messages(), before);
    }
}
