//! # Simulator Tests
//!
//! Drives whole traces through `Simulator` and checks the run summary, error
//! reporting with access indices, and the statistics report.

use cohsim_core::Simulator;
use cohsim_core::common::{Addr, CoherenceError, ConfigError, SimError, TraceError};
use cohsim_core::config::{Config, Protocol};
use cohsim_core::sim::RunSummary;
use cohsim_core::sim::trace::{self, Access};
use pretty_assertions::assert_eq;

use crate::common::harness::{cache_config, checked_config, init_tracing};

fn simulator(num_caches: usize, protocol: Protocol) -> Simulator {
    init_tracing();
    Simulator::new(checked_config(cache_config(num_caches, 2, 1, protocol))).unwrap()
}

fn run(sim: &mut Simulator, text: &str) -> Result<RunSummary, SimError> {
    sim.run(trace::parse_str(text)?.into_iter().map(Ok))
}

#[test]
fn test_run_summary() {
    let mut sim = simulator(2, Protocol::MsiUpgr);
    let summary = run(&mut sim, "0 w 0x0\n1 r 0x0\n0 w 0x0\n").unwrap();
    assert_eq!(
        summary,
        RunSummary {
            accesses: 3,
            flushes: 1
        }
    );
    assert_eq!(sim.summary(), summary);
}

#[test]
fn test_runs_accumulate() {
    let mut sim = simulator(2, Protocol::MsiUpgr);
    let _ = run(&mut sim, "0 w 0x0\n").unwrap();
    let second = run(&mut sim, "1 r 0x0\n1 r 0x0\n").unwrap();
    assert_eq!(second.accesses, 2);
    assert_eq!(second.flushes, 1);
    assert_eq!(sim.summary().accesses, 3);
}

#[test]
fn test_stats_report() {
    let mut sim = simulator(3, Protocol::MsiUpgr);
    let _ = run(&mut sim, "0 w 0x0\n1 r 0x0\n0 w 0x0\n").unwrap();

    let report = sim.stats_report();
    let lines: Vec<_> = report.lines().collect();
    assert_eq!(
        lines,
        vec![
            "I->S,I->E,I->M,S->I,S->E,S->M,E->I,E->S,E->M,M->I,M->S,M->E,hits,misses,writebacks",
            "0,0,1,0,0,1,0,0,0,0,1,0,1,1,1",
            "1,0,0,1,0,0,0,0,0,0,0,0,0,1,0",
            "BusRd,BusRdX,BusUpgr,copies_exist,flushes",
            "1,1,1,2,1",
        ]
    );
}

#[test]
fn test_step_outcome() {
    let mut sim = simulator(2, Protocol::Mesi);
    let first = sim.step(Access::read(0, 0x100)).unwrap();
    assert!(!first.hit);
    let second = sim.step(Access::write(0, 0x100)).unwrap();
    assert!(second.hit);
    assert_eq!(sim.bus().stats().total_messages(), 1);
}

#[test]
fn test_unknown_cache_reports_index() {
    let mut sim = simulator(2, Protocol::MsiUpgr);
    match run(&mut sim, "0 r 0x0\n1 r 0x0\n2 r 0x0\n0 r 0x40\n") {
        Err(SimError::Coherence { index, source }) => {
            assert_eq!(index, 2);
            assert_eq!(source, CoherenceError::UnknownCache { cache: 2, count: 2 });
        }
        other => panic!("expected a coherence error, got {other:?}"),
    }
    assert_eq!(sim.summary().accesses, 2);
}

#[test]
fn test_address_out_of_range() {
    let mut sim = simulator(1, Protocol::MsiUpgr);
    let err = sim.step(Access::read(0, 1 << 32)).unwrap_err();
    assert!(matches!(
        err,
        SimError::AddressOutOfRange {
            index: 0,
            addr: Addr(0x1_0000_0000),
            bits: 32
        }
    ));
    assert_eq!(sim.summary().accesses, 0);
}

#[test]
fn test_trace_error_stops_run() {
    let mut sim = simulator(1, Protocol::MsiUpgr);
    let reader = trace::TraceReader::new("0 r 0x0\n0 z 0x0\n0 r 0x40\n".as_bytes());
    assert!(matches!(
        sim.run(reader),
        Err(SimError::Trace(TraceError::Malformed { line: 2, .. }))
    ));
    assert_eq!(sim.summary().accesses, 1);
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = Config::default();
    config.cache.num_sets = 3;
    assert!(matches!(
        Simulator::new(config),
        Err(SimError::Config(ConfigError::NotPowerOfTwo { field: "num_sets", .. }))
    ));
}

#[test]
fn test_long_trace_with_checks() {
    let mut sim = Simulator::new(checked_config(cache_config(4, 2, 4, Protocol::Mesi))).unwrap();
    let accesses: Vec<_> = (0..400u64)
        .map(|i| {
            let cache = (i * 7 % 4) as usize;
            let addr = (i * 13 % 24) * 64;
            if i % 3 == 0 {
                Access::write(cache, addr)
            } else {
                Access::read(cache, addr)
            }
        })
        .collect();
    let summary = sim.run(accesses.into_iter().map(Ok)).unwrap();
    assert_eq!(summary.accesses, 400);

    let total: u64 = sim.bus().caches().iter().map(|c| c.stats().accesses()).sum();
    assert_eq!(total, 400);
    assert_eq!(sim.config().cache.num_caches, 4);
}
