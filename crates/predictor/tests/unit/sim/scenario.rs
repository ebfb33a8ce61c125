//! End-to-End Scenario Tests.
//!
//! Drives writes through a bridge with small queues and a two-entry store and
//! checks classification, training, eviction, and the final report.

use pretty_assertions::assert_eq;
use wpred_core::common::PhysAddr;
use wpred_core::predictor::{Fingerprint, PredictionOutcome};

use crate::common::builder::{PC, bridge_config, line, line_with_chunk, write_at};
use crate::common::harness::{TestSim, complete_all, simulation};

/// Sends one write and runs it until its response reached the upstream peer.
fn write_through(sim: &mut TestSim, addr: u64, data: Vec<u8>) -> Option<PredictionOutcome> {
    sim.send_request(write_at(addr, data)).unwrap();
    sim.run_to_completion();
    let outcome = sim.bridge.downstream().received.last().and_then(|(_, p)| p.prediction);
    complete_all(sim);
    outcome
}

#[test]
fn two_entry_store_scenario() {
    let mut sim = simulation(&bridge_config(2, 2, 2));
    let p1 = line(0xA5);
    let p2 = line_with_chunk(0xA5, 2, 0x5A);
    let fp = Fingerprint::of(PhysAddr(0x1000), PC);

    assert_eq!(
        write_through(&mut sim, 0x1000, p1.clone()),
        Some(PredictionOutcome::NonPredicted)
    );
    assert_eq!(
        write_through(&mut sim, 0x1000, p1),
        Some(PredictionOutcome::Correct)
    );
    let tables = sim.bridge.engine().unwrap().tables();
    assert_eq!(tables.lock().unwrap().confidence.get(fp), Some(1));

    assert_eq!(
        write_through(&mut sim, 0x1000, p2),
        Some(PredictionOutcome::AddressOnly)
    );
    assert_eq!(tables.lock().unwrap().confidence.get(fp), Some(0));

    {
        let guard = tables.lock().unwrap();
        let held: Vec<_> = guard
            .store
            .lookup(PhysAddr(0x1000))
            .iter()
            .map(|e| e.data()[16])
            .collect();
        assert_eq!(held, vec![0xA5, 0x5A]);
        assert_eq!(guard.store.evictions(), 1);
    }

    let engine_stats = sim.bridge.engine().unwrap().stats();
    assert_eq!(engine_stats.capacity_evictions, 1);
    assert_eq!(engine_stats.total_writes, 3);

    let stats = sim.bridge.stats();
    assert_eq!(stats.requests_accepted, 3);
    assert_eq!(stats.requests_forwarded, 3);
    assert_eq!(stats.responses_forwarded, 3);
    assert_eq!(sim.bridge.reserved_responses(), 0);
    assert_eq!(sim.bridge.upstream().received.len(), 3);
}

#[test]
fn burst_is_throttled_but_never_lost() {
    let mut sim = simulation(&bridge_config(2, 2, 64));
    let mut pending: Vec<u64> = (0..10).map(|i| 0x1000 + i * 64).collect();
    pending.reverse();

    let mut refusals = 0;
    while let Some(addr) = pending.pop() {
        match sim.send_request(write_at(addr, line(addr as u8))) {
            Ok(()) => {}
            Err(err) => {
                refusals += 1;
                pending.push(err.into_packet().unwrap().addr.val());
                complete_all(&mut sim);
            }
        }
    }
    complete_all(&mut sim);

    assert!(refusals > 0);
    assert_eq!(sim.bridge.stats().requests_accepted, 10);
    assert_eq!(sim.bridge.upstream().received.len(), 10);
    assert_eq!(sim.bridge.engine().unwrap().stats().total_writes, 10);
    assert_eq!(sim.bridge.pending_requests(), 0);
    assert_eq!(sim.bridge.pending_responses(), 0);
}

#[test]
fn report_reflects_run() {
    let mut sim = simulation(&bridge_config(4, 4, 16));
    for _ in 0..3 {
        let _ = write_through(&mut sim, 0x1000, line(0));
    }
    let mut out = Vec::new();
    sim.bridge.report().write_sections(&mut out, &[]).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("66.67%"));
    assert!(text.contains("correct_zero"));
}

#[test]
fn clock_follows_events() {
    let mut config = bridge_config(4, 4, 16);
    config.bridge.delay = 25;
    let mut sim = simulation(&config);
    assert_eq!(sim.now(), 0);
    sim.send_request(write_at(0x1000, line(0)).posted()).unwrap();
    assert_eq!(sim.pending_events(), 1);
    assert!(sim.step());
    assert_eq!(sim.now(), 25);
    assert!(!sim.step());
    sim.run_until(100);
    assert_eq!(sim.now(), 100);
}
