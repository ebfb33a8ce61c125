//! Forwarding Tests.
//!
//! Verifies per-hop delay, FIFO order, stalls on busy peers, and the
//! prediction annotation carried by forwarded writes.

use pretty_assertions::assert_eq;
use wpred_core::Bridge;
use wpred_core::bridge::BridgeEvent;
use wpred_core::bridge::port::Busy;
use wpred_core::common::{AddrRange, MemCmd, Packet, PhysAddr};
use wpred_core::config::Config;
use wpred_core::predictor::PredictionOutcome;
use wpred_core::sim::EventQueue;

use crate::common::builder::{bridge_config, line, read_at, write_at};
use crate::common::harness::{RecordingPeer, complete_all, simulation};
use crate::common::mocks::MockEndpoint;

// ══════════════════════════════════════════════════════════
// 1. Timing and order
// ══════════════════════════════════════════════════════════

#[test]
fn requests_forwarded_after_delay_in_order() {
    let mut config = bridge_config(8, 8, 16);
    config.bridge.delay = 10;
    let mut sim = simulation(&config);
    sim.send_request(read_at(0x000)).unwrap();
    sim.run_until(3);
    sim.send_request(read_at(0x040)).unwrap();

    sim.run_until(9);
    assert!(sim.bridge.downstream().received.is_empty());

    sim.run_to_completion();
    let arrivals: Vec<(u64, u64)> = sim
        .bridge
        .downstream()
        .received
        .iter()
        .map(|(t, p)| (*t, p.addr.val()))
        .collect();
    assert_eq!(arrivals, vec![(10, 0x000), (13, 0x040)]);
    assert_eq!(sim.bridge.stats().requests_forwarded, 2);
}

#[test]
fn responses_return_upstream() {
    let mut sim = simulation(&bridge_config(4, 4, 16));
    sim.send_request(read_at(0x000)).unwrap();
    complete_all(&mut sim);
    let received = &sim.bridge.upstream().received;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].1.cmd, MemCmd::ReadResp);
    assert_eq!(received[0].1.data.len(), 64);
    assert_eq!(sim.bridge.stats().responses_forwarded, 1);
}

#[test]
fn ready_tick_saturates_at_end_of_time() {
    let mut config = bridge_config(4, 4, 16);
    config.bridge.delay = 10;
    let mut bridge = Bridge::new(&config, RecordingPeer::new(), RecordingPeer::new()).unwrap();
    let mut events = EventQueue::new();

    bridge.recv_request(read_at(0x000), u64::MAX - 3, &mut events).unwrap();
    assert_eq!(events.pop_next(), Some((u64::MAX, BridgeEvent::SendRequest)));
    bridge.process(BridgeEvent::SendRequest, u64::MAX, &mut events);
    assert_eq!(bridge.stats().requests_forwarded, 1);
}

// ══════════════════════════════════════════════════════════
// 2. Busy peers
// ══════════════════════════════════════════════════════════

#[test]
fn busy_downstream_holds_head_until_retry() {
    let mut sim = simulation(&bridge_config(4, 4, 16));
    sim.bridge.downstream_mut().busy = true;
    sim.send_request(read_at(0x000)).unwrap();
    sim.send_request(read_at(0x040)).unwrap();

    sim.run_to_completion();
    assert_eq!(sim.bridge.pending_requests(), 2);
    assert_eq!(sim.bridge.stats().peer_busy_stalls, 1);
    assert_eq!(sim.pending_events(), 0);

    sim.bridge.downstream_mut().busy = false;
    sim.downstream_ready();
    sim.run_to_completion();
    let order: Vec<u64> = sim
        .bridge
        .downstream()
        .received
        .iter()
        .map(|(_, p)| p.addr.val())
        .collect();
    assert_eq!(order, vec![0x000, 0x040]);
}

#[test]
fn busy_upstream_holds_response_until_retry() {
    let mut sim = simulation(&bridge_config(4, 4, 16));
    sim.send_request(read_at(0x000)).unwrap();
    sim.bridge.upstream_mut().busy = true;
    complete_all(&mut sim);
    assert_eq!(sim.bridge.pending_responses(), 1);

    sim.bridge.upstream_mut().busy = false;
    sim.upstream_ready();
    sim.run_to_completion();
    assert_eq!(sim.bridge.upstream().received.len(), 1);
    assert_eq!(sim.bridge.pending_responses(), 0);
}

#[test]
fn mock_peer_refusal_is_retried() {
    let mut downstream = MockEndpoint::new();
    let mut calls = 0;
    downstream
        .expect_try_accept()
        .times(2)
        .returning(move |pkt: Packet, _| {
            calls += 1;
            if calls == 1 { Err(Busy::new(pkt)) } else { Ok(()) }
        });
    let mut bridge = Bridge::new(&bridge_config(4, 4, 16), RecordingPeer::new(), downstream).unwrap();
    let mut events = EventQueue::new();

    bridge.recv_request(read_at(0x000), 0, &mut events).unwrap();
    assert_eq!(events.pop_next(), Some((1, BridgeEvent::SendRequest)));
    bridge.process(BridgeEvent::SendRequest, 1, &mut events);
    assert!(events.is_empty());

    bridge.recv_request_retry(5, &mut events);
    assert_eq!(events.pop_next(), Some((5, BridgeEvent::SendRequest)));
    bridge.process(BridgeEvent::SendRequest, 5, &mut events);
    assert_eq!(bridge.pending_requests(), 0);
    assert_eq!(bridge.stats().requests_forwarded, 1);
}

// ══════════════════════════════════════════════════════════
// 3. Prediction on intake
// ══════════════════════════════════════════════════════════

#[test]
fn forwarded_writes_carry_their_outcome() {
    let mut sim = simulation(&bridge_config(4, 4, 16));
    sim.send_request(write_at(0x1000, line(1))).unwrap();
    complete_all(&mut sim);
    sim.send_request(write_at(0x1000, line(1))).unwrap();
    sim.run_to_completion();

    let outcomes: Vec<Option<PredictionOutcome>> = sim
        .bridge
        .downstream()
        .received
        .iter()
        .map(|(_, p)| p.prediction)
        .collect();
    assert_eq!(outcomes, vec![Some(PredictionOutcome::Correct)]);
    let engine = sim.bridge.engine().unwrap();
    assert_eq!(engine.stats().total_writes, 2);
}

#[test]
fn reads_and_partial_writes_bypass_predictor() {
    let mut sim = simulation(&bridge_config(4, 4, 16));
    sim.send_request(read_at(0x1000)).unwrap();
    sim.send_request(write_at(0x1000, vec![0; 8])).unwrap();
    sim.run_to_completion();
    assert_eq!(sim.bridge.stats().predictor_bypassed_writes, 1);
    assert_eq!(sim.bridge.engine().unwrap().stats().total_writes, 0);
    assert!(sim.bridge.downstream().received.iter().all(|(_, p)| p.prediction.is_none()));
}

#[test]
fn disabled_predictor_forwards_unannotated() {
    let mut config = bridge_config(4, 4, 16);
    config.predictor.enabled = false;
    let mut sim = simulation(&config);
    assert!(sim.bridge.engine().is_none());
    sim.send_request(write_at(0x1000, line(1))).unwrap();
    sim.run_to_completion();
    assert_eq!(sim.bridge.downstream().received[0].1.prediction, None);
    assert_eq!(sim.bridge.stats().predictor_bypassed_writes, 1);
    assert!(sim.bridge.report().predictor.is_none());
}

#[test]
fn writes_outside_persistent_ranges_bypass_predictor() {
    let mut config = bridge_config(4, 4, 16);
    config.predictor.persistent_ranges = vec![AddrRange::new(0x1000, 0x2000)];
    let mut sim = simulation(&config);
    sim.send_request(write_at(0x1000, line(1)).posted()).unwrap();
    sim.send_request(write_at(0x8000, line(1)).posted()).unwrap();
    assert_eq!(sim.bridge.stats().predictor_bypassed_writes, 1);
    assert_eq!(sim.bridge.engine().unwrap().stats().total_writes, 1);
}

#[test]
fn writeback_samples_distance_from_classified_write() {
    let mut sim = simulation(&bridge_config(4, 4, 16));
    sim.send_request(write_at(0x1000, line(1)).posted()).unwrap();
    sim.run_until(40);
    sim.send_request(Packet::writeback(PhysAddr(0x1020), line(1))).unwrap();
    sim.send_request(Packet::writeback(PhysAddr(0x2000), line(1))).unwrap();
    sim.run_to_completion();

    let engine = sim.bridge.engine().unwrap().stats();
    assert_eq!(engine.total_writes, 1);
    assert_eq!(engine.writeback_distance.samples(), 1);
    assert_eq!(engine.writeback_distance_micro.extremes(), Some((40, 40)));
    assert_eq!(sim.bridge.stats().predictor_bypassed_writes, 0);
    assert_eq!(sim.bridge.reserved_responses(), 0);
    assert_eq!(sim.bridge.downstream().received.len(), 3);
}

#[test]
fn invalid_config_builds_no_bridge() {
    let mut config = Config::default();
    config.bridge.req_queue_limit = 0;
    assert!(Bridge::new(&config, RecordingPeer::new(), RecordingPeer::new()).is_err());
}
