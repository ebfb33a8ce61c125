//! Untimed Access Tests.
//!
//! Verifies functional probes through both queues, atomic latency, and
//! address range reporting.

use mockall::predicate::always;
use wpred_core::Bridge;
use wpred_core::common::{AddrRange, MemCmd};

use crate::common::builder::{bridge_config, line, line_with_chunk, read_at, write_at};
use crate::common::harness::{RecordingPeer, simulation};
use crate::common::mocks::MockEndpoint;

// ══════════════════════════════════════════════════════════
// 1. Functional probes
// ══════════════════════════════════════════════════════════

#[test]
fn functional_probe_finds_newest_queued_write() {
    let mut sim = simulation(&bridge_config(4, 4, 16));
    sim.send_request(write_at(0x1000, line(1)).posted()).unwrap();
    sim.send_request(write_at(0x1000, line(2)).posted()).unwrap();

    let hit = sim.bridge.recv_functional(AddrRange::new(0x1010, 0x1018)).unwrap();
    assert_eq!(hit.data, line(2));
    assert_eq!(sim.bridge.pending_requests(), 2);
    assert_eq!(sim.bridge.stats().functional_hits, 1);
}

#[test]
fn functional_probe_prefers_response_queue() {
    let mut sim = simulation(&bridge_config(4, 4, 16));
    sim.send_request(write_at(0x1000, line(1)).posted()).unwrap();
    let resp = read_at(0x1000).into_response(Some(line_with_chunk(0, 0, 9)));
    sim.send_response(resp).unwrap();

    let hit = sim.bridge.recv_functional(AddrRange::new(0x1000, 0x1008)).unwrap();
    assert_eq!(hit.cmd, MemCmd::ReadResp);
    assert_eq!(hit.data[0], 9);
}

#[test]
fn functional_probe_falls_through_to_downstream() {
    let mut sim = simulation(&bridge_config(4, 4, 16));
    sim.send_request(write_at(0x2000, line(4)).posted()).unwrap();
    sim.run_to_completion();

    let hit = sim.bridge.recv_functional(AddrRange::new(0x2000, 0x2040)).unwrap();
    assert_eq!(hit.data, line(4));
    assert_eq!(sim.bridge.stats().functional_hits, 0);
    assert!(sim.bridge.recv_functional(AddrRange::new(0x9000, 0x9040)).is_none());
}

// ══════════════════════════════════════════════════════════
// 2. Atomic access
// ══════════════════════════════════════════════════════════

#[test]
fn atomic_latency_adds_bridge_delay() {
    let mut config = bridge_config(4, 4, 16);
    config.bridge.delay = 3;
    let mut downstream = MockEndpoint::new();
    downstream
        .expect_atomic_latency()
        .with(always())
        .times(1)
        .return_const(7u64);
    let mut bridge = Bridge::new(&config, RecordingPeer::new(), downstream).unwrap();
    assert_eq!(bridge.recv_atomic(&read_at(0x1000)), 10);
    assert_eq!(bridge.stats().atomic_accesses, 1);
    assert_eq!(bridge.pending_requests(), 0);
}

// ══════════════════════════════════════════════════════════
// 3. Address ranges
// ══════════════════════════════════════════════════════════

#[test]
fn configured_ranges_take_precedence() {
    let mut config = bridge_config(4, 4, 16);
    config.bridge.ranges = vec![AddrRange::new(0x1000, 0x2000)];
    let downstream = RecordingPeer::with_ranges(vec![AddrRange::new(0, 0x10_0000)]);
    let bridge = Bridge::new(&config, RecordingPeer::new(), downstream).unwrap();
    assert_eq!(bridge.address_ranges(), vec![AddrRange::new(0x1000, 0x2000)]);
}

#[test]
fn downstream_ranges_used_when_unconfigured() {
    let downstream = RecordingPeer::with_ranges(vec![AddrRange::new(0, 0x10_0000)]);
    let bridge = Bridge::new(&bridge_config(4, 4, 16), RecordingPeer::new(), downstream).unwrap();
    assert_eq!(bridge.address_ranges(), vec![AddrRange::new(0, 0x10_0000)]);
}
