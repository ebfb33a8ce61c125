use wpred_core::bridge::port::{Busy, Peer};
use wpred_core::common::{AddrRange, Packet, Tick};
use wpred_core::config::Config;
use wpred_core::{Bridge, Simulation};

/// An endpoint that records everything it accepts.
#[derive(Debug, Default)]
pub struct RecordingPeer {
    /// Accepted packets with their arrival tick, oldest first.
    pub received: Vec<(Tick, Packet)>,
    /// Refuse everything while set.
    pub busy: bool,
    /// Number of space-available notifications received.
    pub notifications: usize,
    pub ranges: Vec<AddrRange>,
    pub atomic_latency: Tick,
}

impl RecordingPeer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ranges(ranges: Vec<AddrRange>) -> Self {
        Self {
            ranges,
            ..Self::default()
        }
    }

    /// Removes and returns everything received so far.
    pub fn drain(&mut self) -> Vec<Packet> {
        self.received.drain(..).map(|(_, pkt)| pkt).collect()
    }
}

impl Peer for RecordingPeer {
    fn try_accept(&mut self, pkt: Packet, now: Tick) -> Result<(), Busy> {
        if self.busy {
            return Err(Busy::new(pkt));
        }
        self.received.push((now, pkt));
        Ok(())
    }

    fn notify_space_available(&mut self, _now: Tick) {
        self.notifications += 1;
    }

    fn address_ranges(&self) -> Vec<AddrRange> {
        self.ranges.clone()
    }

    fn functional_probe(&self, range: AddrRange) -> Option<Packet> {
        self.received
            .iter()
            .rev()
            .map(|(_, pkt)| pkt)
            .find(|pkt| pkt.range().overlaps(&range))
            .cloned()
    }

    fn atomic_latency(&mut self, _pkt: &Packet) -> Tick {
        self.atomic_latency
    }
}

pub type TestSim = Simulation<RecordingPeer, RecordingPeer>;

/// A simulation over two recording peers.
pub fn simulation(config: &Config) -> TestSim {
    super::init_tracing();
    let bridge = Bridge::new(config, RecordingPeer::new(), RecordingPeer::new())
        .expect("valid test configuration");
    Simulation::new(bridge)
}

/// Lets every due event run, then answers every request the downstream peer
/// received and lets the responses reach the upstream peer.
pub fn complete_all(sim: &mut TestSim) {
    sim.run_to_completion();
    let requests = sim.bridge.downstream_mut().drain();
    for req in requests {
        if req.expects_response() {
            sim.send_response(req.into_response(None))
                .expect("reserved response slot");
        }
    }
    sim.run_to_completion();
}
