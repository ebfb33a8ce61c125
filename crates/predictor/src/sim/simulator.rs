//! Simulation: owns a bridge, its event queue, and the clock.
//!
//! Peers cannot call back into the bridge they are owned by, so the host
//! plays their active part through the `Simulation` methods: offering
//! requests and responses, and signalling retries.

use super::EventQueue;
use crate::bridge::port::{Busy, Peer};
use crate::bridge::Bridge;
use crate::common::{Packet, RecvError, Tick};

/// Top-level driver: bridge, pending events, and current tick.
#[derive(Debug)]
pub struct Simulation<U: Peer, D: Peer> {
    /// The bridge under simulation.
    pub bridge: Bridge<U, D>,
    events: EventQueue,
    now: Tick,
}

impl<U: Peer, D: Peer> Simulation<U, D> {
    /// Starts a simulation at tick 0.
    pub fn new(bridge: Bridge<U, D>) -> Self {
        Self {
            bridge,
            events: EventQueue::new(),
            now: 0,
        }
    }

    /// Current tick.
    pub const fn now(&self) -> Tick {
        self.now
    }

    /// Events still pending.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Offers a request from the upstream side at the current tick.
    ///
    /// # Errors
    ///
    /// See [`Bridge::recv_request`].
    pub fn send_request(&mut self, pkt: Packet) -> Result<(), RecvError> {
        self.bridge.recv_request(pkt, self.now, &mut self.events)
    }

    /// Offers a response from the downstream side at the current tick.
    ///
    /// # Errors
    ///
    /// See [`Bridge::recv_response`].
    pub fn send_response(&mut self, pkt: Packet) -> Result<(), Busy> {
        self.bridge.recv_response(pkt, self.now, &mut self.events)
    }

    /// The downstream peer signals room after refusing a request.
    pub fn downstream_ready(&mut self) {
        self.bridge.recv_request_retry(self.now, &mut self.events);
    }

    /// The upstream peer signals room after refusing a response.
    pub fn upstream_ready(&mut self) {
        self.bridge.recv_response_retry(self.now, &mut self.events);
    }

    /// Runs the earliest pending event, advancing the clock to it.
    ///
    /// Returns `false` if nothing was pending.
    pub fn step(&mut self) -> bool {
        let Some((when, event)) = self.events.pop_next() else {
            return false;
        };
        self.now = self.now.max(when);
        self.bridge.process(event, self.now, &mut self.events);
        true
    }

    /// Runs every event due at or before `tick`, then sets the clock to `tick`.
    pub fn run_until(&mut self, tick: Tick) {
        while self.events.peek_time().is_some_and(|t| t <= tick) {
            let _ = self.step();
        }
        self.now = self.now.max(tick);
    }

    /// Runs until no event is pending.
    pub fn run_to_completion(&mut self) {
        while self.step() {}
    }
}
