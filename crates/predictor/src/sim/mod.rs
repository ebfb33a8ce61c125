//! Discrete-event driving for the bridge.
//!
//! The bridge never waits: it registers the tick at which it wants to act
//! through a [`Scheduler`]. Hosts with their own event loop implement the
//! trait themselves; everyone else uses [`EventQueue`] and [`Simulation`].

/// Ordered event queue.
pub mod event;

/// Bridge-plus-clock simulation driver.
pub mod simulator;

pub use event::EventQueue;
pub use simulator::Simulation;

use crate::bridge::BridgeEvent;
use crate::common::Tick;

/// Host-side event registration used by the bridge.
pub trait Scheduler {
    /// Asks for `event` to be delivered to the bridge at tick `when`.
    fn schedule(&mut self, when: Tick, event: BridgeEvent);
}
