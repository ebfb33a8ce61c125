//! Timing memory bridge with a speculative write-completion predictor.
//!
//! This crate models a bridge between two memory endpoints with the following:
//! 1. **Bridge:** Delayed request/response forwarding, bounded queues, reservation, and retry.
//! 2. **Predictor:** Completed-write store, confidence counters, chunk matching, and history.
//! 3. **Simulation:** A scheduler seam plus an event queue for hosts without their own.
//! 4. **Support:** Configuration, statistics reporting, and per-write tracing.

/// Bridge shell (queues, peers, backpressure).
pub mod bridge;
/// Common types (addresses, packets, constants, errors).
pub mod common;
/// Bridge and predictor configuration (defaults, validation, JSON loading).
pub mod config;
/// Write prediction engine and its tables.
pub mod predictor;
/// Scheduler trait, event queue, and simulation driver.
pub mod sim;
/// Statistics collection and reporting.
pub mod stats;

/// Bridge type; construct with `Bridge::new` from a [`Config`] and two peers.
pub use crate::bridge::Bridge;
/// Root configuration type; use `Config::default()` or `Config::from_json`.
pub use crate::config::Config;
/// Write classifier; usually owned by a [`Bridge`].
pub use crate::predictor::PredictionEngine;
/// Self-contained driver owning a bridge and its event queue.
pub use crate::sim::Simulation;
