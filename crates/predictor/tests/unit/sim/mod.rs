//! # Simulation Tests

/// End-to-end scenarios driven through the event queue.
pub mod scenario;
