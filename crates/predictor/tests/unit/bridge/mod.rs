//! # Bridge Tests


/// Delayed forwarding, busy peers, prediction annotation, and bypass.
pub mod forwarding;

/// Functional probes, atomic latency, and address ranges.
pub mod untimed;
