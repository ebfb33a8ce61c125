//! Ordered event queue.
//!
//! Events fire in tick order; events registered for the same tick fire in
//! registration order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::Scheduler;
use crate::bridge::BridgeEvent;
use crate::common::Tick;

/// Min-heap of pending bridge events.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<(Tick, u64, BridgeEvent)>>,
    seq: u64,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns the earliest event.
    pub fn pop_next(&mut self) -> Option<(Tick, BridgeEvent)> {
        self.heap.pop().map(|Reverse((when, _, event))| (when, event))
    }

    /// Tick of the earliest event.
    pub fn peek_time(&self) -> Option<Tick> {
        self.heap.peek().map(|Reverse((when, _, _))| *when)
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl Scheduler for EventQueue {
    fn schedule(&mut self, when: Tick, event: BridgeEvent) {
        self.heap.push(Reverse((when, self.seq, event)));
        self.seq += 1;
    }
}
