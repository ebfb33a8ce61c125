//! Deferred-item queues.
//!
//! Each direction of the bridge holds its in-flight packets in a FIFO of
//! `DeferredItem`s. The delay is uniform, so insertion order is also
//! ready-time order and the head is always the next packet to forward.
//!
//! The response side additionally tracks slots reserved by accepted requests
//! whose responses are still outstanding.

use std::collections::VecDeque;

use crate::common::{AddrRange, Packet, Tick};

/// A packet plus the tick at which it may be forwarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeferredItem {
    /// Earliest forwarding tick.
    pub ready_at: Tick,
    /// The packet itself.
    pub pkt: Packet,
}

/// Bounded FIFO of deferred items.
#[derive(Debug)]
pub struct DeferredQueue {
    items: VecDeque<DeferredItem>,
    limit: usize,
}

impl DeferredQueue {
    /// Creates an empty queue holding at most `limit` items.
    pub fn new(limit: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Appends a packet that becomes ready at `ready_at`.
    ///
    /// Returns `true` if the queue was empty, i.e. the item is the new head.
    pub fn push(&mut self, pkt: Packet, ready_at: Tick) -> bool {
        let was_empty = self.items.is_empty();
        self.items.push_back(DeferredItem { ready_at, pkt });
        was_empty
    }

    /// Puts an item that could not be forwarded back at the head.
    pub fn requeue(&mut self, item: DeferredItem) {
        self.items.push_front(item);
    }

    /// Head of the queue.
    pub fn front(&self) -> Option<&DeferredItem> {
        self.items.front()
    }

    /// Removes the head.
    pub fn pop(&mut self) -> Option<DeferredItem> {
        self.items.pop_front()
    }

    /// Most recently queued packet overlapping `range`.
    pub fn probe(&self, range: AddrRange) -> Option<&Packet> {
        self.items
            .iter()
            .rev()
            .map(|item| &item.pkt)
            .find(|pkt| pkt.range().overlaps(&range))
    }

    /// Items currently queued.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Configured item limit.
    pub const fn limit(&self) -> usize {
        self.limit
    }
}

/// Downstream-bound request queue.
#[derive(Debug)]
pub struct RequestQueue {
    /// Queued requests.
    pub queue: DeferredQueue,
    /// An upstream request was refused and is waiting for a retry signal.
    pub retry_pending: bool,
}

impl RequestQueue {
    /// Creates an empty request queue of `limit` packets.
    pub fn new(limit: usize) -> Self {
        Self {
            queue: DeferredQueue::new(limit),
            retry_pending: false,
        }
    }

    /// Returns `true` if no further request fits.
    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.queue.limit()
    }
}

/// Upstream-bound response queue with slots reserved for outstanding responses.
#[derive(Debug)]
pub struct ResponseQueue {
    /// Queued responses.
    pub queue: DeferredQueue,
    /// Slots promised to accepted requests whose responses have not arrived.
    reserved: usize,
    /// A downstream response was refused and is waiting for a retry signal.
    pub retry_pending: bool,
}

impl ResponseQueue {
    /// Creates an empty response queue of `limit` packets.
    pub fn new(limit: usize) -> Self {
        Self {
            queue: DeferredQueue::new(limit),
            reserved: 0,
            retry_pending: false,
        }
    }

    /// Returns `true` if neither a new reservation nor an unreserved response fits.
    pub fn is_full(&self) -> bool {
        self.reserved + self.queue.len() >= self.queue.limit()
    }

    /// Promises a slot to the response of an accepted request.
    pub const fn reserve(&mut self) {
        self.reserved += 1;
    }

    /// Converts a reservation into a queued response.
    ///
    /// Returns `false` if no reservation was outstanding.
    pub const fn release(&mut self) -> bool {
        if self.reserved > 0 {
            self.reserved -= 1;
            true
        } else {
            false
        }
    }

    /// Outstanding reservations.
    pub const fn reserved(&self) -> usize {
        self.reserved
    }
}
