//! Learned constant payloads.
//!
//! Tracks, per exact address, the payload last written there and how many
//! consecutive times it has been written unchanged. A location whose payload
//! keeps repeating can be predicted from its address alone.

use std::collections::HashMap;

use crate::common::PhysAddr;

/// The payload an address keeps receiving.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LearnedConstant {
    pattern: Box<[u8]>,
    repeats: u32,
}

impl LearnedConstant {
    /// The remembered payload.
    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    /// Consecutive writes that repeated the pattern after its first observation.
    pub const fn repeats(&self) -> u32 {
        self.repeats
    }

    /// Returns `true` once the pattern has been written at least twice in a row.
    pub const fn is_learned(&self) -> bool {
        self.repeats > 0
    }
}

/// Per-address constant tracker.
#[derive(Debug, Default)]
pub struct ConstantTracker {
    by_addr: HashMap<PhysAddr, LearnedConstant>,
}

impl ConstantTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Learned constant for `addr`, if anything was written there.
    pub fn get(&self, addr: PhysAddr) -> Option<&LearnedConstant> {
        self.by_addr.get(&addr)
    }

    /// Remembered payload for `addr`, learned or not.
    pub fn pattern(&self, addr: PhysAddr) -> Option<&[u8]> {
        self.get(addr).map(LearnedConstant::pattern)
    }

    /// Payload `addr` has received at least twice in a row.
    pub fn learned(&self, addr: PhysAddr) -> Option<&[u8]> {
        self.get(addr)
            .filter(|c| c.is_learned())
            .map(LearnedConstant::pattern)
    }

    /// Folds a completed write into the tracker.
    pub fn observe(&mut self, addr: PhysAddr, data: &[u8]) {
        match self.by_addr.get_mut(&addr) {
            Some(learned) if *learned.pattern == *data => {
                learned.repeats = learned.repeats.saturating_add(1);
            }
            Some(learned) => {
                learned.pattern = data.into();
                learned.repeats = 0;
            }
            None => {
                let _ = self.by_addr.insert(
                    addr,
                    LearnedConstant {
                        pattern: data.into(),
                        repeats: 0,
                    },
                );
            }
        }
    }

    /// Forgets every address.
    pub fn clear(&mut self) {
        self.by_addr.clear();
    }

    /// Number of addresses tracked.
    pub fn len(&self) -> usize {
        self.by_addr.len()
    }

    /// Returns `true` if no address is tracked.
    pub fn is_empty(&self) -> bool {
        self.by_addr.is_empty()
    }
}
