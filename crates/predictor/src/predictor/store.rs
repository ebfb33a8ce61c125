//! Completed-write store.
//!
//! A bounded multi-map from line address to the completed writes observed on
//! that line, oldest first. Capacity is global: when a recording pushes the
//! total past the limit, the single oldest entry across every line is dropped.
//!
//! # Performance
//!
//! - **Time Complexity:**
//!   - `record()`: O(1) amortized, eviction included
//!   - `lookup()`: O(1)
//!   - `invalidate_all()`: O(C)
//! - **Space Complexity:** O(C) where C is the configured capacity

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::common::{PhysAddr, Tick};

static NO_CANDIDATES: VecDeque<CompletedWriteEntry> = VecDeque::new();

/// An immutable snapshot of a finished write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedWriteEntry {
    addr: PhysAddr,
    data: Box<[u8]>,
    pc: u64,
    completed_at: Tick,
}

impl CompletedWriteEntry {
    /// Captures a completed write.
    pub fn new(addr: PhysAddr, data: &[u8], pc: u64, completed_at: Tick) -> Self {
        Self {
            addr,
            data: data.into(),
            pc,
            completed_at,
        }
    }

    /// Exact address the write targeted.
    pub const fn addr(&self) -> PhysAddr {
        self.addr
    }

    /// Line-sized payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Instruction tag of the writing access.
    pub const fn pc(&self) -> u64 {
        self.pc
    }

    /// Tick at which the write completed.
    pub const fn completed_at(&self) -> Tick {
        self.completed_at
    }
}

/// Bounded store of recently completed writes, grouped by line.
#[derive(Debug)]
pub struct CompletedWriteStore {
    lines: HashMap<PhysAddr, VecDeque<CompletedWriteEntry>>,
    /// Line key of every held entry, in global insertion order.
    order: VecDeque<PhysAddr>,
    capacity: usize,
    line_bytes: u64,
    evictions: u64,
}

impl CompletedWriteStore {
    /// Creates an empty store holding at most `capacity` entries.
    ///
    /// `capacity` and `line_bytes` are validated by the predictor config.
    pub fn new(capacity: usize, line_bytes: usize) -> Self {
        Self {
            lines: HashMap::new(),
            order: VecDeque::with_capacity(capacity + 1),
            capacity,
            line_bytes: line_bytes as u64,
            evictions: 0,
        }
    }

    /// Coarsens an address to the key its completed writes are grouped under.
    #[inline]
    pub const fn key(&self, addr: PhysAddr) -> PhysAddr {
        addr.line_aligned(self.line_bytes)
    }

    /// Appends a completed write.
    ///
    /// Returns the entry dropped by the capacity policy, if the append pushed
    /// the store past its limit.
    pub fn record(&mut self, entry: CompletedWriteEntry) -> Option<CompletedWriteEntry> {
        let key = self.key(entry.addr);
        self.lines.entry(key).or_default().push_back(entry);
        self.order.push_back(key);

        if self.order.len() > self.capacity {
            let evicted = self.evict_oldest();
            if let Some(old) = &evicted {
                self.evictions += 1;
                debug!(addr = %old.addr, evictions = self.evictions, "completed write evicted");
            }
            evicted
        } else {
            None
        }
    }

    fn evict_oldest(&mut self) -> Option<CompletedWriteEntry> {
        let key = self.order.pop_front()?;
        let entries = self.lines.get_mut(&key)?;
        let oldest = entries.pop_front()?;
        if entries.is_empty() {
            let _ = self.lines.remove(&key);
        }
        Some(oldest)
    }

    /// Candidates recorded on the line holding `addr`, oldest first.
    pub fn lookup(&self, addr: PhysAddr) -> &VecDeque<CompletedWriteEntry> {
        self.lines.get(&self.key(addr)).unwrap_or(&NO_CANDIDATES)
    }

    /// Address of the entry that the next eviction would drop.
    pub fn address_to_evict(&self) -> Option<PhysAddr> {
        let key = self.order.front()?;
        self.lines.get(key)?.front().map(CompletedWriteEntry::addr)
    }

    /// Drops every held entry without counting it as an eviction.
    ///
    /// Returns the number of entries dropped.
    pub fn invalidate_all(&mut self) -> usize {
        let dropped = self.order.len();
        self.lines.clear();
        self.order.clear();
        dropped
    }

    /// Entries currently held across all lines.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if nothing is held.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of distinct lines with at least one entry.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Configured entry limit.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries dropped by the capacity policy so far.
    pub const fn evictions(&self) -> u64 {
        self.evictions
    }
}

/// Last write tick per line, for write-interval statistics.
#[derive(Debug, Default)]
pub struct LastSeenManager {
    last: HashMap<PhysAddr, Tick>,
}

impl LastSeenManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a write to `line` at `now`.
    ///
    /// Returns the ticks elapsed since the previous write to the same line.
    pub fn touch(&mut self, line: PhysAddr, now: Tick) -> Option<Tick> {
        self.last
            .insert(line, now)
            .map(|prev| now.saturating_sub(prev))
    }

    /// Tick of the last write to `line`, if any.
    pub fn last_seen(&self, line: PhysAddr) -> Option<Tick> {
        self.last.get(&line).copied()
    }
}
