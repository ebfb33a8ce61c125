//! Instruction History Buffer (IHB).
//!
//! Each access site (instruction tag) keeps a small ring of the fingerprints
//! it produced most recently. When an incoming fingerprint is already in its
//! site's ring the site is repeating itself, and candidate selection favours
//! completed writes produced by that same site.

use std::collections::HashMap;

use super::Fingerprint;

/// Fixed-capacity ring of recent fingerprints; the oldest slot is overwritten on overflow.
#[derive(Clone, Debug)]
pub struct InstructionHistoryBuffer {
    /// Ring storage.
    slots: Vec<Fingerprint>,
    /// Index the next push writes to.
    head: usize,
    /// Number of valid slots.
    len: usize,
}

impl InstructionHistoryBuffer {
    /// Creates an empty buffer with room for `depth` fingerprints.
    pub fn new(depth: usize) -> Self {
        Self {
            slots: vec![Fingerprint::default(); depth],
            head: 0,
            len: 0,
        }
    }

    /// Pushes the newest fingerprint, overwriting the oldest when full.
    pub fn push(&mut self, fp: Fingerprint) {
        let depth = self.slots.len();
        if depth == 0 {
            return;
        }
        self.slots[self.head] = fp;
        self.head = (self.head + 1) % depth;
        self.len = (self.len + 1).min(depth);
    }

    /// Fingerprints from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = Fingerprint> + '_ {
        let depth = self.slots.len();
        (0..self.len).map(move |age| self.slots[(self.head + depth - 1 - age) % depth])
    }

    /// Age of the newest occurrence of `fp` (0 = most recent push).
    pub fn position(&self, fp: Fingerprint) -> Option<usize> {
        self.iter().position(|f| f == fp)
    }

    /// Number of valid entries.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if nothing was pushed yet.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of entries.
    pub fn depth(&self) -> usize {
        self.slots.len()
    }
}

/// One history buffer per access site.
#[derive(Debug)]
pub struct HistoryTable {
    sites: HashMap<u64, InstructionHistoryBuffer>,
    depth: usize,
}

impl HistoryTable {
    /// Creates an empty table whose buffers hold `depth` fingerprints.
    pub fn new(depth: usize) -> Self {
        Self {
            sites: HashMap::new(),
            depth,
        }
    }

    /// Age of `fp` in the history of site `pc`, if it repeated recently.
    pub fn position(&self, pc: u64, fp: Fingerprint) -> Option<usize> {
        self.sites.get(&pc).and_then(|ihb| ihb.position(fp))
    }

    /// Appends `fp` to the history of site `pc`.
    pub fn push(&mut self, pc: u64, fp: Fingerprint) {
        let depth = self.depth;
        self.sites
            .entry(pc)
            .or_insert_with(|| InstructionHistoryBuffer::new(depth))
            .push(fp);
    }

    /// History of site `pc`, if it has written anything.
    pub fn site(&self, pc: u64) -> Option<&InstructionHistoryBuffer> {
        self.sites.get(&pc)
    }
}
