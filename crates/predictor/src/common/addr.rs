//! Physical addresses, address ranges, and simulated time.
//!
//! This module defines the small value types every other component speaks in. It provides:
//! 1. **Type Safety:** `PhysAddr` keeps raw addresses from mixing with counters and ticks.
//! 2. **Coarsening:** Line alignment used to group completed writes by cache line.
//! 3. **Ranges:** Half-open `AddrRange` used for routing and functional overlap checks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Simulated time in scheduler ticks.
pub type Tick = u64;

/// A physical address in the simulated memory system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhysAddr(pub u64);

impl PhysAddr {
    /// Creates a new physical address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(self) -> u64 {
        self.0
    }

    /// Aligns the address down to a `line_bytes` boundary.
    ///
    /// `line_bytes` must be a power of two; configuration validation guarantees
    /// this for every line size that reaches the predictor.
    #[inline]
    pub const fn line_aligned(self, line_bytes: u64) -> Self {
        Self(self.0 & !(line_bytes - 1))
    }

    /// Returns the address `bytes` past this one.
    #[inline]
    pub const fn offset(self, bytes: u64) -> Self {
        Self(self.0.wrapping_add(bytes))
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for PhysAddr {
    fn from(addr: u64) -> Self {
        Self(addr)
    }
}

/// A half-open address range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddrRange {
    /// First address covered by the range.
    pub start: u64,
    /// First address past the end of the range.
    pub end: u64,
}

impl AddrRange {
    /// Creates a range covering `[start, end)`.
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Creates a range of `size` bytes starting at `start`.
    pub const fn with_size(start: PhysAddr, size: u64) -> Self {
        Self {
            start: start.0,
            end: start.0.saturating_add(size),
        }
    }

    /// Number of bytes covered.
    pub const fn size(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the range covers no bytes.
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Returns `true` if `addr` lies inside the range.
    pub const fn contains(&self, addr: PhysAddr) -> bool {
        addr.0 >= self.start && addr.0 < self.end
    }

    /// Returns `true` if the two ranges share at least one byte.
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns `true` if `other` lies entirely inside this range.
    pub const fn covers(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for AddrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.start, self.end)
    }
}
