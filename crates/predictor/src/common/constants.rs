//! Global predictor and bridge constants.
//!
//! This module defines the fixed limits shared across the crate. It includes:
//! 1. **Line geometry:** The reference cache line size used for completed writes.
//! 2. **Confidence model:** Reference counter width, threshold, and neutral start value.
//! 3. **History:** Reference instruction history depth.

/// Reference cache line size in bytes.
pub const LINE_BYTES: usize = 64;

/// Reference chunk size in bytes for sub-line comparison.
pub const CHUNK_BYTES: usize = 8;

/// Widest chunk-match vector representable by `ChunkMatchVec`.
pub const MAX_CHUNKS: usize = u64::BITS as usize;

/// Reference width of each confidence counter, in bits.
pub const CONFIDENCE_BITS: u8 = 2;

/// Counter value at or above which a prediction is acted upon.
pub const CONFIDENCE_THRESHOLD: u8 = 1;

/// Value a freshly initialized confidence counter starts at.
pub const CONFIDENCE_INITIAL: u8 = 0;

/// Widest supported confidence counter, in bits.
pub const MAX_CONFIDENCE_BITS: u8 = 8;

/// Reference depth of the per-site instruction history buffer.
pub const IHB_DEPTH: usize = 5;
