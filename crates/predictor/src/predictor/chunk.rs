//! Sub-line chunk comparison.
//!
//! Two line-sized payloads are split into fixed-size chunks and compared chunk
//! by chunk. The result is a `ChunkMatchVec` with bit `i` set when chunk `i`
//! is byte-identical in both payloads.

use std::fmt;

use super::store::CompletedWriteEntry;
use crate::common::PredictorError;

/// Per-chunk match bits for one comparison.
///
/// Width is fixed at construction and never exceeds 64 chunks.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkMatchVec {
    bits: u64,
    width: u8,
}

impl ChunkMatchVec {
    /// A vector of `width` chunks with no bit set.
    pub const fn empty(width: usize) -> Self {
        Self {
            bits: 0,
            width: width as u8,
        }
    }

    /// A vector of `width` chunks with every bit set.
    pub const fn full(width: usize) -> Self {
        Self {
            bits: Self::mask(width as u8),
            width: width as u8,
        }
    }

    const fn mask(width: u8) -> u64 {
        if width as u32 >= u64::BITS {
            u64::MAX
        } else {
            (1u64 << width) - 1
        }
    }

    /// Marks chunk `idx` as matching; out-of-range indices are ignored.
    pub const fn set(&mut self, idx: usize) {
        if idx < self.width as usize {
            self.bits |= 1 << idx;
        }
    }

    /// Returns `true` if chunk `idx` matched.
    pub const fn is_set(self, idx: usize) -> bool {
        idx < self.width as usize && self.bits & (1 << idx) != 0
    }

    /// Number of matching chunks.
    pub const fn count(self) -> u32 {
        self.bits.count_ones()
    }

    /// Number of chunks compared.
    pub const fn width(self) -> usize {
        self.width as usize
    }

    /// Returns `true` if every chunk matched.
    pub const fn is_full(self) -> bool {
        self.bits == Self::mask(self.width)
    }

    /// Returns `true` if some, but not all, chunks matched.
    pub const fn is_partial(self) -> bool {
        self.bits != 0 && !self.is_full()
    }

    /// Raw bits, chunk 0 in the least significant position.
    pub const fn bits(self) -> u64 {
        self.bits
    }
}

impl fmt::Debug for ChunkMatchVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ChunkMatchVec({:0width$b})",
            self.bits,
            width = self.width as usize
        )
    }
}

/// Chunk-by-chunk payload comparator for one line geometry.
#[derive(Clone, Copy, Debug)]
pub struct ChunkMatcher {
    line_bytes: usize,
    chunk_bytes: usize,
}

impl ChunkMatcher {
    /// Creates a matcher for `line_bytes` lines split into `chunk_bytes` chunks.
    ///
    /// The geometry is validated by the predictor config: the chunk divides
    /// the line and the line holds at most 64 chunks.
    pub const fn new(line_bytes: usize, chunk_bytes: usize) -> Self {
        Self {
            line_bytes,
            chunk_bytes,
        }
    }

    /// Number of chunks per line.
    pub const fn chunk_count(&self) -> usize {
        self.line_bytes / self.chunk_bytes
    }

    /// Compares two line-sized payloads.
    ///
    /// # Errors
    ///
    /// Returns [`PredictorError::PayloadLengthMismatch`] if either payload is
    /// not exactly one line long.
    pub fn compare(&self, a: &[u8], b: &[u8]) -> Result<ChunkMatchVec, PredictorError> {
        self.check_len(a)?;
        self.check_len(b)?;
        let mut vec = ChunkMatchVec::empty(self.chunk_count());
        for (idx, (ca, cb)) in a
            .chunks_exact(self.chunk_bytes)
            .zip(b.chunks_exact(self.chunk_bytes))
            .enumerate()
        {
            if ca == cb {
                vec.set(idx);
            }
        }
        Ok(vec)
    }

    /// Compares an incoming payload against a candidate's recorded payload.
    ///
    /// # Errors
    ///
    /// See [`ChunkMatcher::compare`].
    pub fn compare_to_candidate(
        &self,
        incoming: &[u8],
        candidate: &CompletedWriteEntry,
    ) -> Result<ChunkMatchVec, PredictorError> {
        self.compare(incoming, candidate.data())
    }

    /// Compares a candidate's payload against the constant learned for its address.
    ///
    /// # Errors
    ///
    /// See [`ChunkMatcher::compare`].
    pub fn compare_to_constant(
        &self,
        candidate: &CompletedWriteEntry,
        constant: &[u8],
    ) -> Result<ChunkMatchVec, PredictorError> {
        self.compare(candidate.data(), constant)
    }

    fn check_len(&self, payload: &[u8]) -> Result<(), PredictorError> {
        if payload.len() == self.line_bytes {
            Ok(())
        } else {
            Err(PredictorError::PayloadLengthMismatch {
                expected: self.line_bytes,
                found: payload.len(),
            })
        }
    }
}
