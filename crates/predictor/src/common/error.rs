//! Error definitions.
//!
//! Three families of failure exist in the bridge and predictor:
//! 1. **Configuration errors:** Rejected at construction; nothing is built from a bad config.
//! 2. **Invariant violations:** Programming errors inside the predictor, surfaced to the caller.
//! 3. **Flow control:** Not an error at all; a full queue hands the packet back as `Busy`.

use thiserror::Error;

use super::packet::Packet;
use crate::predictor::Fingerprint;

/// A configuration value that cannot produce a working bridge or predictor.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A capacity or queue limit was configured as zero.
    #[error("`{0}` must be greater than zero")]
    ZeroCapacity(&'static str),

    /// The line size is not a power of two.
    #[error("line size {0} is not a power of two")]
    LineNotPowerOfTwo(usize),

    /// The chunk size does not evenly divide the line.
    #[error("chunk size {chunk} does not divide line size {line}")]
    ChunkDoesNotDivideLine {
        /// Configured line size in bytes.
        line: usize,
        /// Configured chunk size in bytes.
        chunk: usize,
    },

    /// More chunks per line than the match vector can hold.
    #[error("{0} chunks per line exceeds the {max}-bit match vector", max = crate::common::constants::MAX_CHUNKS)]
    TooManyChunks(usize),

    /// The confidence counter width is outside the supported range.
    #[error("confidence width of {0} bits is outside 1..={max}", max = crate::common::constants::MAX_CONFIDENCE_BITS)]
    ConfidenceWidth(u8),

    /// The confidence threshold can never be reached.
    #[error("confidence threshold {threshold} exceeds counter maximum {max}")]
    ThresholdOutOfRange {
        /// Configured threshold.
        threshold: u8,
        /// Largest value the counter can hold.
        max: u8,
    },

    /// The configuration document could not be parsed.
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),
}

/// An internal-consistency violation in the prediction model.
///
/// These are never retried: the model's statistics would be wrong from this
/// point on, so the caller is expected to stop and report.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PredictorError {
    /// A confidence update was issued for a fingerprint that was never initialized.
    #[error("confidence update for uninitialized fingerprint {0}")]
    UninitializedFingerprint(Fingerprint),

    /// Two payloads of different lengths were handed to the chunk matcher.
    #[error("payload length mismatch: expected {expected} bytes, found {found}")]
    PayloadLengthMismatch {
        /// Line size the matcher was built for.
        expected: usize,
        /// Length of the offending payload.
        found: usize,
    },
}

/// Why the bridge did not take ownership of a request.
#[derive(Debug, Error)]
pub enum RecvError {
    /// The bridge is out of queue space; the packet is handed back for a later retry.
    #[error("bridge busy, retry after space-available notification")]
    Busy(Box<Packet>),

    /// The predictor hit an invariant violation while classifying the write.
    #[error(transparent)]
    Predictor(#[from] PredictorError),
}

impl RecvError {
    /// Returns `true` for the flow-control case.
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Busy(_))
    }

    /// Recovers the refused packet, if this is the flow-control case.
    pub fn into_packet(self) -> Option<Packet> {
        match self {
            Self::Busy(pkt) => Some(*pkt),
            Self::Predictor(_) => None,
        }
    }
}
