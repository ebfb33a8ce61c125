//! Per-write trace records.
//!
//! When tracing is enabled the engine emits one `TraceRecord` per classified
//! write to a `TraceSink`. `JsonLinesTrace` serializes each record as one
//! JSON object per line.

use std::io::{self, Write};

use serde::Serialize;

use super::{Fingerprint, PredictionOutcome};
use crate::common::{PhysAddr, Tick};

/// One classified write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TraceRecord {
    /// Tick the write was classified at.
    pub tick: Tick,
    /// Target address.
    pub addr: PhysAddr,
    /// Instruction tag.
    pub pc: u64,
    /// Confidence-table key.
    pub fingerprint: Fingerprint,
    /// Classification.
    pub outcome: PredictionOutcome,
    /// Whether the address was predicted.
    pub address_predicted: bool,
    /// Whether the full payload was predicted.
    pub data_predicted: bool,
    /// Matching chunks against the compared candidate, if one was compared.
    pub matching_chunks: Option<u32>,
}

/// Destination for trace records.
pub trait TraceSink: Send {
    /// Writes one record.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the underlying destination.
    fn record(&mut self, record: &TraceRecord) -> io::Result<()>;

    /// Flushes buffered records.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the underlying destination.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes records as newline-delimited JSON.
#[derive(Debug)]
pub struct JsonLinesTrace<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesTrace<W> {
    /// Wraps `writer`.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> TraceSink for JsonLinesTrace<W> {
    fn record(&mut self, record: &TraceRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
