//! Memory packets carried through the bridge.
//!
//! A `Packet` is the unit of traffic: a command, a target address, a payload,
//! and the instruction tag of the access that produced it. Writes that pass the
//! predictor leave the bridge annotated with their `PredictionOutcome`.

use serde::Serialize;

use super::addr::{AddrRange, PhysAddr};
use crate::predictor::PredictionOutcome;

/// Memory command carried by a packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum MemCmd {
    /// Read request travelling downstream.
    ReadReq,
    /// Read response travelling upstream with data.
    ReadResp,
    /// Write request travelling downstream with data.
    WriteReq,
    /// Write acknowledgement travelling upstream.
    WriteResp,
    /// Dirty line evicted by a cache, travelling downstream; never answered.
    Writeback,
}

impl MemCmd {
    /// Returns `true` for downstream-bound requests.
    pub const fn is_request(self) -> bool {
        matches!(self, Self::ReadReq | Self::WriteReq | Self::Writeback)
    }

    /// Returns `true` for upstream-bound responses.
    pub const fn is_response(self) -> bool {
        !self.is_request()
    }

    /// Returns `true` for write requests.
    pub const fn is_write(self) -> bool {
        matches!(self, Self::WriteReq)
    }

    /// The response command matching this request, if any.
    pub const fn response(self) -> Option<Self> {
        match self {
            Self::ReadReq => Some(Self::ReadResp),
            Self::WriteReq => Some(Self::WriteResp),
            Self::ReadResp | Self::WriteResp | Self::Writeback => None,
        }
    }
}

/// A unit of memory traffic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    /// Command.
    pub cmd: MemCmd,
    /// Target address of the first byte.
    pub addr: PhysAddr,
    /// Access size in bytes.
    pub size: usize,
    /// Payload; write data on requests, read data on responses.
    pub data: Vec<u8>,
    /// Instruction tag (program counter) of the access.
    pub pc: u64,
    /// Whether the requester waits for a response.
    pub needs_response: bool,
    /// Outcome recorded by the predictor when the write passed the bridge.
    pub prediction: Option<PredictionOutcome>,
}

impl Packet {
    /// Builds a read request for `size` bytes at `addr`.
    pub const fn read(addr: PhysAddr, size: usize, pc: u64) -> Self {
        Self {
            cmd: MemCmd::ReadReq,
            addr,
            size,
            data: Vec::new(),
            pc,
            needs_response: true,
            prediction: None,
        }
    }

    /// Builds a write request carrying `data` to `addr`.
    pub fn write(addr: PhysAddr, data: Vec<u8>, pc: u64) -> Self {
        Self {
            cmd: MemCmd::WriteReq,
            addr,
            size: data.len(),
            data,
            pc,
            needs_response: true,
            prediction: None,
        }
    }

    /// Builds the writeback of a dirty line at `addr`.
    pub fn writeback(addr: PhysAddr, data: Vec<u8>) -> Self {
        Self {
            cmd: MemCmd::Writeback,
            addr,
            size: data.len(),
            data,
            pc: 0,
            needs_response: false,
            prediction: None,
        }
    }

    /// Marks the request as posted: no response will be returned.
    #[must_use]
    pub fn posted(mut self) -> Self {
        self.needs_response = false;
        self
    }

    /// Returns `true` for write requests.
    pub const fn is_write(&self) -> bool {
        self.cmd.is_write()
    }

    /// Returns `true` for cache writebacks.
    pub const fn is_writeback(&self) -> bool {
        matches!(self.cmd, MemCmd::Writeback)
    }

    /// Returns `true` for requests that will produce a response.
    pub const fn expects_response(&self) -> bool {
        self.cmd.is_request() && self.needs_response
    }

    /// Byte range touched by this packet.
    pub const fn range(&self) -> AddrRange {
        AddrRange::with_size(self.addr, self.size as u64)
    }

    /// Turns a request into its response in place.
    ///
    /// Write responses drop the payload; read responses carry `data`
    /// (truncated or zero-extended to the access size).
    #[must_use]
    pub fn into_response(mut self, data: Option<Vec<u8>>) -> Self {
        if let Some(cmd) = self.cmd.response() {
            self.cmd = cmd;
        }
        self.data = match self.cmd {
            MemCmd::ReadResp => {
                let mut bytes = data.unwrap_or_default();
                bytes.resize(self.size, 0);
                bytes
            }
            _ => Vec::new(),
        };
        self
    }
}
