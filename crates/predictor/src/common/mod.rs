//! Common types shared by the bridge and the predictor.
//!
//! This module provides fundamental building blocks used across the crate. It includes:
//! 1. **Address Types:** Physical addresses, half-open ranges, and simulated ticks.
//! 2. **Packets:** The traffic unit forwarded by the bridge.
//! 3. **Constants:** Reference geometry and confidence parameters.
//! 4. **Error Handling:** Configuration errors, invariant violations, and refusal results.

/// Address, range, and tick types.
pub mod addr;

/// Reference constants for line geometry and confidence counters.
pub mod constants;

/// Error types.
pub mod error;

/// Memory packets and commands.
pub mod packet;

pub use addr::{AddrRange, PhysAddr, Tick};
pub use error::{ConfigError, PredictorError, RecvError};
pub use packet::{MemCmd, Packet};
