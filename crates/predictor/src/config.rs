//! Configuration system for the bridge and write predictor.
//!
//! This module defines all configuration structures used to parameterize the
//! bridge and its predictor. It provides:
//! 1. **Defaults:** Baseline queue limits, delay, store capacity, and confidence geometry.
//! 2. **Structures:** Hierarchical config for the bridge shell and the prediction engine.
//! 3. **Validation:** Rejection of configurations that cannot produce a working model.
//!
//! Configuration is supplied as JSON (`Config::from_json`) or built from `Config::default()`.

use serde::Deserialize;

use crate::common::constants::{self, MAX_CHUNKS, MAX_CONFIDENCE_BITS};
use crate::common::{AddrRange, ConfigError};

/// Default configuration constants.
///
/// These values define the baseline bridge and predictor when not explicitly
/// overridden in the configuration document.
mod defaults {
    use crate::common::constants;

    /// Request queue limit in packets.
    pub const REQ_QUEUE_LIMIT: usize = 16;

    /// Response queue limit in packets (reserved plus queued).
    pub const RESP_QUEUE_LIMIT: usize = 16;

    /// Fixed per-hop delay in ticks.
    pub const DELAY: u64 = 50;

    /// Maximum number of completed writes remembered across all lines.
    pub const STORE_CAPACITY: usize = 1024;

    /// Confidence counter width in bits.
    pub const CONFIDENCE_BITS: u8 = constants::CONFIDENCE_BITS;

    /// Counter value that authorizes acting on a prediction.
    pub const CONFIDENCE_THRESHOLD: u8 = constants::CONFIDENCE_THRESHOLD;

    /// Line size in bytes.
    pub const LINE_BYTES: usize = constants::LINE_BYTES;

    /// Chunk size in bytes.
    pub const CHUNK_BYTES: usize = constants::CHUNK_BYTES;

    /// Instruction history depth per access site.
    pub const IHB_DEPTH: usize = constants::IHB_DEPTH;
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use wpred_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.bridge.req_queue_limit, 16);
/// assert!(config.predictor.enabled);
/// ```
///
/// Deserializing from JSON:
///
/// ```
/// use wpred_core::config::Config;
///
/// let json = r#"{
///     "bridge": { "req_queue_limit": 2, "resp_queue_limit": 2, "delay": 1 },
///     "predictor": { "store_capacity": 2, "chunk_bytes": 16 }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.bridge.delay, 1);
/// assert_eq!(config.predictor.chunk_count(), 4);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Buffering and forwarding shell
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Write-completion predictor
    #[serde(default)]
    pub predictor: PredictorConfig,
}

impl Config {
    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] for malformed documents and any
    /// validation error from [`Config::validate`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every section for values that cannot produce a working model.
    ///
    /// # Errors
    ///
    /// Returns the first offending value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bridge.validate()?;
        self.predictor.validate()
    }
}

/// Bridge queueing and timing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Request queue limit
    #[serde(default = "BridgeConfig::default_req_limit")]
    pub req_queue_limit: usize,

    /// Response queue limit, counting reserved slots
    #[serde(default = "BridgeConfig::default_resp_limit")]
    pub resp_queue_limit: usize,

    /// Fixed delay in ticks between intake and forwarding
    #[serde(default = "BridgeConfig::default_delay")]
    pub delay: u64,

    /// Address ranges claimed by the bridge; empty claims everything
    #[serde(default)]
    pub ranges: Vec<AddrRange>,
}

impl BridgeConfig {
    /// Returns the default request queue limit.
    fn default_req_limit() -> usize {
        defaults::REQ_QUEUE_LIMIT
    }

    /// Returns the default response queue limit.
    fn default_resp_limit() -> usize {
        defaults::RESP_QUEUE_LIMIT
    }

    /// Returns the default per-hop delay.
    fn default_delay() -> u64 {
        defaults::DELAY
    }

    /// Rejects values that cannot produce a working bridge.
    ///
    /// # Errors
    ///
    /// Returns the first offending value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.req_queue_limit == 0 {
            return Err(ConfigError::ZeroCapacity("bridge.req_queue_limit"));
        }
        if self.resp_queue_limit == 0 {
            return Err(ConfigError::ZeroCapacity("bridge.resp_queue_limit"));
        }
        Ok(())
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            req_queue_limit: defaults::REQ_QUEUE_LIMIT,
            resp_queue_limit: defaults::RESP_QUEUE_LIMIT,
            delay: defaults::DELAY,
            ranges: Vec::new(),
        }
    }
}

/// Prediction engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictorConfig {
    /// Run the predictor; when false the bridge forwards traffic untouched
    #[serde(default = "PredictorConfig::default_enabled")]
    pub enabled: bool,

    /// Maximum completed writes held across all lines
    #[serde(default = "PredictorConfig::default_store_capacity")]
    pub store_capacity: usize,

    /// Confidence counter width in bits
    #[serde(default = "PredictorConfig::default_confidence_bits")]
    pub confidence_bits: u8,

    /// Counter value that authorizes acting on a prediction
    #[serde(default = "PredictorConfig::default_confidence_threshold")]
    pub confidence_threshold: u8,

    /// Line size in bytes; completed writes are grouped by line
    #[serde(default = "PredictorConfig::default_line_bytes")]
    pub line_bytes: usize,

    /// Chunk size in bytes for sub-line comparison
    #[serde(default = "PredictorConfig::default_chunk_bytes")]
    pub chunk_bytes: usize,

    /// Instruction history depth per access site
    #[serde(default = "PredictorConfig::default_ihb_depth")]
    pub ihb_depth: usize,

    /// Ranges whose writes are observed; empty observes every line-sized write
    #[serde(default)]
    pub persistent_ranges: Vec<AddrRange>,

    /// Emit a trace record per observed write
    #[serde(default)]
    pub trace: bool,
}

impl PredictorConfig {
    /// Returns the default enable flag.
    fn default_enabled() -> bool {
        true
    }

    /// Returns the default completed-write store capacity.
    fn default_store_capacity() -> usize {
        defaults::STORE_CAPACITY
    }

    /// Returns the default confidence counter width.
    fn default_confidence_bits() -> u8 {
        defaults::CONFIDENCE_BITS
    }

    /// Returns the default confidence threshold.
    fn default_confidence_threshold() -> u8 {
        defaults::CONFIDENCE_THRESHOLD
    }

    /// Returns the default line size.
    fn default_line_bytes() -> usize {
        defaults::LINE_BYTES
    }

    /// Returns the default chunk size.
    fn default_chunk_bytes() -> usize {
        defaults::CHUNK_BYTES
    }

    /// Returns the default instruction history depth.
    fn default_ihb_depth() -> usize {
        defaults::IHB_DEPTH
    }

    /// Number of chunks per line.
    pub const fn chunk_count(&self) -> usize {
        if self.chunk_bytes == 0 {
            0
        } else {
            self.line_bytes / self.chunk_bytes
        }
    }

    /// Largest value a confidence counter can hold.
    pub const fn confidence_max(&self) -> u8 {
        if self.confidence_bits >= 8 {
            u8::MAX
        } else {
            (1u8 << self.confidence_bits) - 1
        }
    }

    /// Rejects values that cannot produce a working predictor.
    ///
    /// # Errors
    ///
    /// Returns the first offending value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("predictor.store_capacity"));
        }
        if self.ihb_depth == 0 {
            return Err(ConfigError::ZeroCapacity("predictor.ihb_depth"));
        }
        if self.line_bytes == 0 {
            return Err(ConfigError::ZeroCapacity("predictor.line_bytes"));
        }
        if self.chunk_bytes == 0 {
            return Err(ConfigError::ZeroCapacity("predictor.chunk_bytes"));
        }
        if !self.line_bytes.is_power_of_two() {
            return Err(ConfigError::LineNotPowerOfTwo(self.line_bytes));
        }
        if self.line_bytes % self.chunk_bytes != 0 {
            return Err(ConfigError::ChunkDoesNotDivideLine {
                line: self.line_bytes,
                chunk: self.chunk_bytes,
            });
        }
        if self.chunk_count() > MAX_CHUNKS {
            return Err(ConfigError::TooManyChunks(self.chunk_count()));
        }
        if self.confidence_bits == 0 || self.confidence_bits > MAX_CONFIDENCE_BITS {
            return Err(ConfigError::ConfidenceWidth(self.confidence_bits));
        }
        if self.confidence_threshold > self.confidence_max() {
            return Err(ConfigError::ThresholdOutOfRange {
                threshold: self.confidence_threshold,
                max: self.confidence_max(),
            });
        }
        Ok(())
    }
}

impl Default for PredictorConfig {
    /// Creates the reference predictor: 2-bit counters acting at 1, 64-byte
    /// lines split into eight 8-byte chunks, and a five-deep history.
    fn default() -> Self {
        Self {
            enabled: true,
            store_capacity: defaults::STORE_CAPACITY,
            confidence_bits: defaults::CONFIDENCE_BITS,
            confidence_threshold: defaults::CONFIDENCE_THRESHOLD,
            line_bytes: defaults::LINE_BYTES,
            chunk_bytes: defaults::CHUNK_BYTES,
            ihb_depth: defaults::IHB_DEPTH,
            persistent_ranges: Vec::new(),
            trace: false,
        }
    }
}

const _: () = assert!(constants::LINE_BYTES % constants::CHUNK_BYTES == 0);
