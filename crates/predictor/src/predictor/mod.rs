//! Speculative write-completion predictor.
//!
//! For every write crossing the bridge the engine decides whether a
//! previously completed write already predicted its destination address,
//! its payload, both, or neither. It provides:
//! 1. **Store:** Bounded, line-grouped history of completed writes (`store`).
//! 2. **Confidence:** Saturating counters per access fingerprint (`confidence`).
//! 3. **Chunk matching:** Sub-line payload comparison (`chunk`).
//! 4. **History:** Per-site fingerprint rings biasing candidate choice (`ihb`).
//! 5. **Constants:** Per-address payloads that keep repeating (`constant`).
//! 6. **Broadcast and trace:** Outcome fan-out (`observer`) and per-write records (`trace`).
//!
//! Invalidating the tables drops every completed write and learned constant at
//! once; confidence and history survive.
//!
//! The tables are process-lifetime state and may be shared between several
//! engines through [`SharedTables`]; every entry point locks them once.

/// Chunk-by-chunk payload comparison.
pub mod chunk;

/// Fingerprint-keyed saturating counters.
pub mod confidence;

/// Per-address learned constants.
pub mod constant;

/// Per-site instruction history buffers.
pub mod ihb;

/// Prediction outcome broadcast.
pub mod observer;

/// Bounded store of completed writes.
pub mod store;

/// Per-write trace records and sinks.
pub mod trace;

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use self::chunk::{ChunkMatchVec, ChunkMatcher};
use self::confidence::ConfidenceTable;
use self::constant::ConstantTracker;
use self::ihb::HistoryTable;
use self::observer::{Broadcaster, PredictionObserver};
use self::store::{CompletedWriteEntry, CompletedWriteStore, LastSeenManager};
use self::trace::{TraceRecord, TraceSink};
use crate::common::constants::CONFIDENCE_INITIAL;
use crate::common::{ConfigError, Packet, PhysAddr, PredictorError, Tick};
use crate::config::PredictorConfig;
use crate::stats::PredictorStats;

/// Confidence-table key derived from an address and an instruction tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Derives the fingerprint of a write to `addr` issued by instruction `pc`.
    ///
    /// Stable across runs and platforms for the same `(addr, pc)`.
    pub const fn of(addr: PhysAddr, pc: u64) -> Self {
        Self(mix64(addr.val() ^ pc.rotate_left(29)))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// SplitMix64 finalizer.
const fn mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Classification of one incoming write.
///
/// Exactly one category applies; address matches take priority over
/// data-only matches on a different candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum PredictionOutcome {
    /// Address and every chunk of the payload matched.
    Correct,
    /// Address matched, payload did not match in full.
    AddressOnly,
    /// No candidate at this address, but one on the line carried the full payload.
    DataOnly,
    /// The fingerprint was confident and nothing matched.
    Incorrect,
    /// No candidate existed, or the fingerprint was not confident and nothing matched.
    NonPredicted,
}

impl PredictionOutcome {
    /// Whether the destination address was predicted.
    pub const fn address_predicted(self) -> bool {
        matches!(self, Self::Correct | Self::AddressOnly)
    }

    /// Whether the full payload was predicted.
    pub const fn data_predicted(self) -> bool {
        matches!(self, Self::Correct | Self::DataOnly)
    }

    /// Whether the outcome trains its fingerprint upward.
    pub const fn is_correct(self) -> bool {
        matches!(self, Self::Correct)
    }
}

/// Everything the engine concluded about one write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Prediction {
    /// Confidence-table key of the write.
    pub fingerprint: Fingerprint,
    /// Classification.
    pub outcome: PredictionOutcome,
    /// Whether the fingerprint was confident enough to act on before this write.
    pub attempted: bool,
    /// Counter value after training; `None` when no candidate existed.
    pub confidence: Option<u8>,
    /// Match bits against the compared candidate, if one was compared.
    pub chunks: Option<ChunkMatchVec>,
    /// Candidates found on the write's line.
    pub candidates: usize,
    /// Whether the payload repeated the address's learned constant.
    pub constant_write: bool,
    /// Whether recording this write evicted an older one.
    pub evicted: bool,
}

/// Process-lifetime predictor state.
#[derive(Debug)]
pub struct PredictorTables {
    /// Completed writes by line.
    pub store: CompletedWriteStore,
    /// Confidence per fingerprint.
    pub confidence: ConfidenceTable,
    /// Learned constants per address.
    pub constants: ConstantTracker,
    /// Recent fingerprints per site.
    pub history: HistoryTable,
    /// Last write tick per line.
    pub last_seen: LastSeenManager,
}

/// Predictor state shared by every engine it was handed to.
pub type SharedTables = Arc<Mutex<PredictorTables>>;

impl PredictorTables {
    /// Builds empty tables for `config`.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value in `config`.
    pub fn new(config: &PredictorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store: CompletedWriteStore::new(config.store_capacity, config.line_bytes),
            confidence: ConfidenceTable::new(
                config.confidence_max(),
                config.confidence_threshold,
                CONFIDENCE_INITIAL,
            ),
            constants: ConstantTracker::new(),
            history: HistoryTable::new(config.ihb_depth),
            last_seen: LastSeenManager::new(),
        })
    }

    /// Builds empty tables ready to hand to several engines.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value in `config`.
    pub fn shared(config: &PredictorConfig) -> Result<SharedTables, ConfigError> {
        Ok(Arc::new(Mutex::new(Self::new(config)?)))
    }

    /// Forgets every completed write and learned constant.
    ///
    /// Returns the number of completed writes dropped.
    pub fn invalidate_all(&mut self) -> usize {
        self.constants.clear();
        self.store.invalidate_all()
    }
}

/// Classifies writes against the completed-write history and trains the model.
pub struct PredictionEngine {
    config: PredictorConfig,
    matcher: ChunkMatcher,
    tables: SharedTables,
    observers: Broadcaster,
    trace: Option<Box<dyn TraceSink>>,
    /// Tick of the last classified write per line, awaiting its writeback.
    pending_writebacks: HashMap<PhysAddr, Tick>,
    stats: PredictorStats,
}

impl PredictionEngine {
    /// Creates an engine with its own private tables.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value in `config`.
    pub fn new(config: &PredictorConfig) -> Result<Self, ConfigError> {
        let tables = PredictorTables::shared(config)?;
        Self::with_tables(config, tables)
    }

    /// Creates an engine over tables shared with other engines.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value in `config`.
    pub fn with_tables(config: &PredictorConfig, tables: SharedTables) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            capacity = config.store_capacity,
            line_bytes = config.line_bytes,
            chunks = config.chunk_count(),
            confidence_max = config.confidence_max(),
            threshold = config.confidence_threshold,
            "prediction engine ready"
        );
        Ok(Self {
            matcher: ChunkMatcher::new(config.line_bytes, config.chunk_bytes),
            stats: PredictorStats::new(config.chunk_count(), config.ihb_depth),
            config: config.clone(),
            tables,
            observers: Broadcaster::new(),
            trace: None,
            pending_writebacks: HashMap::new(),
        })
    }

    /// Registers an outcome observer.
    pub fn add_observer(&mut self, observer: Box<dyn PredictionObserver>) {
        self.observers.register(observer);
    }

    /// Installs the destination for per-write trace records.
    ///
    /// Records are only produced while `trace` is enabled in the config.
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.trace = Some(sink);
    }

    /// Removes and returns the trace sink, flushing it first.
    pub fn take_trace_sink(&mut self) -> Option<Box<dyn TraceSink>> {
        let mut sink = self.trace.take()?;
        if let Err(err) = sink.flush() {
            warn!(%err, "trace flush failed");
            self.stats.trace_failures += 1;
        }
        Some(sink)
    }

    /// Handle to the tables, for sharing with another engine.
    pub fn tables(&self) -> SharedTables {
        Arc::clone(&self.tables)
    }

    /// Statistics gathered by this engine.
    pub const fn stats(&self) -> &PredictorStats {
        &self.stats
    }

    /// Configuration the engine was built with.
    pub const fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Drops every completed write and learned constant in the tables.
    ///
    /// Returns the number of completed writes that can no longer serve as
    /// candidates.
    pub fn invalidate_all(&mut self) -> usize {
        let dropped = self
            .tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .invalidate_all();
        self.stats.invalidated_predictions += dropped as u64;
        info!(dropped, "predictor tables invalidated");
        dropped
    }

    /// Notes the writeback of a line this engine classified a write to.
    ///
    /// Returns the ticks elapsed since that write, or `None` if no classified
    /// write to the line is awaiting a writeback.
    pub fn observe_writeback(&mut self, pkt: &Packet, now: Tick) -> Option<Tick> {
        let line = pkt.addr.line_aligned(self.config.line_bytes as u64);
        let written = self.pending_writebacks.remove(&line)?;
        let distance = now.saturating_sub(written);
        self.stats.writeback_distance.sample(distance);
        self.stats.writeback_distance_micro.sample(distance);
        Some(distance)
    }

    /// Returns `true` if `pkt` is a write this engine classifies: line-sized
    /// and, when persistent ranges are configured, inside one of them.
    pub fn observes(&self, pkt: &Packet) -> bool {
        pkt.is_write()
            && pkt.data.len() == self.config.line_bytes
            && (self.config.persistent_ranges.is_empty()
                || self
                    .config
                    .persistent_ranges
                    .iter()
                    .any(|r| r.covers(&pkt.range())))
    }

    /// Classifies a write, trains the model, broadcasts the outcome, and
    /// records the write as completed.
    ///
    /// # Errors
    ///
    /// Returns [`PredictorError::PayloadLengthMismatch`] if the payload is not
    /// exactly one line. Other errors indicate corrupted internal state.
    pub fn observe_write(&mut self, pkt: &Packet, now: Tick) -> Result<Prediction, PredictorError> {
        if pkt.data.len() != self.config.line_bytes {
            return Err(PredictorError::PayloadLengthMismatch {
                expected: self.config.line_bytes,
                found: pkt.data.len(),
            });
        }

        let addr = pkt.addr;
        let data = pkt.data.as_slice();
        let fp = Fingerprint::of(addr, pkt.pc);

        let mut guard = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let tables = &mut *guard;
        let stats = &mut self.stats;

        stats.total_writes += 1;
        if tables.confidence.init(fp) {
            stats.unique_fingerprints += 1;
        }
        let attempted = tables.confidence.is_confident(fp);

        let line = tables.store.key(addr);
        if let Some(interval) = tables.last_seen.touch(line, now) {
            stats.write_interval.sample(interval);
        }

        let constant_write = match tables.constants.learned(addr) {
            Some(pattern) => self.matcher.compare(data, pattern)?.is_full(),
            None => false,
        };
        if constant_write {
            stats.constant_writes += 1;
        }

        let candidates = tables.store.lookup(addr);
        let candidate_count = candidates.len();
        let mut chunks = None;
        let mut confidence = None;

        let outcome = if candidates.is_empty() {
            PredictionOutcome::NonPredicted
        } else {
            if attempted {
                stats.address_predictions += 1;
            }
            let repeated = tables.history.position(pkt.pc, fp);
            if let Some(age) = repeated {
                stats.ihb_match_index.sample(age as u64);
            }

            let outcome = match select_candidate(candidates, addr, pkt.pc, repeated.is_some()) {
                Some(candidate) => {
                    let vec = self.matcher.compare_to_candidate(data, candidate)?;
                    let matched = u64::from(vec.count());
                    let distance = now.saturating_sub(candidate.completed_at());
                    stats.data_match.sample(matched);
                    stats.addr_match_data_match.sample(matched);
                    stats.correctly_predicted_chunks += matched;
                    chunks = Some(vec);

                    if vec.is_full() {
                        stats.match_distance.sample(distance);
                        if let Some(pattern) = tables.constants.learned(addr)
                            && self.matcher.compare_to_constant(candidate, pattern)?.is_full()
                        {
                            stats.correct_constant_predictions += 1;
                        }
                        if data.iter().all(|b| *b == 0) {
                            stats.correct_zero_predictions += 1;
                        }
                        if attempted {
                            stats.correct_non_free += 1;
                        } else {
                            stats.correct_free += 1;
                        }
                        PredictionOutcome::Correct
                    } else {
                        stats.addr_match_distance.sample(distance);
                        PredictionOutcome::AddressOnly
                    }
                }
                None => {
                    let mut data_hit = false;
                    for candidate in candidates.iter().rev() {
                        let vec = self.matcher.compare_to_candidate(data, candidate)?;
                        stats.data_match.sample(u64::from(vec.count()));
                        if chunks.is_none() {
                            chunks = Some(vec);
                        }
                        if vec.is_full() {
                            chunks = Some(vec);
                            data_hit = true;
                            break;
                        }
                    }
                    if data_hit {
                        PredictionOutcome::DataOnly
                    } else if attempted {
                        PredictionOutcome::Incorrect
                    } else {
                        PredictionOutcome::NonPredicted
                    }
                }
            };

            confidence = Some(tables.confidence.update(fp, outcome.is_correct())?);
            outcome
        };

        match outcome {
            PredictionOutcome::Correct => stats.correctly_predicted += 1,
            PredictionOutcome::AddressOnly => stats.address_only += 1,
            PredictionOutcome::DataOnly => stats.data_only += 1,
            PredictionOutcome::Incorrect => stats.incorrectly_predicted += 1,
            PredictionOutcome::NonPredicted => stats.non_predicted += 1,
        }
        if outcome.address_predicted() {
            *stats.address_matches_by_pc.entry(pkt.pc).or_default() += 1;
        }

        tables.constants.observe(addr, data);
        tables.history.push(pkt.pc, fp);
        let evicted = tables
            .store
            .record(CompletedWriteEntry::new(addr, data, pkt.pc, now))
            .is_some();
        if evicted {
            stats.capacity_evictions += 1;
        }
        drop(guard);
        let _ = self.pending_writebacks.insert(line, now);

        debug!(
            %addr,
            pc = pkt.pc,
            %fp,
            ?outcome,
            attempted,
            candidates = candidate_count,
            "write classified"
        );

        self.observers
            .broadcast(fp, outcome.address_predicted(), outcome.data_predicted());

        if self.config.trace
            && let Some(sink) = self.trace.as_mut()
        {
            let record = TraceRecord {
                tick: now,
                addr,
                pc: pkt.pc,
                fingerprint: fp,
                outcome,
                address_predicted: outcome.address_predicted(),
                data_predicted: outcome.data_predicted(),
                matching_chunks: chunks.map(ChunkMatchVec::count),
            };
            if let Err(err) = sink.record(&record) {
                warn!(%err, "trace record dropped");
                self.stats.trace_failures += 1;
            }
        }

        Ok(Prediction {
            fingerprint: fp,
            outcome,
            attempted,
            confidence,
            chunks,
            candidates: candidate_count,
            constant_write,
            evicted,
        })
    }
}

impl fmt::Debug for PredictionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredictionEngine")
            .field("config", &self.config)
            .field("observers", &self.observers)
            .field("tracing", &self.trace.is_some())
            .field("pending_writebacks", &self.pending_writebacks.len())
            .finish_non_exhaustive()
    }
}

/// Picks the candidate at exactly `addr` to compare against.
///
/// The most recent address match wins, unless the fingerprint repeated in its
/// site's history, in which case the most recent match written by the same
/// site is preferred.
fn select_candidate(
    candidates: &VecDeque<CompletedWriteEntry>,
    addr: PhysAddr,
    pc: u64,
    repeated: bool,
) -> Option<&CompletedWriteEntry> {
    let mut at_addr = candidates.iter().rev().filter(|c| c.addr() == addr);
    if repeated
        && let Some(same_site) = at_addr.clone().find(|c| c.pc() == pc)
    {
        return Some(same_site);
    }
    at_addr.next()
}
