//! Confidence table.
//!
//! A fingerprint-keyed table of small saturating counters. A counter rises on
//! every correct prediction and falls on every miss; once it reaches the
//! threshold the engine treats its fingerprint as confident enough to act on.
//!
//! Counters are created lazily by `init` and never as a side effect of an
//! update, so an update for an unknown fingerprint is an invariant violation.

use std::collections::HashMap;

use super::Fingerprint;
use crate::common::PredictorError;

/// An unsigned counter clamped to `[0, max]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaturatingCounter {
    value: u8,
    max: u8,
}

impl SaturatingCounter {
    /// Creates a counter at `value` (clamped to `max`).
    pub fn new(value: u8, max: u8) -> Self {
        Self {
            value: value.min(max),
            max,
        }
    }

    /// Current value.
    pub const fn value(self) -> u8 {
        self.value
    }

    /// Moves one step towards `max`, stopping there.
    pub const fn increment(&mut self) {
        if self.value < self.max {
            self.value += 1;
        }
    }

    /// Moves one step towards zero, stopping there.
    pub const fn decrement(&mut self) {
        if self.value > 0 {
            self.value -= 1;
        }
    }
}

/// Fingerprint-keyed saturating counters.
#[derive(Debug)]
pub struct ConfidenceTable {
    counters: HashMap<Fingerprint, SaturatingCounter>,
    max: u8,
    threshold: u8,
    initial: u8,
}

impl ConfidenceTable {
    /// Creates an empty table of counters in `[0, max]` that act at `threshold`.
    pub fn new(max: u8, threshold: u8, initial: u8) -> Self {
        Self {
            counters: HashMap::new(),
            max,
            threshold,
            initial: initial.min(max),
        }
    }

    /// Inserts a neutral counter for `fp` if absent.
    ///
    /// Returns `true` if the fingerprint was new.
    pub fn init(&mut self, fp: Fingerprint) -> bool {
        if self.counters.contains_key(&fp) {
            return false;
        }
        let _ = self
            .counters
            .insert(fp, SaturatingCounter::new(self.initial, self.max));
        true
    }

    /// Current value for `fp`, or `None` if it was never initialized.
    pub fn get(&self, fp: Fingerprint) -> Option<u8> {
        self.counters.get(&fp).map(|c| c.value())
    }

    /// Trains the counter for `fp` with the outcome of a prediction.
    ///
    /// Returns the new counter value.
    ///
    /// # Errors
    ///
    /// Returns [`PredictorError::UninitializedFingerprint`] if `init` was
    /// never called for `fp`.
    pub fn update(&mut self, fp: Fingerprint, was_correct: bool) -> Result<u8, PredictorError> {
        let counter = self
            .counters
            .get_mut(&fp)
            .ok_or(PredictorError::UninitializedFingerprint(fp))?;
        if was_correct {
            counter.increment();
        } else {
            counter.decrement();
        }
        Ok(counter.value())
    }

    /// Returns `true` if `fp` is initialized and at or above the threshold.
    pub fn is_confident(&self, fp: Fingerprint) -> bool {
        self.get(fp).is_some_and(|v| v >= self.threshold)
    }

    /// Largest value any counter can hold.
    pub const fn max(&self) -> u8 {
        self.max
    }

    /// Value at which a counter authorizes acting on a prediction.
    pub const fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Number of initialized fingerprints.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Returns `true` if no fingerprint has been initialized.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}
