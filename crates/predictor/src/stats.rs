//! Bridge and predictor statistics collection and reporting.
//!
//! This module tracks the named numeric series the bridge and predictor emit. It provides:
//! 1. **Bridge counters:** Accepted and refused intake, forwarding, stalls, and retries.
//! 2. **Prediction counters:** One counter per outcome category plus constant-write tracking.
//! 3. **Distributions:** Bucketed histograms for chunk matches, match distance, and history hits.
//! 4. **Reporting:** Section-selective text output to any writer.
//!
//! Counters are observational only; nothing here feeds back into a decision.

use std::collections::BTreeMap;
use std::io::{self, Write};

/// A bucketed histogram over `[min, max]`.
///
/// Samples below `min` or above `max` are counted as underflows or overflows
/// but still contribute to `samples`, `sum`, and the observed extremes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Distribution {
    min: u64,
    max: u64,
    bucket_size: u64,
    buckets: Vec<u64>,
    underflows: u64,
    overflows: u64,
    samples: u64,
    sum: u64,
    min_seen: Option<u64>,
    max_seen: Option<u64>,
}

impl Distribution {
    /// Creates an empty distribution with buckets of `bucket_size` covering `[min, max]`.
    ///
    /// A zero `bucket_size` is treated as one.
    pub fn new(min: u64, max: u64, bucket_size: u64) -> Self {
        let bucket_size = bucket_size.max(1);
        let span = max.saturating_sub(min);
        let count = (span / bucket_size + 1) as usize;
        Self {
            min,
            max,
            bucket_size,
            buckets: vec![0; count],
            underflows: 0,
            overflows: 0,
            samples: 0,
            sum: 0,
            min_seen: None,
            max_seen: None,
        }
    }

    /// Records one sample.
    pub fn sample(&mut self, value: u64) {
        self.samples += 1;
        self.sum = self.sum.saturating_add(value);
        self.min_seen = Some(self.min_seen.map_or(value, |m| m.min(value)));
        self.max_seen = Some(self.max_seen.map_or(value, |m| m.max(value)));
        if value < self.min {
            self.underflows += 1;
        } else if value > self.max {
            self.overflows += 1;
        } else {
            let idx = ((value - self.min) / self.bucket_size) as usize;
            self.buckets[idx] += 1;
        }
    }

    /// Number of samples recorded.
    pub const fn samples(&self) -> u64 {
        self.samples
    }

    /// Arithmetic mean of all samples, or zero when empty.
    pub fn mean(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.sum as f64 / self.samples as f64
        }
    }

    /// Per-bucket counts, lowest bucket first.
    pub fn buckets(&self) -> &[u64] {
        &self.buckets
    }

    /// Count in the bucket holding `value`, or `None` if out of range.
    pub fn bucket_count(&self, value: u64) -> Option<u64> {
        if value < self.min || value > self.max {
            return None;
        }
        self.buckets
            .get(((value - self.min) / self.bucket_size) as usize)
            .copied()
    }

    /// Samples that fell below the range.
    pub const fn underflows(&self) -> u64 {
        self.underflows
    }

    /// Samples that fell above the range.
    pub const fn overflows(&self) -> u64 {
        self.overflows
    }

    /// Smallest and largest sample seen, if any.
    pub const fn extremes(&self) -> Option<(u64, u64)> {
        match (self.min_seen, self.max_seen) {
            (Some(lo), Some(hi)) => Some((lo, hi)),
            _ => None,
        }
    }

    fn write_to<W: Write>(&self, out: &mut W, name: &str) -> io::Result<()> {
        writeln!(
            out,
            "  {:<28} samples: {:<8} mean: {:.2}",
            name,
            self.samples,
            self.mean()
        )?;
        for (i, count) in self.buckets.iter().enumerate() {
            if *count == 0 {
                continue;
            }
            let lo = self.min + i as u64 * self.bucket_size;
            let hi = lo + self.bucket_size - 1;
            writeln!(out, "    [{lo:>8}, {hi:>8}]  {count}")?;
        }
        if self.underflows > 0 || self.overflows > 0 {
            writeln!(
                out,
                "    underflows: {}  overflows: {}",
                self.underflows, self.overflows
            )?;
        }
        Ok(())
    }
}

/// Counters kept by the buffering shell.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Requests taken into the request queue.
    pub requests_accepted: u64,
    /// Requests refused with `Busy`.
    pub requests_refused: u64,
    /// Responses taken into the response queue.
    pub responses_accepted: u64,
    /// Responses refused with `Busy`.
    pub responses_refused: u64,
    /// Requests handed to the downstream peer.
    pub requests_forwarded: u64,
    /// Responses handed to the upstream peer.
    pub responses_forwarded: u64,
    /// Forward attempts the peer answered with `Busy`.
    pub peer_busy_stalls: u64,
    /// Space-available notifications sent to a previously refused upstream.
    pub stalled_request_retries: u64,
    /// Functional probes answered from a bridge queue.
    pub functional_hits: u64,
    /// Atomic accesses passed through.
    pub atomic_accesses: u64,
    /// Writes that did not go through the predictor.
    pub predictor_bypassed_writes: u64,
}

/// Counters and distributions kept by the prediction engine.
#[derive(Clone, Debug, PartialEq)]
pub struct PredictorStats {
    /// Writes classified.
    pub total_writes: u64,
    /// Address and full data matched.
    pub correctly_predicted: u64,
    /// Correct predictions whose fingerprint was not yet confident.
    pub correct_free: u64,
    /// Correct predictions the engine had committed to.
    pub correct_non_free: u64,
    /// Address matched, data did not.
    pub address_only: u64,
    /// Data matched a candidate at a different address.
    pub data_only: u64,
    /// A confident prediction was made and nothing matched.
    pub incorrectly_predicted: u64,
    /// No prediction was attempted or no candidate existed.
    pub non_predicted: u64,
    /// Writes whose fingerprint was confident enough to act on.
    pub address_predictions: u64,
    /// Matching chunks summed over address-matched comparisons.
    pub correctly_predicted_chunks: u64,
    /// Distinct fingerprints initialized.
    pub unique_fingerprints: u64,
    /// Writes repeating the learned constant of their address.
    pub constant_writes: u64,
    /// Correct predictions made from a candidate equal to the learned constant.
    pub correct_constant_predictions: u64,
    /// Correct predictions of an all-zero payload.
    pub correct_zero_predictions: u64,
    /// Completed writes dropped by the store's capacity policy.
    pub capacity_evictions: u64,
    /// Completed writes dropped by an invalidation.
    pub invalidated_predictions: u64,
    /// Trace records that could not be written.
    pub trace_failures: u64,
    /// Address-predicted writes per instruction tag.
    pub address_matches_by_pc: BTreeMap<u64, u64>,
    /// Matching chunks per comparison, every comparison.
    pub data_match: Distribution,
    /// Matching chunks per comparison against an address-matched candidate.
    pub addr_match_data_match: Distribution,
    /// Ticks from candidate completion to a correct prediction.
    pub match_distance: Distribution,
    /// Ticks from candidate completion to an address-only prediction.
    pub addr_match_distance: Distribution,
    /// Position of the fingerprint in its site's history when it repeated.
    pub ihb_match_index: Distribution,
    /// Ticks between successive writes to the same line.
    pub write_interval: Distribution,
    /// Ticks from a classified write to the writeback of its line.
    pub writeback_distance: Distribution,
    /// `writeback_distance` at fine resolution for short distances.
    pub writeback_distance_micro: Distribution,
}

impl PredictorStats {
    /// Creates zeroed statistics sized for `chunk_count` chunks and `ihb_depth` history slots.
    pub fn new(chunk_count: usize, ihb_depth: usize) -> Self {
        let chunks = chunk_count as u64;
        Self {
            total_writes: 0,
            correctly_predicted: 0,
            correct_free: 0,
            correct_non_free: 0,
            address_only: 0,
            data_only: 0,
            incorrectly_predicted: 0,
            non_predicted: 0,
            address_predictions: 0,
            correctly_predicted_chunks: 0,
            unique_fingerprints: 0,
            constant_writes: 0,
            correct_constant_predictions: 0,
            correct_zero_predictions: 0,
            capacity_evictions: 0,
            invalidated_predictions: 0,
            trace_failures: 0,
            address_matches_by_pc: BTreeMap::new(),
            data_match: Distribution::new(0, chunks, 1),
            addr_match_data_match: Distribution::new(0, chunks, 1),
            match_distance: Distribution::new(0, 1_000_000, 10_000),
            addr_match_distance: Distribution::new(0, 1_000_000, 10_000),
            ihb_match_index: Distribution::new(0, ihb_depth.saturating_sub(1) as u64, 1),
            write_interval: Distribution::new(0, 1_000_000, 10_000),
            writeback_distance: Distribution::new(0, 1_000_000, 10_000),
            writeback_distance_micro: Distribution::new(0, 1_000, 10),
        }
    }

    /// Fraction of classified writes that were correctly predicted, in percent.
    pub fn accuracy(&self) -> f64 {
        if self.total_writes == 0 {
            0.0
        } else {
            100.0 * self.correctly_predicted as f64 / self.total_writes as f64
        }
    }
}

/// Section names for selective stats output.
///
/// Pass an empty slice to [`Report::write_sections`] to write all sections.
pub const STATS_SECTIONS: &[&str] = &["summary", "bridge", "predictor", "distributions"];

/// A borrowed view over one bridge's statistics, ready for output.
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    /// Shell counters.
    pub bridge: &'a BridgeStats,
    /// Predictor counters; `None` when the predictor is disabled.
    pub predictor: Option<&'a PredictorStats>,
}

impl Report<'_> {
    /// Writes the requested sections to `out`.
    ///
    /// Each element of `sections` should be one of [`STATS_SECTIONS`]; an
    /// empty slice writes everything.
    ///
    /// # Errors
    ///
    /// Propagates any I/O error from `out`.
    pub fn write_sections<W: Write>(&self, out: &mut W, sections: &[String]) -> io::Result<()> {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let b = self.bridge;

        writeln!(out, "==========================================================")?;
        writeln!(out, "MEMORY BRIDGE STATISTICS")?;
        writeln!(out, "==========================================================")?;
        if want("summary") {
            writeln!(out, "req.forwarded            {}", b.requests_forwarded)?;
            writeln!(out, "resp.forwarded           {}", b.responses_forwarded)?;
            if let Some(p) = self.predictor {
                writeln!(out, "pred.writes              {}", p.total_writes)?;
                writeln!(out, "pred.accuracy            {:.2}%", p.accuracy())?;
            }
            writeln!(out, "----------------------------------------------------------")?;
        }
        if want("bridge") {
            writeln!(out, "BRIDGE")?;
            writeln!(out, "  req.accepted           {}", b.requests_accepted)?;
            writeln!(out, "  req.refused            {}", b.requests_refused)?;
            writeln!(out, "  resp.accepted          {}", b.responses_accepted)?;
            writeln!(out, "  resp.refused           {}", b.responses_refused)?;
            writeln!(out, "  peer.busy_stalls       {}", b.peer_busy_stalls)?;
            writeln!(out, "  retry.stalled_req      {}", b.stalled_request_retries)?;
            writeln!(out, "  functional.hits        {}", b.functional_hits)?;
            writeln!(out, "  atomic.accesses        {}", b.atomic_accesses)?;
            writeln!(out, "  pred.bypassed_writes   {}", b.predictor_bypassed_writes)?;
            writeln!(out, "----------------------------------------------------------")?;
        }
        if let Some(p) = self.predictor {
            if want("predictor") {
                let pct = |n: u64| {
                    if p.total_writes == 0 {
                        0.0
                    } else {
                        100.0 * n as f64 / p.total_writes as f64
                    }
                };
                writeln!(out, "PREDICTOR")?;
                writeln!(
                    out,
                    "  correct                {} ({:.2}%)",
                    p.correctly_predicted,
                    pct(p.correctly_predicted)
                )?;
                writeln!(
                    out,
                    "  addr_only              {} ({:.2}%)",
                    p.address_only,
                    pct(p.address_only)
                )?;
                writeln!(
                    out,
                    "  data_only              {} ({:.2}%)",
                    p.data_only,
                    pct(p.data_only)
                )?;
                writeln!(
                    out,
                    "  incorrect              {} ({:.2}%)",
                    p.incorrectly_predicted,
                    pct(p.incorrectly_predicted)
                )?;
                writeln!(
                    out,
                    "  non_predicted          {} ({:.2}%)",
                    p.non_predicted,
                    pct(p.non_predicted)
                )?;
                writeln!(out, "    free                 {}", p.correct_free)?;
                writeln!(out, "    non_free             {}", p.correct_non_free)?;
                writeln!(out, "  addr_predictions       {}", p.address_predictions)?;
                writeln!(out, "  predicted_chunks       {}", p.correctly_predicted_chunks)?;
                writeln!(out, "  unique_fingerprints    {}", p.unique_fingerprints)?;
                writeln!(out, "  constant_writes        {}", p.constant_writes)?;
                writeln!(out, "  correct_const          {}", p.correct_constant_predictions)?;
                writeln!(out, "  correct_zero           {}", p.correct_zero_predictions)?;
                writeln!(out, "  capacity_evictions     {}", p.capacity_evictions)?;
                writeln!(out, "  invalidated            {}", p.invalidated_predictions)?;
                if !p.address_matches_by_pc.is_empty() {
                    writeln!(out, "  addr_matches by pc")?;
                    for (pc, count) in &p.address_matches_by_pc {
                        writeln!(out, "    {pc:#018x}   {count}")?;
                    }
                }
                writeln!(out, "----------------------------------------------------------")?;
            }
            if want("distributions") {
                writeln!(out, "DISTRIBUTIONS")?;
                p.data_match.write_to(out, "data_match_chunks")?;
                p.addr_match_data_match.write_to(out, "addr_match_data_chunks")?;
                p.match_distance.write_to(out, "match_distance")?;
                p.addr_match_distance.write_to(out, "addr_match_distance")?;
                p.ihb_match_index.write_to(out, "ihb_match_index")?;
                p.write_interval.write_to(out, "write_interval")?;
                p.writeback_distance.write_to(out, "writeback_distance")?;
                p.writeback_distance_micro
                    .write_to(out, "writeback_distance_micro")?;
            }
        }
        writeln!(out, "==========================================================")
    }

    /// Writes all sections to stdout.
    ///
    /// # Errors
    ///
    /// Propagates any I/O error from stdout.
    pub fn print(&self) -> io::Result<()> {
        self.write_sections(&mut io::stdout().lock(), &[])
    }
}
