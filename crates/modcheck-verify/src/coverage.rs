//! Coverage accounting for the stimulus and verdict space.
//!
//! Three dimensions are tracked:
//! - **Stream length**: equal-width buckets over `[1, max_len]` (the empty
//!   stream clamps into the first bucket)
//! - **Stream value**: equal-width buckets over the `max_len`-bit range
//! - **Verdict**: covered only once both booleans have been observed
//!
//! Counts are monotone for the whole session; the tracker is created fresh
//! at session start and never reset mid-run.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::VerdictRecord;
use crate::stimulus::StreamRecord;

const NUM_BUCKETS: u64 = 8;

/// Hit counters for one binned dimension, keyed by a human-readable range
/// label in insertion order.
#[derive(Debug, Clone)]
struct BinnedDim {
    /// label -> hits; bucket index is the map index
    buckets: IndexMap<String, u64>,
    /// upper bound of the binned domain (inclusive)
    domain_max: u64,
    width: u64,
}

impl BinnedDim {
    fn new(domain_max: u64) -> Self {
        let target = NUM_BUCKETS.min(domain_max.saturating_add(1));
        // ceil((domain_max + 1) / target), then only as many buckets as the
        // domain actually fills, so every bucket is reachable
        let width = (domain_max + target) / target;
        let num = (domain_max + width) / width;
        let mut buckets = IndexMap::new();
        for i in 0..num {
            let lo = i * width;
            let hi = ((i + 1) * width - 1).min(domain_max);
            buckets.insert(format!("{lo}..={hi}"), 0);
        }
        BinnedDim {
            buckets,
            domain_max,
            width,
        }
    }

    fn record(&mut self, sample: u64) {
        let idx = (sample.min(self.domain_max) / self.width) as usize;
        let idx = idx.min(self.buckets.len() - 1);
        if let Some((_, hits)) = self.buckets.get_index_mut(idx) {
            *hits += 1;
        }
    }

    fn covered(&self) -> usize {
        self.buckets.values().filter(|&&hits| hits > 0).count()
    }

    fn total(&self) -> usize {
        self.buckets.len()
    }

    fn uncovered_labels(&self) -> Vec<&str> {
        self.buckets
            .iter()
            .filter(|(_, &hits)| hits == 0)
            .map(|(label, _)| label.as_str())
            .collect()
    }
}

/// Coverage metrics summary, queryable at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageMetrics {
    pub length_covered: usize,
    pub length_total: usize,
    pub length_pct: f64,
    pub value_covered: usize,
    pub value_total: usize,
    pub value_pct: f64,
    /// Both verdict outcomes seen at least once.
    pub verdict_covered: bool,
    pub verdict_pct: f64,
    pub overall_pct: f64,
    pub streams_sampled: u64,
}

/// Accumulating coverage database for one session.
#[derive(Debug, Clone)]
pub struct CoverageTracker {
    length: BinnedDim,
    value: BinnedDim,
    verdict_hits: [u64; 2],
    streams_sampled: u64,
}

impl CoverageTracker {
    /// `max_len` bounds both binned domains; values live in the
    /// `max_len`-bit range. `max_len` must not exceed 63.
    pub fn new(max_len: u32) -> Self {
        let value_max = if max_len == 0 {
            0
        } else {
            (1u64 << max_len) - 1
        };
        CoverageTracker {
            length: BinnedDim::new(u64::from(max_len)),
            value: BinnedDim::new(value_max),
            verdict_hits: [0, 0],
            streams_sampled: 0,
        }
    }

    /// Bin one delivered stream.
    pub fn sample_stimulus(&mut self, stream: &StreamRecord) {
        self.length.record(u64::from(stream.bit_length));
        self.value.record(stream.value);
        self.streams_sampled += 1;
    }

    /// Bin one observed verdict.
    pub fn sample_result(&mut self, verdict: &VerdictRecord) {
        self.verdict_hits[usize::from(verdict.result)] += 1;
    }

    /// Current metrics; counts only ever grow.
    pub fn metrics(&self) -> CoverageMetrics {
        let pct = |covered: usize, total: usize| {
            if total > 0 {
                (covered as f64 / total as f64) * 100.0
            } else {
                100.0
            }
        };

        let verdict_seen = self.verdict_hits.iter().filter(|&&h| h > 0).count();
        let length_covered = self.length.covered();
        let value_covered = self.value.covered();

        let total_all = self.length.total() + self.value.total() + 2;
        let covered_all = length_covered + value_covered + verdict_seen;

        CoverageMetrics {
            length_covered,
            length_total: self.length.total(),
            length_pct: pct(length_covered, self.length.total()),
            value_covered,
            value_total: self.value.total(),
            value_pct: pct(value_covered, self.value.total()),
            verdict_covered: verdict_seen == 2,
            verdict_pct: pct(verdict_seen, 2),
            overall_pct: pct(covered_all, total_all),
            streams_sampled: self.streams_sampled,
        }
    }

    /// Labels of length buckets never hit (for stimulus tuning feedback).
    pub fn uncovered_length_buckets(&self) -> Vec<&str> {
        self.length.uncovered_labels()
    }

    /// Labels of value buckets never hit.
    pub fn uncovered_value_buckets(&self) -> Vec<&str> {
        self.value.uncovered_labels()
    }
}
