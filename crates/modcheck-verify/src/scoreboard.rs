//! Order-preserving matching of predicted against observed verdicts.
//!
//! Verdicts are indistinguishable by content (a single boolean), so arrival
//! order is the only reliable identity: matching is strictly FIFO, never a
//! value-based lookup. After a mismatch the scoreboard keeps matching
//! against the next backlog entry; there is no resynchronization.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard, Notify};
use tracing::warn;

use crate::model::VerdictRecord;
use crate::stimulus::StreamRecord;

/// One outstanding prediction, carrying the stream it came from so that a
/// failure can be reproduced from the session seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectation {
    pub value: u64,
    pub bit_length: u32,
    pub verdict: bool,
}

/// A scoreboard disagreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mismatch {
    /// Observed verdict disagreed with the oldest outstanding expectation.
    Wrong {
        expected: Expectation,
        observed: bool,
    },
    /// An observation arrived while the backlog was empty.
    Orphan { observed: bool },
}

/// An expectation still outstanding at session end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leftover(pub Expectation);

/// FIFO matching engine. The session serializes access behind a mutex, as
/// predictions and observations arrive from two concurrent producers.
#[derive(Debug, Default)]
pub struct Scoreboard {
    backlog: VecDeque<Expectation>,
    matched: u64,
    mismatches: Vec<Mismatch>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Scoreboard::default()
    }

    /// Append a prediction to the backlog.
    pub fn push_expected(&mut self, stream: &StreamRecord, verdict: VerdictRecord) {
        self.backlog.push_back(Expectation {
            value: stream.value,
            bit_length: stream.bit_length,
            verdict: verdict.result,
        });
    }

    /// Match an observation against the oldest outstanding expectation.
    pub fn check_observed(&mut self, observed: VerdictRecord) {
        match self.backlog.pop_front() {
            None => {
                warn!(
                    observed = observed.result,
                    "observed verdict with nothing expected"
                );
                self.mismatches.push(Mismatch::Orphan {
                    observed: observed.result,
                });
            }
            Some(expected) if expected.verdict != observed.result => {
                warn!(
                    value = expected.value,
                    bit_length = expected.bit_length,
                    expected = expected.verdict,
                    observed = observed.result,
                    "verdict mismatch"
                );
                self.mismatches.push(Mismatch::Wrong {
                    expected,
                    observed: observed.result,
                });
            }
            Some(_) => self.matched += 1,
        }
    }

    /// Expectations still awaiting an observation.
    pub fn outstanding(&self) -> usize {
        self.backlog.len()
    }

    pub fn matched(&self) -> u64 {
        self.matched
    }

    pub fn mismatches(&self) -> &[Mismatch] {
        &self.mismatches
    }

    /// Drain the backlog at teardown. Every leftover entry is an
    /// incompleteness error: a prediction whose observation never came.
    pub fn finish(&mut self) -> Vec<Leftover> {
        self.backlog.drain(..).map(Leftover).collect()
    }

    pub fn take_mismatches(&mut self) -> Vec<Mismatch> {
        std::mem::take(&mut self.mismatches)
    }
}

/// Scoreboard shared between the concurrent prediction and checking paths.
///
/// The mutex serializes push/check; the notify lets the checking path wait
/// for the prediction path to catch up instead of reporting a false orphan
/// whenever observation momentarily outruns prediction. Once the prediction
/// path closes, an empty backlog is a genuine orphan.
#[derive(Debug, Default)]
pub struct SharedScoreboard {
    inner: Mutex<Scoreboard>,
    pushed: Notify,
    closed: AtomicBool,
}

impl SharedScoreboard {
    pub fn new() -> Self {
        SharedScoreboard::default()
    }

    pub async fn push_expected(&self, stream: &StreamRecord, verdict: VerdictRecord) {
        self.inner.lock().await.push_expected(stream, verdict);
        self.pushed.notify_waiters();
    }

    /// Signal that no further predictions will arrive.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.pushed.notify_waiters();
    }

    /// FIFO check against the oldest expectation, waiting for one while the
    /// prediction path is still live.
    pub async fn check_observed(&self, verdict: VerdictRecord) {
        loop {
            // Created before the state check so a push cannot slip between
            // the unlock and the wait.
            let notified = self.pushed.notified();
            {
                let mut scoreboard = self.inner.lock().await;
                if scoreboard.outstanding() > 0 || self.closed.load(Ordering::Acquire) {
                    scoreboard.check_observed(verdict);
                    return;
                }
            }
            notified.await;
        }
    }

    /// Direct access for teardown accounting.
    pub async fn lock(&self) -> MutexGuard<'_, Scoreboard> {
        self.inner.lock().await
    }
}
