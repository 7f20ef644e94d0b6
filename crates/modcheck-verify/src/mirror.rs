//! Predicted shadow of the device's match-count register.
//!
//! The mirror listens to the same observed-verdict and reset events as the
//! rest of the pipeline and predicts what the counter must hold: zero after
//! a reset, plus one per positive valid verdict since. Consistency checks
//! compare a read-back value from either register path against that
//! prediction; both paths must agree with it, which is the subsystem's core
//! guarantee.

use modcheck_sim::RegPath;
use serde::{Deserialize, Serialize};
use tracing::error;

/// A dual-path consistency failure. Non-fatal; reported immediately and
/// accumulated for the session report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyFailure {
    pub path: RegPath,
    pub predicted: u64,
    pub read_back: u64,
}

#[derive(Debug, Default)]
pub struct RegisterMirror {
    predicted: u64,
    checks_performed: u64,
    failures: Vec<ConsistencyFailure>,
}

impl RegisterMirror {
    pub fn new() -> Self {
        RegisterMirror::default()
    }

    /// A full device reset was observed.
    pub fn on_reset(&mut self) {
        self.predicted = 0;
    }

    /// A valid verdict was observed; only positive ones count.
    pub fn on_verdict(&mut self, result: bool) {
        if result {
            self.predicted += 1;
        }
    }

    pub fn predicted(&self) -> u64 {
        self.predicted
    }

    /// Compare one register read-back against the prediction.
    pub fn check(&mut self, path: RegPath, read_back: u64) {
        self.checks_performed += 1;
        if read_back != self.predicted {
            error!(
                ?path,
                predicted = self.predicted,
                read_back,
                "register read disagrees with mirror"
            );
            self.failures.push(ConsistencyFailure {
                path,
                predicted: self.predicted,
                read_back,
            });
        }
    }

    pub fn checks_performed(&self) -> u64 {
        self.checks_performed
    }

    pub fn failures(&self) -> &[ConsistencyFailure] {
        &self.failures
    }

    pub fn take_failures(&mut self) -> Vec<ConsistencyFailure> {
        std::mem::take(&mut self.failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicted_count_sequence_across_reset() {
        let mut mirror = RegisterMirror::new();
        mirror.on_reset();

        let mut sequence = Vec::new();
        for _ in 0..3 {
            mirror.on_verdict(true);
            sequence.push(mirror.predicted());
        }
        mirror.on_reset();
        sequence.push(mirror.predicted());
        mirror.on_verdict(true);
        sequence.push(mirror.predicted());

        assert_eq!(sequence, vec![1, 2, 3, 0, 1]);
    }

    #[test]
    fn negative_verdicts_do_not_count() {
        let mut mirror = RegisterMirror::new();
        mirror.on_verdict(false);
        mirror.on_verdict(true);
        mirror.on_verdict(false);
        assert_eq!(mirror.predicted(), 1);
    }

    #[test]
    fn both_paths_checked_against_the_same_prediction() {
        let mut mirror = RegisterMirror::new();
        mirror.on_verdict(true);
        mirror.check(RegPath::Direct, 1);
        mirror.check(RegPath::Shadow, 1);
        assert_eq!(mirror.checks_performed(), 2);
        assert!(mirror.failures().is_empty());

        mirror.check(RegPath::Shadow, 2);
        assert_eq!(
            mirror.failures(),
            &[ConsistencyFailure {
                path: RegPath::Shadow,
                predicted: 1,
                read_back: 2,
            }]
        );
    }
}
