//! Independent oracle for the expected verdict.

use modcheck_sim::TransitionTable;
use serde::{Deserialize, Serialize};

use crate::error::VerifyResult;
use crate::stimulus::StreamRecord;

/// A single boolean verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictRecord {
    pub result: bool,
}

/// Pure oracle: divisibility by plain integer arithmetic.
///
/// Deliberately shares nothing with the device's transition table so that
/// checker logic stays independent of the logic it checks.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceModel {
    divisor: u64,
}

impl ReferenceModel {
    pub fn new(divisor: u64) -> VerifyResult<Self> {
        // Same validity window as the device; the table itself is discarded.
        TransitionTable::new(divisor)?;
        Ok(ReferenceModel { divisor })
    }

    /// Expected verdict for a delivered stream. No side effects.
    pub fn predict(&self, stream: &StreamRecord) -> VerdictRecord {
        VerdictRecord {
            result: stream.value % self.divisor == 0,
        }
    }
}
