//! Fatal error kinds for the verification pipeline.
//!
//! Only configuration problems and timeouts abort a session. Mismatches,
//! leftover expectations and register inconsistencies are accumulated in the
//! [`SessionReport`](crate::report::SessionReport) instead, so a run keeps
//! going and reports everything it found.

use std::time::Duration;

use modcheck_sim::SimError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Config(#[from] SimError),
    #[error("max stream length {0} exceeds the 63-bit value range")]
    MaxLenTooLarge(u32),
    #[error("gap probability {0} is not in [0, 1)")]
    InvalidGapProbability(f64),
    #[error("session timed out after {0:?}")]
    Timeout(Duration),
    #[error("device produced no verdict within {0} ticks of end-of-stream")]
    ResponseTimeout(u32),
    #[error("pipeline channel closed early: {0}")]
    ChannelClosed(&'static str),
    #[error("pipeline task failed: {0}")]
    TaskFailed(&'static str),
}

pub type VerifyResult<T> = Result<T, VerifyError>;
