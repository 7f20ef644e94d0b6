//! Self-checking verification pipeline for streaming divisibility engines.
//!
//! The pipeline drives randomized bit streams into a black-box device,
//! observes the raw tick activity out-of-band, predicts every verdict with
//! an independent reference model, matches observed against expected in
//! strict FIFO order, bins stimulus/verdict coverage, and cross-checks a
//! predicted mirror of the device's match-count register over two
//! independent read paths.
//!
//! Entry point: [`Session`], configured with a [`SessionConfig`].

pub mod coverage;
pub mod error;
pub mod mirror;
pub mod model;
pub mod observer;
pub mod report;
pub mod scoreboard;
pub mod session;
pub mod stimulus;

pub use coverage::{CoverageMetrics, CoverageTracker};
pub use error::{VerifyError, VerifyResult};
pub use mirror::{ConsistencyFailure, RegisterMirror};
pub use model::{ReferenceModel, VerdictRecord};
pub use observer::{ResultObserver, StimulusObserver, TickEvent};
pub use report::SessionReport;
pub use scoreboard::{Expectation, Leftover, Mismatch, Scoreboard, SharedScoreboard};
pub use session::{Session, SessionConfig};
pub use stimulus::{StimulusPolicy, StimulusSource, StreamRecord};
