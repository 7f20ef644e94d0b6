//! Device seam and the serial divisibility engine behind it.
//!
//! The verification pipeline only ever talks to the [`Device`] trait, so the
//! engine can be swapped for any black-box implementation of the same tick
//! contract. [`SerialDivider`] is the in-tree engine: a remainder automaton
//! with a one-tick answer latency and a match-count register.

use async_trait::async_trait;
use thiserror::Error;

use crate::regs::{RegPath, RegisterFile};
use crate::table::TransitionTable;
use crate::tick::{TickInput, TickOutput};

/// Errors from the device side.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid divisor {0}: must be greater than 1")]
    InvalidDivisor(u64),
    #[error("divisor {0} exceeds the materialized state table limit")]
    DivisorTooLarge(u64),
}

/// Result type for device-side operations.
pub type SimResult<T> = Result<T, SimError>;

/// Streaming computation engine under verification.
///
/// Mirrors a tick-driven hardware block: one [`tick`](Device::tick) per
/// clock, a `start_stream` pulse between streams, a full `reset`, and a
/// counter register readable over two independent paths.
#[async_trait]
pub trait Device: Send {
    /// Full reset: clears in-flight stream state and the match counter.
    async fn reset(&mut self);

    /// Per-stream pulse: clears in-flight stream state only.
    async fn start_stream(&mut self);

    /// Advance one tick, consuming this tick's input activity and producing
    /// this tick's output activity.
    async fn tick(&mut self, input: TickInput) -> TickOutput;

    /// Non-mutating register read over the named path.
    async fn read_count(&self, path: RegPath) -> u64;

    /// Configured divisor.
    fn divisor(&self) -> u64;
}

/// In-tree engine: table-driven serial divisibility checker.
pub struct SerialDivider {
    table: TransitionTable,
    state: u64,
    /// Set when the eos strobe was consumed; the verdict goes out next tick.
    answer_pending: bool,
    regs: RegisterFile,
}

impl SerialDivider {
    pub fn new(divisor: u64) -> SimResult<Self> {
        Ok(SerialDivider {
            table: TransitionTable::new(divisor)?,
            state: 0,
            answer_pending: false,
            regs: RegisterFile::new(),
        })
    }

    /// The engine's transition table, for inspection and debug printing.
    pub fn table(&self) -> &TransitionTable {
        &self.table
    }
}

#[async_trait]
impl Device for SerialDivider {
    async fn reset(&mut self) {
        self.state = 0;
        self.answer_pending = false;
        self.regs.clear();
    }

    async fn start_stream(&mut self) {
        self.state = 0;
        self.answer_pending = false;
    }

    async fn tick(&mut self, input: TickInput) -> TickOutput {
        if self.answer_pending {
            // Fixed one-tick latency from the eos strobe to the verdict.
            self.answer_pending = false;
            let result = self.table.is_accepting(self.state);
            if result {
                self.regs.bump_match_count();
            }
            return TickOutput {
                result,
                valid: true,
            };
        }
        if input.valid {
            self.state = self.table.next(self.state, input.bit);
        }
        if input.eos {
            self.answer_pending = true;
        }
        TickOutput::default()
    }

    async fn read_count(&self, path: RegPath) -> u64 {
        self.regs.read_count(path)
    }

    fn divisor(&self) -> u64 {
        self.table.divisor()
    }
}
