//! Tick contract between the driver and the device.
//!
//! One `TickInput` and one `TickOutput` per clock-equivalent tick. Input
//! bits are gated by `valid`, so the driver may insert arbitrary gaps; the
//! logical stream is the concatenation of valid bits only. The `eos` strobe
//! marks the end of a stream, and the device answers with a single valid
//! output on the following tick.

use serde::{Deserialize, Serialize};

/// Input activity for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInput {
    /// Stream bit, meaningful only when `valid` is set.
    pub bit: bool,
    pub valid: bool,
    /// End-of-stream strobe: input has ceased, answer on the next tick.
    pub eos: bool,
}

impl TickInput {
    /// One valid stream bit.
    pub fn bit(bit: bool) -> Self {
        TickInput {
            bit,
            valid: true,
            eos: false,
        }
    }

    /// An idle tick: no valid bit, no strobe.
    pub fn gap() -> Self {
        TickInput::default()
    }

    /// The end-of-stream strobe.
    pub fn end() -> Self {
        TickInput {
            bit: false,
            valid: false,
            eos: true,
        }
    }
}

/// Output activity for one tick. `result` is meaningful only when `valid`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickOutput {
    pub result: bool,
    pub valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_expected_flags() {
        assert_eq!(
            TickInput::bit(true),
            TickInput {
                bit: true,
                valid: true,
                eos: false
            }
        );
        assert!(!TickInput::gap().valid);
        assert!(!TickInput::gap().eos);
        let end = TickInput::end();
        assert!(end.eos && !end.valid);
    }
}
