//! Out-of-band reconstruction of streams and verdicts.
//!
//! Observers consume the broadcast [`TickEvent`] feed and rebuild the
//! logical records the rest of the pipeline works with. They never touch the
//! device and never block the driver; each observer runs on its own channel.

use modcheck_sim::{TickInput, TickOutput};

use crate::model::VerdictRecord;
use crate::stimulus::StreamRecord;

/// One broadcast record of activity at the device boundary.
#[derive(Debug, Clone, Copy)]
pub enum TickEvent {
    /// Full device reset was pulsed.
    Reset,
    /// Per-stream start pulse.
    Start,
    /// One tick of input/output activity.
    Tick {
        input: TickInput,
        output: TickOutput,
    },
    /// Quiesce-point register sample over both read paths.
    RegSample { direct: u64, shadow: u64 },
}

/// Rebuilds the logical stream from raw input activity: valid bits
/// accumulate MSB-first; the record completes at the eos strobe.
#[derive(Debug, Default)]
pub struct StimulusObserver {
    value: u64,
    bit_length: u32,
}

impl StimulusObserver {
    pub fn new() -> Self {
        StimulusObserver::default()
    }

    /// Feed one event; returns the completed record at end of stream.
    pub fn observe(&mut self, event: &TickEvent) -> Option<StreamRecord> {
        match event {
            TickEvent::Reset | TickEvent::Start => {
                self.value = 0;
                self.bit_length = 0;
                None
            }
            TickEvent::Tick { input, .. } => {
                if input.valid {
                    self.value = (self.value << 1) | u64::from(input.bit);
                    self.bit_length += 1;
                }
                if input.eos {
                    let record = StreamRecord {
                        bit_length: self.bit_length,
                        value: self.value,
                        expected: None,
                    };
                    self.value = 0;
                    self.bit_length = 0;
                    Some(record)
                } else {
                    None
                }
            }
            TickEvent::RegSample { .. } => None,
        }
    }
}

/// Captures the single valid output per stream as a verdict record.
#[derive(Debug, Default)]
pub struct ResultObserver;

impl ResultObserver {
    pub fn new() -> Self {
        ResultObserver
    }

    /// Feed one event; returns a verdict on the device's valid output tick.
    pub fn observe(&mut self, event: &TickEvent) -> Option<VerdictRecord> {
        match event {
            TickEvent::Tick { output, .. } if output.valid => Some(VerdictRecord {
                result: output.result,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(input: TickInput) -> TickEvent {
        TickEvent::Tick {
            input,
            output: TickOutput::default(),
        }
    }

    #[test]
    fn reconstructs_stream_with_gaps() {
        let mut obs = StimulusObserver::new();
        assert!(obs.observe(&TickEvent::Start).is_none());
        for event in [
            tick(TickInput::bit(true)),
            tick(TickInput::gap()),
            tick(TickInput::bit(true)),
            tick(TickInput::gap()),
            tick(TickInput::gap()),
            tick(TickInput::bit(false)),
        ] {
            assert!(obs.observe(&event).is_none());
        }
        let record = obs.observe(&tick(TickInput::end())).unwrap();
        assert_eq!(record.value, 0b110);
        assert_eq!(record.bit_length, 3);
        assert_eq!(record.expected, None);
    }

    #[test]
    fn start_discards_partial_state() {
        let mut obs = StimulusObserver::new();
        obs.observe(&tick(TickInput::bit(true)));
        obs.observe(&TickEvent::Start);
        let record = obs.observe(&tick(TickInput::end())).unwrap();
        assert_eq!(record.bit_length, 0);
        assert_eq!(record.value, 0);
    }

    #[test]
    fn final_bit_and_eos_may_share_a_tick() {
        let mut obs = StimulusObserver::new();
        obs.observe(&TickEvent::Start);
        obs.observe(&tick(TickInput::bit(true)));
        let record = obs
            .observe(&tick(TickInput {
                bit: true,
                valid: true,
                eos: true,
            }))
            .unwrap();
        assert_eq!(record.value, 0b11);
        assert_eq!(record.bit_length, 2);
    }

    #[test]
    fn result_observer_only_reports_valid_ticks() {
        let mut obs = ResultObserver::new();
        assert!(obs.observe(&tick(TickInput::gap())).is_none());
        let verdict = obs
            .observe(&TickEvent::Tick {
                input: TickInput::gap(),
                output: TickOutput {
                    result: true,
                    valid: true,
                },
            })
            .unwrap();
        assert!(verdict.result);
        assert!(obs.observe(&TickEvent::RegSample { direct: 0, shadow: 0 }).is_none());
    }
}
