//! Seeded stimulus generation.
//!
//! Streams come from one of two policies: `Uniform` samples length and value
//! independently and re-widens the length when the sampled value needs more
//! bits (so large values are never silently truncated into small ones), and
//! `Skewed` weights the residue modulo the divisor so that roughly 80% of
//! streams are exactly divisible. The same seed always reproduces the same
//! sequence.

use std::str::FromStr;

use modcheck_sim::TransitionTable;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{VerifyError, VerifyResult};

/// Logical record of one stream: `value` delivered MSB-first over
/// `bit_length` bits. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub bit_length: u32,
    pub value: u64,
    /// Verdict known at construction time, if any. The generator fills this
    /// in from how it built the value; observers leave it `None`. Purely
    /// diagnostic: the reference model never reads it.
    pub expected: Option<bool>,
}

impl StreamRecord {
    /// Minimal number of bits needed to represent `value` (0 for value 0).
    pub fn min_bits(value: u64) -> u32 {
        64 - value.leading_zeros()
    }

    /// The stream's bits, MSB first, exactly as they go on the wire.
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.bit_length)
            .rev()
            .map(move |i| (self.value >> i) & 1 == 1)
    }

    /// Declared length is large enough for the value.
    pub fn is_well_formed(&self) -> bool {
        Self::min_bits(self.value) <= self.bit_length
    }
}

/// Stimulus distribution policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StimulusPolicy {
    /// Length and value sampled uniformly.
    Uniform,
    /// Residue modulo the divisor weighted ~80% toward exact divisibility.
    Skewed,
}

impl FromStr for StimulusPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uniform" => Ok(StimulusPolicy::Uniform),
            "skewed" => Ok(StimulusPolicy::Skewed),
            other => Err(format!(
                "unknown policy '{other}' (expected 'uniform' or 'skewed')"
            )),
        }
    }
}

/// Lazy, restartable stream sequence under a fixed policy and seed.
pub struct StimulusSource {
    divisor: u64,
    max_len: u32,
    policy: StimulusPolicy,
    rng: StdRng,
}

impl StimulusSource {
    pub fn new(
        divisor: u64,
        max_len: u32,
        policy: StimulusPolicy,
        seed: u64,
    ) -> VerifyResult<Self> {
        // Same validity window as the device's table generator.
        TransitionTable::new(divisor)?;
        if max_len > 63 {
            return Err(VerifyError::MaxLenTooLarge(max_len));
        }
        Ok(StimulusSource {
            divisor,
            max_len,
            policy,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Rewind the sequence; the same seed replays the same streams.
    pub fn restart(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Produce the next stream record. Every record's declared bit length
    /// is large enough to represent its value.
    pub fn next_stream(&mut self) -> StreamRecord {
        let record = match self.policy {
            StimulusPolicy::Uniform => self.next_uniform(),
            StimulusPolicy::Skewed => self.next_skewed(),
        };
        debug_assert!(record.is_well_formed());
        record
    }

    fn next_uniform(&mut self) -> StreamRecord {
        let sampled_len = self.rng.gen_range(0..=self.max_len);
        let value = if self.max_len == 0 {
            0
        } else {
            self.rng.gen_range(0..(1u64 << self.max_len))
        };
        // Re-widen rather than truncate when the value needs more bits than
        // the sampled length, to keep the value distribution unbiased.
        let bit_length = sampled_len.max(StreamRecord::min_bits(value));
        StreamRecord {
            bit_length,
            value,
            expected: Some(value % self.divisor == 0),
        }
    }

    fn next_skewed(&mut self) -> StreamRecord {
        let residue = if self.rng.gen_bool(0.8) {
            0
        } else {
            self.rng.gen_range(1..self.divisor)
        };
        let sampled_len = self.rng.gen_range(0..=self.max_len);
        // Widen far enough that at least the residue itself fits.
        let bit_length = sampled_len.max(StreamRecord::min_bits(residue));
        let cap = if bit_length == 0 {
            0
        } else {
            (1u64 << bit_length) - 1
        };
        let q = self.rng.gen_range(0..=(cap - residue) / self.divisor);
        let value = q * self.divisor + residue;
        StreamRecord {
            bit_length,
            value,
            expected: Some(residue == 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modcheck_sim::SimError;

    #[test]
    fn rejects_bad_configuration() {
        assert!(matches!(
            StimulusSource::new(1, 16, StimulusPolicy::Uniform, 0),
            Err(VerifyError::Config(SimError::InvalidDivisor(1)))
        ));
        assert!(matches!(
            StimulusSource::new(3, 64, StimulusPolicy::Uniform, 0),
            Err(VerifyError::MaxLenTooLarge(64))
        ));
    }

    #[test]
    fn every_record_is_well_formed() {
        for policy in [StimulusPolicy::Uniform, StimulusPolicy::Skewed] {
            let mut source = StimulusSource::new(7, 24, policy, 42).unwrap();
            for _ in 0..2000 {
                let record = source.next_stream();
                assert!(record.is_well_formed(), "{record:?}");
                assert!(record.bit_length <= 24);
            }
        }
    }

    #[test]
    fn construction_expectation_matches_arithmetic() {
        let mut source = StimulusSource::new(5, 20, StimulusPolicy::Skewed, 7).unwrap();
        for _ in 0..2000 {
            let record = source.next_stream();
            assert_eq!(record.expected, Some(record.value % 5 == 0));
        }
    }

    #[test]
    fn same_seed_replays_the_same_sequence() {
        let mut a = StimulusSource::new(3, 32, StimulusPolicy::Uniform, 9001).unwrap();
        let mut b = StimulusSource::new(3, 32, StimulusPolicy::Uniform, 9001).unwrap();
        let first: Vec<_> = (0..100).map(|_| a.next_stream()).collect();
        let second: Vec<_> = (0..100).map(|_| b.next_stream()).collect();
        assert_eq!(first, second);

        a.restart(9001);
        let replayed: Vec<_> = (0..100).map(|_| a.next_stream()).collect();
        assert_eq!(first, replayed);
    }

    #[test]
    fn skewed_policy_actually_skews() {
        let mut source = StimulusSource::new(9, 32, StimulusPolicy::Skewed, 3).unwrap();
        let divisible = (0..4000)
            .filter(|_| source.next_stream().value % 9 == 0)
            .count();
        // ~80% target; anything over half shows the skew is in effect
        assert!(divisible > 2000, "only {divisible}/4000 divisible");
    }

    #[test]
    fn msb_first_bit_order() {
        let record = StreamRecord {
            bit_length: 3,
            value: 0b110,
            expected: None,
        };
        assert_eq!(record.bits().collect::<Vec<_>>(), vec![true, true, false]);
    }
}
