//! Remainder-automaton transition table.
//!
//! State `k` means "the bits delivered so far, read MSB-first, form a value
//! congruent to `k` modulo the divisor". Appending a bit `b` maps `k` to
//! `(2k + b) mod N`, so the table is derived from the divisor for any `N`
//! rather than enumerated by hand.

use crate::device::{SimError, SimResult};

/// Largest divisor for which the table is materialized.
pub const MAX_TABLE_STATES: u64 = 1 << 24;

/// Complete transition table for the serial remainder automaton.
///
/// Built once, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    divisor: u64,
    /// `next[state][bit]`
    next: Vec<[u64; 2]>,
}

impl TransitionTable {
    /// Build the table for `divisor`.
    ///
    /// Divisors below 2 are rejected: divisibility by 1 is degenerate and
    /// by 0 or less is undefined.
    pub fn new(divisor: u64) -> SimResult<Self> {
        if divisor <= 1 {
            return Err(SimError::InvalidDivisor(divisor));
        }
        if divisor > MAX_TABLE_STATES {
            return Err(SimError::DivisorTooLarge(divisor));
        }
        let next = (0..divisor)
            .map(|state| [(state * 2) % divisor, (state * 2 + 1) % divisor])
            .collect();
        Ok(TransitionTable { divisor, next })
    }

    pub fn divisor(&self) -> u64 {
        self.divisor
    }

    /// One state per remainder.
    pub fn num_states(&self) -> u64 {
        self.divisor
    }

    /// Successor state for one input bit.
    pub fn next(&self, state: u64, bit: bool) -> u64 {
        self.next[state as usize][bit as usize]
    }

    /// State 0 accepts: the value seen so far is divisible.
    pub fn is_accepting(&self, state: u64) -> bool {
        state == 0
    }

    /// Walk the table over a whole bit string (MSB first), starting from
    /// the empty-stream state.
    pub fn run(&self, bits: impl IntoIterator<Item = bool>) -> u64 {
        bits.into_iter().fold(0, |state, bit| self.next(state, bit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_degenerate_divisors() {
        assert!(matches!(
            TransitionTable::new(0),
            Err(SimError::InvalidDivisor(0))
        ));
        assert!(matches!(
            TransitionTable::new(1),
            Err(SimError::InvalidDivisor(1))
        ));
        assert!(matches!(
            TransitionTable::new(MAX_TABLE_STATES + 1),
            Err(SimError::DivisorTooLarge(_))
        ));
    }

    #[test]
    fn smallest_divisor_tracks_parity() {
        let table = TransitionTable::new(2).unwrap();
        assert_eq!(table.num_states(), 2);
        // Even values end in state 0, odd values in state 1
        assert_eq!(table.run([true, false]), 0); // 0b10 = 2
        assert_eq!(table.run([true, true]), 1); // 0b11 = 3
        assert!(table.is_accepting(table.run([])));
    }

    #[test]
    fn divisor_three_scenario() {
        let table = TransitionTable::new(3).unwrap();
        // "110" = 6, divisible by 3
        assert_eq!(table.run([true, true, false]), 0);
        // "111" = 7, remainder 1
        assert_eq!(table.run([true, true, true]), 1);
    }

    proptest! {
        /// The state reached after consuming any bit string equals the
        /// string's binary value modulo the divisor, for any divisor.
        #[test]
        fn table_walk_matches_arithmetic(
            divisor in 2u64..500,
            bits in proptest::collection::vec(any::<bool>(), 0..64),
        ) {
            let table = TransitionTable::new(divisor).unwrap();
            let value = bits
                .iter()
                .fold(0u128, |acc, &b| (acc << 1) | u128::from(b));
            let state = table.run(bits.iter().copied());
            prop_assert_eq!(u128::from(state), value % u128::from(divisor));
            prop_assert_eq!(table.is_accepting(state), value % u128::from(divisor) == 0);
        }
    }
}
