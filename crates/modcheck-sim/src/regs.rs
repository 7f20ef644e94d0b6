//! Device register file with two structurally independent read paths.
//!
//! The match counter increments once per positive verdict the device emits
//! and is cleared only by a full reset. `Direct` is the in-band word read;
//! `Shadow` models the out-of-band debug port, which reassembles the word
//! from four 16-bit lane reads. Both reads are side-effect free, so dual-path
//! consistency checks never disturb device state.

use serde::{Deserialize, Serialize};

/// Register read path selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegPath {
    Direct,
    Shadow,
}

/// The engine's architectural registers.
#[derive(Debug, Clone, Default)]
pub struct RegisterFile {
    match_count: u64,
}

impl RegisterFile {
    pub fn new() -> Self {
        RegisterFile::default()
    }

    /// One more positive verdict left the device.
    pub fn bump_match_count(&mut self) {
        self.match_count += 1;
    }

    /// Full reset clears the counter.
    pub fn clear(&mut self) {
        self.match_count = 0;
    }

    /// Read the match counter over the named path.
    pub fn read_count(&self, path: RegPath) -> u64 {
        match path {
            RegPath::Direct => self.match_count,
            RegPath::Shadow => (0..4).fold(0u64, |word, lane| {
                word | u64::from(self.read_lane(lane)) << (lane * 16)
            }),
        }
    }

    /// 16-bit lane view of the counter, as the debug port exposes it.
    fn read_lane(&self, lane: u32) -> u16 {
        (self.match_count >> (lane * 16)) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_agree_for_all_lane_patterns() {
        let mut regs = RegisterFile::new();
        for target in [0u64, 1, 0xFFFF, 0x1_0000, 0x1234_5678_9ABC_DEF0 % 997] {
            regs.clear();
            for _ in 0..target {
                regs.bump_match_count();
            }
            assert_eq!(regs.read_count(RegPath::Direct), target);
            assert_eq!(regs.read_count(RegPath::Shadow), target);
        }
    }

    #[test]
    fn shadow_path_reassembles_wide_counts() {
        // Drive the counter past a lane boundary without looping 2^16 times
        let mut regs = RegisterFile {
            match_count: 0xDEAD_BEEF_0BAD_F00D,
        };
        assert_eq!(
            regs.read_count(RegPath::Shadow),
            regs.read_count(RegPath::Direct)
        );
        regs.clear();
        assert_eq!(regs.read_count(RegPath::Shadow), 0);
    }
}
