//! Tick-level model of the serial divisibility engine.
//!
//! This crate is the "device side" of the verification framework:
//! - The remainder-automaton transition table the engine runs on
//! - The tick contract (input bits with gaps, one valid verdict per stream)
//! - A register file with two structurally independent read paths
//! - The [`Device`] seam the verification pipeline drives, plus
//!   [`SerialDivider`], the reference engine behind it

pub mod device;
pub mod regs;
pub mod table;
pub mod tick;

pub use device::{Device, SerialDivider, SimError, SimResult};
pub use regs::{RegPath, RegisterFile};
pub use table::TransitionTable;
pub use tick::{TickInput, TickOutput};
