//! Purr Time - Tick timing and the periodic drive signal
//!
//! This crate implements:
//! - Tick clock: measures real elapsed time between ticks, stalls counted
//! - Periodic modulator: a phase-accumulating sine drive that never stops

pub mod clock;
pub mod modulator;

pub use clock::*;
pub use modulator::*;
