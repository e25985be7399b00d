//! Purr Synth - From control signals to device parameters
//!
//! The synthesis graph is NOT modelled here. It is a device with named,
//! continuously settable parameters. This crate turns the envelope level, the
//! drive signal and the instant pose score into values for those parameters.
//!
//! # Signal routing
//!
//! - Cutoff follows the instant pose score (timbre reacts immediately)
//! - Mix follows the smoothed envelope (loudness swells and fades)
//! - Resonance, tremolo rate/depth and the purr layer follow the drive signal

pub mod device;
pub mod envelope;
pub mod mapper;

pub use device::*;
pub use envelope::*;
pub use mapper::*;
