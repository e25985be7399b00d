//! Purr Test Harness - Devices, virtual time and scenarios
//!
//! This crate provides:
//! - Recording and flaky audio devices
//! - Pose scripts for driving a controller
//! - A virtual-time session that ticks a controller without a runtime
//! - End-to-end scenarios for attack, release and drive timing

pub mod device;
pub mod integration;
pub mod script;
pub mod session;

pub use device::*;
pub use integration::*;
pub use script::*;
pub use session::*;
