//! Purr Runtime - Controller orchestration and the tick loop
//!
//! Every tick, in order:
//! 1. Measure dt from the monotonic clock
//! 2. Advance the periodic modulator
//! 3. Decay the envelope if no face is present
//! 4. Map envelope, drive and proximity to device parameters
//! 5. Hand the parameter set to the device writer
//! 6. Publish a snapshot
//!
//! Pose events are applied between ticks on the same task.

pub mod controller;
pub mod logging;
pub mod runtime;

pub use controller::*;
pub use logging::*;
pub use runtime::*;
