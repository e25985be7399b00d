//! Purr Pose
//!
//! Head pose as the detector reports it, and the score that says how squarely
//! the face is pointed at the camera.
//!
//! The detector itself lives outside this workspace. It hands over one
//! [`PoseSample`] per detection cycle with a face, and nothing otherwise.

pub mod pose;
pub mod score;

pub use pose::*;
pub use score::*;
