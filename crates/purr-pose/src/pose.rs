//! Pose Sample - Head rotation as reported by the detector
//!
//! This is NOT landmark data. Only the three rotation angles survive the
//! detector boundary.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Head rotation for a single detection cycle, in radians.
///
/// 0 on every axis means looking straight into the camera.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl PoseSample {
    pub fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Facing the camera
    pub fn centered() -> Self {
        Self::default()
    }

    pub fn from_degrees(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self {
            pitch: pitch.to_radians(),
            yaw: yaw.to_radians(),
            roll: roll.to_radians(),
        }
    }

    /// Largest absolute angle across the three axes
    pub fn max_deviation(&self) -> f64 {
        self.pitch.abs().max(self.yaw.abs()).max(self.roll.abs())
    }

    /// True when every axis is finite and within [-π, π]
    pub fn is_representable(&self) -> bool {
        [self.pitch, self.yaw, self.roll]
            .iter()
            .all(|a| a.is_finite() && a.abs() <= PI)
    }

    /// Clamp every axis into [-π, π].
    ///
    /// NaN becomes π so the sample reads as looking away. The flag is set if
    /// anything changed.
    pub fn sanitized(&self) -> (PoseSample, bool) {
        if self.is_representable() {
            return (*self, false);
        }
        let fix = |a: f64| if a.is_nan() { PI } else { a.clamp(-PI, PI) };
        (
            PoseSample {
                pitch: fix(self.pitch),
                yaw: fix(self.yaw),
                roll: fix(self.roll),
            },
            true,
        )
    }

    /// Linear interpolation between two samples
    pub fn lerp(&self, other: &PoseSample, t: f64) -> PoseSample {
        let t = t.clamp(0.0, 1.0);
        PoseSample {
            pitch: self.pitch + (other.pitch - self.pitch) * t,
            yaw: self.yaw + (other.yaw - self.yaw) * t,
            roll: self.roll + (other.roll - self.roll) * t,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_is_zero() {
        let pose = PoseSample::centered();
        assert_eq!(pose.max_deviation(), 0.0);
        assert!(pose.is_representable());
    }

    #[test]
    fn test_from_degrees() {
        let pose = PoseSample::from_degrees(0.0, 90.0, -180.0);
        assert!((pose.yaw - PI / 2.0).abs() < 1e-12);
        assert!((pose.roll + PI).abs() < 1e-12);
    }

    #[test]
    fn test_sanitize_clamps_out_of_range() {
        let (pose, clamped) = PoseSample::new(10.0, -10.0, 0.1).sanitized();
        assert!(clamped);
        assert_eq!(pose.pitch, PI);
        assert_eq!(pose.yaw, -PI);
        assert_eq!(pose.roll, 0.1);
    }

    #[test]
    fn test_sanitize_nan_reads_as_away() {
        let (pose, clamped) = PoseSample::new(f64::NAN, 0.0, f64::INFINITY).sanitized();
        assert!(clamped);
        assert_eq!(pose.pitch, PI);
        assert_eq!(pose.roll, PI);
        assert!(pose.is_representable());
    }

    #[test]
    fn test_sanitize_passthrough() {
        let original = PoseSample::new(0.1, -0.2, 0.05);
        let (pose, clamped) = original.sanitized();
        assert!(!clamped);
        assert_eq!(pose, original);
    }

    #[test]
    fn test_lerp_midpoint() {
        let a = PoseSample::centered();
        let b = PoseSample::new(0.2, 0.4, -0.2);
        let mid = a.lerp(&b, 0.5);
        assert!((mid.yaw - 0.2).abs() < 1e-12);
        assert!((mid.roll + 0.1).abs() < 1e-12);
    }
}
