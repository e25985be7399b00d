//! Facing-forward score
//!
//! A hard deadband decides "looking away" outright. Inside it, each axis
//! falls off linearly against the soft threshold and the three are averaged.

use purr_core::{ControlConfig, PurrError, PurrResult};

use crate::PoseSample;

/// How centered a face is, in [0,1]
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct ConfidenceScore(f64);

impl ConfidenceScore {
    pub const ZERO: ConfidenceScore = ConfidenceScore(0.0);
    pub const ONE: ConfidenceScore = ConfidenceScore(1.0);

    /// Clamps into [0,1]; NaN becomes 0
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        ConfidenceScore(value.clamp(0.0, 1.0))
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<ConfidenceScore> for f64 {
    fn from(score: ConfidenceScore) -> f64 {
        score.0
    }
}

/// Pose scorer. Pure and stateless apart from its two thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseScorer {
    hard_threshold: f64,
    soft_threshold: f64,
}

impl Default for PoseScorer {
    fn default() -> Self {
        Self {
            hard_threshold: 0.4,
            soft_threshold: 0.3,
        }
    }
}

impl PoseScorer {
    /// Create a scorer. `soft` may not exceed `hard`.
    pub fn new(hard_threshold: f64, soft_threshold: f64) -> PurrResult<Self> {
        let valid = |t: f64| t.is_finite() && t > 0.0;
        if !valid(hard_threshold) {
            return Err(PurrError::ConfigInvalid {
                field: "hard_threshold",
                reason: format!("must be finite and > 0, got {}", hard_threshold),
            });
        }
        if !valid(soft_threshold) || soft_threshold > hard_threshold {
            return Err(PurrError::ConfigInvalid {
                field: "soft_threshold",
                reason: format!(
                    "must be finite, > 0 and <= {}, got {}",
                    hard_threshold, soft_threshold
                ),
            });
        }
        Ok(Self {
            hard_threshold,
            soft_threshold,
        })
    }

    pub fn from_config(config: &ControlConfig) -> PurrResult<Self> {
        Self::new(config.hard_threshold, config.soft_threshold)
    }

    pub fn hard_threshold(&self) -> f64 {
        self.hard_threshold
    }

    pub fn soft_threshold(&self) -> f64 {
        self.soft_threshold
    }

    /// Score a pose given as three angles
    pub fn score(&self, pitch: f64, yaw: f64, roll: f64) -> ConfidenceScore {
        let axes = [pitch, yaw, roll];

        // Non-finite input reads as looking away
        if axes.iter().any(|a| !a.is_finite()) {
            return ConfidenceScore::ZERO;
        }

        if axes.iter().any(|a| a.abs() > self.hard_threshold) {
            return ConfidenceScore::ZERO;
        }

        let sum: f64 = axes.iter().map(|a| self.axis_score(*a)).sum();
        ConfidenceScore::new(sum / 3.0)
    }

    pub fn score_sample(&self, sample: &PoseSample) -> ConfidenceScore {
        self.score(sample.pitch, sample.yaw, sample.roll)
    }

    #[inline]
    fn axis_score(&self, angle: f64) -> f64 {
        (1.0 - angle.abs() / self.soft_threshold).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_centered_scores_one() {
        let scorer = PoseScorer::default();
        assert_eq!(scorer.score(0.0, 0.0, 0.0), ConfidenceScore::ONE);
    }

    #[test]
    fn test_past_hard_threshold_scores_zero() {
        let scorer = PoseScorer::default();
        assert_eq!(scorer.score(0.41, 0.0, 0.0).value(), 0.0);
        assert_eq!(scorer.score(0.0, -0.5, 0.0).value(), 0.0);
        assert_eq!(scorer.score(0.0, 0.0, 3.0).value(), 0.0);
    }

    #[test]
    fn test_between_soft_and_hard_axis_contributes_zero() {
        let scorer = PoseScorer::default();
        // yaw 0.35 is past soft (0.3) but inside hard (0.4)
        let score = scorer.score(0.0, 0.35, 0.0).value();
        assert!((score - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_falloff() {
        let scorer = PoseScorer::default();
        // Each axis at half the soft threshold scores 0.5
        let score = scorer.score(0.15, -0.15, 0.15).value();
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_scores_zero() {
        let scorer = PoseScorer::default();
        assert_eq!(scorer.score(f64::NAN, 0.0, 0.0), ConfidenceScore::ZERO);
        assert_eq!(scorer.score(0.0, f64::INFINITY, 0.0), ConfidenceScore::ZERO);
    }

    #[test]
    fn test_soft_above_hard_rejected() {
        assert!(PoseScorer::new(0.3, 0.4).is_err());
        assert!(PoseScorer::new(0.4, 0.4).is_ok());
        assert!(PoseScorer::new(0.0, 0.0).is_err());
    }

    #[test]
    fn test_from_config() {
        let scorer = PoseScorer::from_config(&ControlConfig::default()).unwrap();
        assert_eq!(scorer, PoseScorer::default());
    }

    #[test]
    fn test_confidence_clamps() {
        assert_eq!(ConfidenceScore::new(1.5).value(), 1.0);
        assert_eq!(ConfidenceScore::new(-0.5).value(), 0.0);
        assert_eq!(ConfidenceScore::new(f64::NAN).value(), 0.0);
    }

    proptest! {
        #[test]
        fn prop_any_axis_past_hard_is_zero(
            away in 0.4001f64..10.0,
            sign in prop::bool::ANY,
            axis in 0usize..3,
            other in -0.4f64..0.4,
        ) {
            let scorer = PoseScorer::default();
            let away = if sign { away } else { -away };
            let mut axes = [other, other, other];
            axes[axis] = away;
            prop_assert_eq!(scorer.score(axes[0], axes[1], axes[2]).value(), 0.0);
        }

        #[test]
        fn prop_score_bounded(
            pitch in -4.0f64..4.0,
            yaw in -4.0f64..4.0,
            roll in -4.0f64..4.0,
        ) {
            let scorer = PoseScorer::default();
            let score = scorer.score(pitch, yaw, roll).value();
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}
