//! Envelope - asymmetric multiplicative smoothing
//!
//! Fast attack: each observation multiplies the level by `attack_gain`.
//! Slow release: each idle step multiplies it by `decay_gain`, so the fall
//! slows as the level drops. Two snaps keep it from sticking:
//! - rising from below `attack_seed` jumps to the seed (0 * gain is still 0)
//! - falling below `release_epsilon` lands on the floor in finite steps

use purr_core::ControlConfig;
use purr_pose::ConfidenceScore;

/// Smallest share of the attack gain a score-following attack keeps, so a
/// face at any angle still ramps the level up.
pub const MIN_FOLLOW_SHARE: f64 = 0.25;

/// Envelope tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeConfig {
    pub attack_gain: f64,
    pub decay_gain: f64,
    pub attack_seed: f64,
    pub release_epsilon: f64,
    pub idle_floor: f64,
    /// Scale attack gain by the pose score, never below [`MIN_FOLLOW_SHARE`]
    pub follow_score: bool,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self::from(&ControlConfig::default())
    }
}

impl From<&ControlConfig> for EnvelopeConfig {
    fn from(config: &ControlConfig) -> Self {
        EnvelopeConfig {
            attack_gain: config.attack_gain,
            decay_gain: config.decay_gain,
            attack_seed: config.attack_seed,
            release_epsilon: config.release_epsilon,
            idle_floor: config.idle_floor,
            follow_score: config.attack_follows_score,
        }
    }
}

/// Envelope state.
///
/// INVARIANT: `level` is always in [0,1].
#[derive(Debug, Clone)]
pub struct Envelope {
    config: EnvelopeConfig,
    level: f64,
}

impl Envelope {
    /// Expects a validated configuration
    pub fn new(config: EnvelopeConfig) -> Self {
        Envelope {
            level: config.idle_floor.clamp(0.0, 1.0),
            config,
        }
    }

    /// A face was seen this cycle
    pub fn on_observation(&mut self, score: ConfidenceScore) {
        if self.level < self.config.attack_seed {
            self.level = self.config.attack_seed;
        } else {
            let gain = if self.config.follow_score {
                let share = score.value().max(MIN_FOLLOW_SHARE);
                1.0 + (self.config.attack_gain - 1.0) * share
            } else {
                self.config.attack_gain
            };
            self.level *= gain;
        }
        self.level = self.level.clamp(0.0, 1.0);
    }

    /// No face this step
    pub fn on_face_lost(&mut self) {
        let decayed = self.level * self.config.decay_gain;
        let snapped = if decayed < self.config.release_epsilon {
            0.0
        } else {
            decayed
        };
        self.level = snapped.max(self.config.idle_floor).clamp(0.0, 1.0);
    }

    pub fn current_level(&self) -> f64 {
        self.level
    }

    /// True when resting on the idle floor
    pub fn is_resting(&self) -> bool {
        self.level <= self.config.idle_floor
    }

    pub fn config(&self) -> &EnvelopeConfig {
        &self.config
    }

    /// Back to the idle floor
    pub fn reset(&mut self) {
        self.level = self.config.idle_floor.clamp(0.0, 1.0);
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(EnvelopeConfig::default())
    }
}
