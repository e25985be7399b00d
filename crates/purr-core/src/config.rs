//! Control loop configuration
//!
//! Everything here is validated once, before the loop starts. A running
//! controller never sees an inverted range or an out-of-bounds gain.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ParamRanges, PurrError, PurrResult};

/// Control loop configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Any axis beyond this many radians counts as looking away
    pub hard_threshold: f64,
    /// Per-axis linear falloff distance in radians
    pub soft_threshold: f64,
    /// Multiplicative growth per observation (> 1)
    pub attack_gain: f64,
    /// Multiplicative decay per idle tick (< 1)
    pub decay_gain: f64,
    /// Level the envelope jumps to when rising from silence
    pub attack_seed: f64,
    /// Levels below this snap to the idle floor while decaying
    pub release_epsilon: f64,
    /// Level the envelope rests at with no face
    pub idle_floor: f64,
    /// Scale attack gain by the pose score
    pub attack_follows_score: bool,
    /// Tick rate in Hz
    pub tick_rate: f64,
    /// Oscillator period in seconds
    pub oscillator_period: f64,
    /// Tick gaps longer than this are reported as stalls, in milliseconds
    pub max_tick_gap_ms: u64,
    /// Divisor applied to the drive signal for resonance
    pub resonance_scale: f64,
    /// Offset added to the drive signal for the purr layer
    pub breath_baseline: f64,
    /// Safe ranges per device parameter
    pub ranges: ParamRanges,
    /// Pending pose events before the detector side starts dropping
    pub event_queue_capacity: usize,
    /// Pending parameter sets before the tick side starts dropping
    pub device_queue_capacity: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        ControlConfig {
            hard_threshold: 0.4,
            soft_threshold: 0.3,
            attack_gain: 1.15,
            decay_gain: 0.95,
            attack_seed: 0.05,
            release_epsilon: 0.05,
            idle_floor: 0.0,
            attack_follows_score: false,
            tick_rate: 30.0,
            oscillator_period: 2.0,
            max_tick_gap_ms: 250,
            resonance_scale: 1.6,
            breath_baseline: 0.1,
            ranges: ParamRanges::default(),
            event_queue_capacity: 64,
            device_queue_capacity: 8,
        }
    }
}

impl ControlConfig {
    /// Slow swells, long tails
    pub fn calm() -> Self {
        ControlConfig {
            attack_gain: 1.08,
            decay_gain: 0.97,
            oscillator_period: 4.0,
            ..Default::default()
        }
    }

    /// Snappy response at a higher tick rate
    pub fn responsive() -> Self {
        ControlConfig {
            attack_gain: 1.3,
            decay_gain: 0.9,
            tick_rate: 60.0,
            oscillator_period: 1.5,
            ..Default::default()
        }
    }

    /// Parse from JSON; missing fields take defaults. The result is validated.
    pub fn from_json(json: &str) -> PurrResult<Self> {
        let config: ControlConfig =
            serde_json::from_str(json).map_err(|e| PurrError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> PurrResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| PurrError::ConfigIo(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> PurrResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| PurrError::ConfigParse(e.to_string()))
    }

    /// Tick period derived from `tick_rate`
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate)
    }

    pub fn max_tick_gap(&self) -> Duration {
        Duration::from_millis(self.max_tick_gap_ms)
    }

    /// Validate every option. Returns the first problem found.
    pub fn validate(&self) -> PurrResult<()> {
        finite_positive("hard_threshold", self.hard_threshold)?;
        finite_positive("soft_threshold", self.soft_threshold)?;
        if self.soft_threshold > self.hard_threshold {
            return Err(PurrError::invalid(
                "soft_threshold",
                format!(
                    "{} exceeds hard_threshold {}",
                    self.soft_threshold, self.hard_threshold
                ),
            ));
        }

        if !self.attack_gain.is_finite() || self.attack_gain <= 1.0 {
            return Err(PurrError::invalid("attack_gain", "must be finite and > 1"));
        }
        if !self.decay_gain.is_finite() || self.decay_gain <= 0.0 || self.decay_gain >= 1.0 {
            return Err(PurrError::invalid("decay_gain", "must be in (0, 1)"));
        }
        unit_interval("attack_seed", self.attack_seed)?;
        if self.attack_seed == 0.0 {
            return Err(PurrError::invalid("attack_seed", "must be non-zero"));
        }
        unit_interval("release_epsilon", self.release_epsilon)?;
        // Zero would let the release approach the floor forever
        if self.release_epsilon == 0.0 {
            return Err(PurrError::invalid("release_epsilon", "must be non-zero"));
        }
        unit_interval("idle_floor", self.idle_floor)?;
        if self.idle_floor >= 1.0 {
            return Err(PurrError::invalid("idle_floor", "must be below 1"));
        }

        finite_positive("tick_rate", self.tick_rate)?;
        finite_positive("oscillator_period", self.oscillator_period)?;
        if self.max_tick_gap_ms == 0 {
            return Err(PurrError::invalid("max_tick_gap_ms", "must be non-zero"));
        }
        finite_positive("resonance_scale", self.resonance_scale)?;
        if !self.breath_baseline.is_finite() {
            return Err(PurrError::invalid("breath_baseline", "must be finite"));
        }

        self.ranges.validate()?;

        if self.event_queue_capacity == 0 {
            return Err(PurrError::invalid("event_queue_capacity", "must be non-zero"));
        }
        if self.device_queue_capacity == 0 {
            return Err(PurrError::invalid("device_queue_capacity", "must be non-zero"));
        }
        Ok(())
    }
}

fn finite_positive(field: &'static str, value: f64) -> PurrResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PurrError::invalid(field, format!("must be finite and > 0, got {}", value)))
    }
}

fn unit_interval(field: &'static str, value: f64) -> PurrResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PurrError::invalid(field, format!("must be in [0, 1], got {}", value)))
    }
}
