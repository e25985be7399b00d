//! Parameter ranges and the parameter set written to the audio device

use serde::{Deserialize, Serialize};

use crate::{PurrError, PurrResult};

/// Closed interval a device parameter must stay within
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
}

impl ParamRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Width of the range
    #[inline]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Affine map of `t` in [0,1] onto the range. Not clamped.
    #[inline]
    pub fn lerp(&self, t: f64) -> f64 {
        self.min + self.span() * t
    }

    /// Clamp into the range. NaN maps to `min`.
    ///
    /// Never panics, even on an unvalidated range.
    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.max(self.min).min(self.max)
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Reject non-finite bounds and inverted ranges
    pub fn validate(&self, name: &'static str) -> PurrResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(PurrError::invalid(name, "bounds must be finite"));
        }
        if self.max < self.min {
            return Err(PurrError::InvalidRange {
                name,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Safe ranges for every device parameter
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamRanges {
    /// Filter cutoff in Hz
    pub cutoff: ParamRange,
    /// Filter resonance (unitless)
    pub resonance: ParamRange,
    /// Tremolo rate in Hz
    pub modulation_rate: ParamRange,
    /// Tremolo depth (unitless)
    pub modulation_depth: ParamRange,
    /// Master mix level
    pub mix: ParamRange,
    /// Inner purr layer level
    pub breath: ParamRange,
}

impl Default for ParamRanges {
    fn default() -> Self {
        Self {
            cutoff: ParamRange::new(130.0, 300.0),
            resonance: ParamRange::new(0.0, 0.9),
            modulation_rate: ParamRange::new(20.0, 70.0),
            modulation_depth: ParamRange::new(0.4, 1.0),
            mix: ParamRange::new(0.0, 1.0),
            breath: ParamRange::new(0.0, 1.1),
        }
    }
}

impl ParamRanges {
    pub fn validate(&self) -> PurrResult<()> {
        self.cutoff.validate("ranges.cutoff")?;
        self.resonance.validate("ranges.resonance")?;
        self.modulation_rate.validate("ranges.modulation_rate")?;
        self.modulation_depth.validate("ranges.modulation_depth")?;
        self.mix.validate("ranges.mix")?;
        self.breath.validate("ranges.breath")?;

        if self.cutoff.min < 0.0 {
            return Err(PurrError::invalid(
                "ranges.cutoff",
                "frequencies cannot be negative",
            ));
        }
        if self.modulation_rate.min < 0.0 {
            return Err(PurrError::invalid(
                "ranges.modulation_rate",
                "frequencies cannot be negative",
            ));
        }
        Ok(())
    }
}

/// One tick's worth of device parameters.
///
/// Recomputed every tick and handed to the device; never read back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Filter cutoff in Hz
    pub cutoff_frequency: f64,
    pub resonance: f64,
    /// Tremolo rate in Hz
    pub modulation_rate: f64,
    pub modulation_depth: f64,
    /// Master volume, follows the envelope
    pub mix_level: f64,
    /// Purr layer volume, follows the drive signal
    pub breath_level: f64,
}

impl ParameterSet {
    /// Check every field against its range
    pub fn is_within(&self, ranges: &ParamRanges) -> bool {
        ranges.cutoff.contains(self.cutoff_frequency)
            && ranges.resonance.contains(self.resonance)
            && ranges.modulation_rate.contains(self.modulation_rate)
            && ranges.modulation_depth.contains(self.modulation_depth)
            && ranges.mix.contains(self.mix_level)
            && ranges.breath.contains(self.breath_level)
    }

    pub fn is_finite(&self) -> bool {
        self.cutoff_frequency.is_finite()
            && self.resonance.is_finite()
            && self.modulation_rate.is_finite()
            && self.modulation_depth.is_finite()
            && self.mix_level.is_finite()
            && self.breath_level.is_finite()
    }
}
