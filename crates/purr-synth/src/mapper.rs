//! Parameter mapper - control signals to device parameter values

use purr_core::{ControlConfig, ParamRanges, ParameterSet};

/// Maps envelope level, drive and proximity onto the device's parameters.
///
/// Every output is clamped to its configured range, whatever the inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterMapper {
    ranges: ParamRanges,
    /// Resonance is `drive / resonance_scale`
    resonance_scale: f64,
    /// Purr layer is `drive + breath_baseline`
    breath_baseline: f64,
}

impl Default for ParameterMapper {
    fn default() -> Self {
        Self::from(&ControlConfig::default())
    }
}

impl From<&ControlConfig> for ParameterMapper {
    fn from(config: &ControlConfig) -> Self {
        ParameterMapper {
            ranges: config.ranges,
            resonance_scale: config.resonance_scale,
            breath_baseline: config.breath_baseline,
        }
    }
}

impl ParameterMapper {
    pub fn new(ranges: ParamRanges, resonance_scale: f64, breath_baseline: f64) -> Self {
        ParameterMapper {
            ranges,
            resonance_scale,
            breath_baseline,
        }
    }

    /// Compute one tick's parameters.
    ///
    /// - `envelope_level`: smoothed loudness in [0,1]
    /// - `drive`: periodic modulator output in [0,1]
    /// - `proximity`: instant pose score in [0,1]
    pub fn map(&self, envelope_level: f64, drive: f64, proximity: f64) -> ParameterSet {
        let r = &self.ranges;
        ParameterSet {
            cutoff_frequency: r.cutoff.clamp(r.cutoff.lerp(proximity)),
            resonance: r.resonance.clamp(drive / self.resonance_scale),
            modulation_rate: r.modulation_rate.clamp(r.modulation_rate.lerp(drive)),
            modulation_depth: r.modulation_depth.clamp(r.modulation_depth.lerp(drive)),
            mix_level: r.mix.clamp(envelope_level),
            breath_level: r.breath.clamp(drive + self.breath_baseline),
        }
    }

    pub fn ranges(&self) -> &ParamRanges {
        &self.ranges
    }
}
