//! Audio device interface
//!
//! The synthesis graph is owned elsewhere. The control loop only needs to set
//! named parameters on it, and must survive the device being down.

use std::fmt;

use purr_core::ParameterSet;
use thiserror::Error;

/// Device parameter names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamName {
    CutoffFrequency,
    Resonance,
    ModulationRate,
    ModulationDepth,
    MixLevel,
    BreathLevel,
}

impl ParamName {
    /// All parameters in write order
    pub fn all() -> &'static [ParamName] {
        &[
            ParamName::CutoffFrequency,
            ParamName::Resonance,
            ParamName::ModulationRate,
            ParamName::ModulationDepth,
            ParamName::MixLevel,
            ParamName::BreathLevel,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamName::CutoffFrequency => "cutoff_frequency",
            ParamName::Resonance => "resonance",
            ParamName::ModulationRate => "modulation_rate",
            ParamName::ModulationDepth => "modulation_depth",
            ParamName::MixLevel => "mix_level",
            ParamName::BreathLevel => "breath_level",
        }
    }

    /// Read this parameter out of a set
    pub fn get(&self, params: &ParameterSet) -> f64 {
        match self {
            ParamName::CutoffFrequency => params.cutoff_frequency,
            ParamName::Resonance => params.resonance,
            ParamName::ModulationRate => params.modulation_rate,
            ParamName::ModulationDepth => params.modulation_depth,
            ParamName::MixLevel => params.mix_level,
            ParamName::BreathLevel => params.breath_level,
        }
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device write errors. None of these are fatal to the control loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("Audio engine not running")]
    NotRunning,

    #[error("Parameter {param} rejected: {reason}")]
    Rejected { param: ParamName, reason: String },

    #[error("Audio device disconnected: {0}")]
    Disconnected(String),
}

/// A synthesis graph with continuously settable parameters.
///
/// Calls happen on a dedicated writer thread, never on the tick task, so an
/// implementation may block.
pub trait AudioDevice: Send + 'static {
    fn set_cutoff_frequency(&mut self, hz: f64) -> Result<(), DeviceError>;

    fn set_resonance(&mut self, resonance: f64) -> Result<(), DeviceError>;

    fn set_modulation_rate(&mut self, hz: f64) -> Result<(), DeviceError>;

    fn set_modulation_depth(&mut self, depth: f64) -> Result<(), DeviceError>;

    /// Master level, 0..1
    fn set_mix_level(&mut self, level: f64) -> Result<(), DeviceError>;

    /// Purr layer level
    fn set_breath_level(&mut self, level: f64) -> Result<(), DeviceError>;

    /// Write a whole parameter set. Stops at the first failing parameter.
    fn apply(&mut self, params: &ParameterSet) -> Result<(), DeviceError> {
        self.set_cutoff_frequency(params.cutoff_frequency)?;
        self.set_resonance(params.resonance)?;
        self.set_modulation_rate(params.modulation_rate)?;
        self.set_modulation_depth(params.modulation_depth)?;
        self.set_mix_level(params.mix_level)?;
        self.set_breath_level(params.breath_level)?;
        Ok(())
    }
}

impl<D: AudioDevice + ?Sized> AudioDevice for Box<D> {
    fn set_cutoff_frequency(&mut self, hz: f64) -> Result<(), DeviceError> {
        (**self).set_cutoff_frequency(hz)
    }

    fn set_resonance(&mut self, resonance: f64) -> Result<(), DeviceError> {
        (**self).set_resonance(resonance)
    }

    fn set_modulation_rate(&mut self, hz: f64) -> Result<(), DeviceError> {
        (**self).set_modulation_rate(hz)
    }

    fn set_modulation_depth(&mut self, depth: f64) -> Result<(), DeviceError> {
        (**self).set_modulation_depth(depth)
    }

    fn set_mix_level(&mut self, level: f64) -> Result<(), DeviceError> {
        (**self).set_mix_level(level)
    }

    fn set_breath_level(&mut self, level: f64) -> Result<(), DeviceError> {
        (**self).set_breath_level(level)
    }

    fn apply(&mut self, params: &ParameterSet) -> Result<(), DeviceError> {
        (**self).apply(params)
    }
}

/// Device that accepts everything and does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDevice;

impl AudioDevice for NullDevice {
    fn set_cutoff_frequency(&mut self, _hz: f64) -> Result<(), DeviceError> {
        Ok(())
    }

    fn set_resonance(&mut self, _resonance: f64) -> Result<(), DeviceError> {
        Ok(())
    }

    fn set_modulation_rate(&mut self, _hz: f64) -> Result<(), DeviceError> {
        Ok(())
    }

    fn set_modulation_depth(&mut self, _depth: f64) -> Result<(), DeviceError> {
        Ok(())
    }

    fn set_mix_level(&mut self, _level: f64) -> Result<(), DeviceError> {
        Ok(())
    }

    fn set_breath_level(&mut self, _level: f64) -> Result<(), DeviceError> {
        Ok(())
    }
}

/// Device that traces every write at `trace` level, one event per set
#[derive(Debug, Default, Clone, Copy)]
pub struct TraceDevice {
    writes: u64,
}

impl TraceDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }
}

impl AudioDevice for TraceDevice {
    fn set_cutoff_frequency(&mut self, hz: f64) -> Result<(), DeviceError> {
        tracing::trace!(param = "cutoff_frequency", value = hz);
        Ok(())
    }

    fn set_resonance(&mut self, resonance: f64) -> Result<(), DeviceError> {
        tracing::trace!(param = "resonance", value = resonance);
        Ok(())
    }

    fn set_modulation_rate(&mut self, hz: f64) -> Result<(), DeviceError> {
        tracing::trace!(param = "modulation_rate", value = hz);
        Ok(())
    }

    fn set_modulation_depth(&mut self, depth: f64) -> Result<(), DeviceError> {
        tracing::trace!(param = "modulation_depth", value = depth);
        Ok(())
    }

    fn set_mix_level(&mut self, level: f64) -> Result<(), DeviceError> {
        tracing::trace!(param = "mix_level", value = level);
        Ok(())
    }

    fn set_breath_level(&mut self, level: f64) -> Result<(), DeviceError> {
        tracing::trace!(param = "breath_level", value = level);
        Ok(())
    }

    fn apply(&mut self, params: &ParameterSet) -> Result<(), DeviceError> {
        self.writes += 1;
        tracing::debug!(
            cutoff = params.cutoff_frequency,
            resonance = params.resonance,
            rate = params.modulation_rate,
            depth = params.modulation_depth,
            mix = params.mix_level,
            breath = params.breath_level,
            "device parameters"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fails on one parameter, records the rest
    struct PickyDevice {
        reject: ParamName,
        written: Vec<ParamName>,
    }

    impl PickyDevice {
        fn set(&mut self, name: ParamName) -> Result<(), DeviceError> {
            if name == self.reject {
                return Err(DeviceError::Rejected {
                    param: name,
                    reason: "out of service".into(),
                });
            }
            self.written.push(name);
            Ok(())
        }
    }

    impl AudioDevice for PickyDevice {
        fn set_cutoff_frequency(&mut self, _hz: f64) -> Result<(), DeviceError> {
            self.set(ParamName::CutoffFrequency)
        }
        fn set_resonance(&mut self, _r: f64) -> Result<(), DeviceError> {
            self.set(ParamName::Resonance)
        }
        fn set_modulation_rate(&mut self, _hz: f64) -> Result<(), DeviceError> {
            self.set(ParamName::ModulationRate)
        }
        fn set_modulation_depth(&mut self, _d: f64) -> Result<(), DeviceError> {
            self.set(ParamName::ModulationDepth)
        }
        fn set_mix_level(&mut self, _l: f64) -> Result<(), DeviceError> {
            self.set(ParamName::MixLevel)
        }
        fn set_breath_level(&mut self, _l: f64) -> Result<(), DeviceError> {
            self.set(ParamName::BreathLevel)
        }
    }

    #[test]
    fn test_apply_writes_in_order() {
        let mut device = PickyDevice {
            reject: ParamName::BreathLevel,
            written: Vec::new(),
        };
        let err = device.apply(&ParameterSet::default()).unwrap_err();
        assert_eq!(device.written, &ParamName::all()[..5]);
        assert!(matches!(
            err,
            DeviceError::Rejected {
                param: ParamName::BreathLevel,
                ..
            }
        ));
    }

    #[test]
    fn test_boxed_device() {
        let mut device: Box<dyn AudioDevice> = Box::new(NullDevice);
        assert!(device.apply(&ParameterSet::default()).is_ok());
    }

    #[test]
    fn test_param_name_get() {
        let params = ParameterSet {
            cutoff_frequency: 200.0,
            mix_level: 0.5,
            ..Default::default()
        };
        assert_eq!(ParamName::CutoffFrequency.get(&params), 200.0);
        assert_eq!(ParamName::MixLevel.get(&params), 0.5);
        assert_eq!(ParamName::Resonance.to_string(), "resonance");
    }

    #[test]
    fn test_trace_device_counts() {
        let mut device = TraceDevice::new();
        device.apply(&ParameterSet::default()).unwrap();
        device.apply(&ParameterSet::default()).unwrap();
        assert_eq!(device.writes(), 2);
    }
}
