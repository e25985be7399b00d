//! Test devices
//!
//! Both devices are cheap handles over shared state, so a test can keep one
//! clone while the controller (or its writer thread) owns the other.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use purr_core::ParameterSet;
use purr_synth::{AudioDevice, DeviceError, ParamName};

#[derive(Debug, Default)]
struct Recording {
    calls: Vec<(ParamName, f64)>,
    sets: Vec<ParameterSet>,
}

/// Records every parameter call and every full set written
#[derive(Debug, Clone, Default)]
pub struct RecordingDevice {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, name: ParamName, value: f64) -> Result<(), DeviceError> {
        self.inner.lock().calls.push((name, value));
        Ok(())
    }

    /// Every full parameter set, oldest first
    pub fn sets(&self) -> Vec<ParameterSet> {
        self.inner.lock().sets.clone()
    }

    /// Every individual call, oldest first
    pub fn calls(&self) -> Vec<(ParamName, f64)> {
        self.inner.lock().calls.clone()
    }

    /// Values written to one parameter, oldest first
    pub fn values_of(&self, name: ParamName) -> Vec<f64> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|(n, _)| *n == name)
            .map(|(_, v)| *v)
            .collect()
    }

    pub fn last(&self) -> Option<ParameterSet> {
        self.inner.lock().sets.last().copied()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.calls.clear();
        inner.sets.clear();
    }
}

impl AudioDevice for RecordingDevice {
    fn set_cutoff_frequency(&mut self, hz: f64) -> Result<(), DeviceError> {
        self.record(ParamName::CutoffFrequency, hz)
    }

    fn set_resonance(&mut self, resonance: f64) -> Result<(), DeviceError> {
        self.record(ParamName::Resonance, resonance)
    }

    fn set_modulation_rate(&mut self, hz: f64) -> Result<(), DeviceError> {
        self.record(ParamName::ModulationRate, hz)
    }

    fn set_modulation_depth(&mut self, depth: f64) -> Result<(), DeviceError> {
        self.record(ParamName::ModulationDepth, depth)
    }

    fn set_mix_level(&mut self, level: f64) -> Result<(), DeviceError> {
        self.record(ParamName::MixLevel, level)
    }

    fn set_breath_level(&mut self, level: f64) -> Result<(), DeviceError> {
        self.record(ParamName::BreathLevel, level)
    }

    fn apply(&mut self, params: &ParameterSet) -> Result<(), DeviceError> {
        let mut inner = self.inner.lock();
        for name in ParamName::all() {
            inner.calls.push((*name, name.get(params)));
        }
        inner.sets.push(*params);
        Ok(())
    }
}

/// Device that can be switched off and on from the test.
///
/// While down, every write fails with [`DeviceError::NotRunning`].
#[derive(Debug, Clone, Default)]
pub struct FlakyDevice {
    down: Arc<AtomicBool>,
    accepted: Arc<AtomicU64>,
    rejected: Arc<AtomicU64>,
}

impl FlakyDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start in the failed state
    pub fn down() -> Self {
        let device = Self::default();
        device.set_down(true);
        device
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::SeqCst)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), DeviceError> {
        if self.down.load(Ordering::SeqCst) {
            Err(DeviceError::NotRunning)
        } else {
            Ok(())
        }
    }
}

impl AudioDevice for FlakyDevice {
    fn set_cutoff_frequency(&mut self, _hz: f64) -> Result<(), DeviceError> {
        self.check()
    }

    fn set_resonance(&mut self, _resonance: f64) -> Result<(), DeviceError> {
        self.check()
    }

    fn set_modulation_rate(&mut self, _hz: f64) -> Result<(), DeviceError> {
        self.check()
    }

    fn set_modulation_depth(&mut self, _depth: f64) -> Result<(), DeviceError> {
        self.check()
    }

    fn set_mix_level(&mut self, _level: f64) -> Result<(), DeviceError> {
        self.check()
    }

    fn set_breath_level(&mut self, _level: f64) -> Result<(), DeviceError> {
        self.check()
    }

    fn apply(&mut self, _params: &ParameterSet) -> Result<(), DeviceError> {
        match self.check() {
            Ok(()) => {
                self.accepted.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                self.rejected.fetch_add(1, Ordering::SeqCst);
                Err(e)
            }
        }
    }
}
