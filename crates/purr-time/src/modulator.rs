//! Periodic modulator - the "breathing" drive signal
//!
//! Runs whether or not a face is present. Phase advances by real elapsed
//! time, so the wave depends only on how much time has passed, never on how
//! many ticks delivered it.

use std::f64::consts::TAU;
use std::time::Duration;

use purr_core::{ControlConfig, PurrError, PurrResult};

/// Phase-accumulating sine oscillator with output in [0,1]
#[derive(Debug, Clone)]
pub struct PeriodicModulator {
    /// Cycle length in seconds
    period: f64,
    /// Position within the current cycle, in [0, period)
    phase: f64,
    /// Total time fed in, never wrapped
    total: f64,
}

impl PeriodicModulator {
    pub fn new(period: f64) -> PurrResult<Self> {
        if !period.is_finite() || period <= 0.0 {
            return Err(PurrError::ConfigInvalid {
                field: "oscillator_period",
                reason: format!("must be finite and > 0, got {}", period),
            });
        }
        Ok(PeriodicModulator {
            period,
            phase: 0.0,
            total: 0.0,
        })
    }

    pub fn from_config(config: &ControlConfig) -> PurrResult<Self> {
        Self::new(config.oscillator_period)
    }

    /// Advance by `dt` seconds. Negative or non-finite dt is ignored.
    pub fn tick(&mut self, dt: f64) {
        if !dt.is_finite() || dt < 0.0 {
            tracing::debug!(dt, "ignoring invalid modulator dt");
            return;
        }
        self.total += dt;
        self.phase = (self.phase + dt) % self.period;
        // Guard the half-open bound against rounding
        if !(0.0..self.period).contains(&self.phase) {
            self.phase = 0.0;
        }
    }

    pub fn tick_duration(&mut self, dt: Duration) {
        self.tick(dt.as_secs_f64());
    }

    /// Position in the cycle, in [0,1)
    #[inline]
    pub fn fraction(&self) -> f64 {
        self.phase / self.period
    }

    /// Drive signal: `0.5 + 0.5 * sin(2π · fraction)`
    pub fn value(&self) -> f64 {
        (0.5 + 0.5 * (TAU * self.fraction()).sin()).clamp(0.0, 1.0)
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    /// Total seconds accumulated since creation or the last reset
    pub fn total_elapsed(&self) -> f64 {
        self.total
    }

    /// Restart the cycle from zero
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.total = 0.0;
    }
}
