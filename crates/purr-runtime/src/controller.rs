//! Controller - single-owner control state machine
//!
//! Two modes:
//! - Tracking: a face was reported by the last detection cycle
//! - Idle: the detector reported no face
//!
//! Pose events move the envelope up and refresh the proximity score. Ticks
//! advance the oscillator, decay the envelope while Idle, and produce the
//! parameter set for the device. Nothing here is shared; the async runtime
//! owns one Controller and feeds it events and ticks from a single task.

use std::time::Duration;

use purr_core::{ControlConfig, ParameterSet, PurrResult};
use purr_pose::{ConfidenceScore, PoseSample, PoseScorer};
use purr_synth::{Envelope, EnvelopeConfig, ParameterMapper};
use purr_time::PeriodicModulator;

/// Controller mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlMode {
    #[default]
    Idle,
    Tracking,
}

/// Input to the controller from outside the tick task
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEvent {
    /// Detection cycle found a face with this pose
    PoseObserved(PoseSample),
    /// Detection cycle found no face
    FaceLost,
    /// Restart envelope, proximity and oscillator
    Reset,
}

/// Counters for the control loop
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ControllerStats {
    pub ticks: u64,
    pub poses_observed: u64,
    pub faces_lost: u64,
    /// Poses with angles that had to be clamped
    pub inputs_clamped: u64,
    /// Ticks that arrived later than the stall threshold
    pub tick_stalls: u64,
    pub device_writes: u64,
    pub device_write_failures: u64,
    /// Parameter sets dropped because the writer was behind
    pub device_writes_dropped: u64,
    /// Pose events dropped because the queue was full
    pub events_dropped: u64,
    pub last_tick_dt: Duration,
}

/// Read-only view of the loop after a tick
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ControlSnapshot {
    pub mode: ControlMode,
    pub envelope_level: f64,
    pub proximity: f64,
    pub drive: f64,
    pub params: ParameterSet,
    pub stats: ControllerStats,
}

/// Pose-to-parameter controller
pub struct Controller {
    config: ControlConfig,
    scorer: PoseScorer,
    envelope: Envelope,
    modulator: PeriodicModulator,
    mapper: ParameterMapper,
    mode: ControlMode,
    /// Instant score of the latest pose
    proximity: ConfidenceScore,
    last_params: ParameterSet,
    stats: ControllerStats,
}

impl Controller {
    /// Build a controller. Fails if the configuration is invalid.
    pub fn new(config: ControlConfig) -> PurrResult<Self> {
        config.validate()?;
        let scorer = PoseScorer::from_config(&config)?;
        let modulator = PeriodicModulator::from_config(&config)?;
        let envelope = Envelope::new(EnvelopeConfig::from(&config));
        let mapper = ParameterMapper::from(&config);
        let last_params = mapper.map(envelope.current_level(), modulator.value(), 0.0);

        Ok(Controller {
            config,
            scorer,
            envelope,
            modulator,
            mapper,
            mode: ControlMode::Idle,
            proximity: ConfidenceScore::ZERO,
            last_params,
            stats: ControllerStats::default(),
        })
    }

    pub fn handle_event(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::PoseObserved(sample) => self.on_pose_observed(sample),
            ControlEvent::FaceLost => self.on_face_lost(),
            ControlEvent::Reset => self.reset(),
        }
    }

    /// A face was detected with the given pose
    pub fn on_pose_observed(&mut self, sample: PoseSample) {
        let (sample, clamped) = sample.sanitized();
        if clamped {
            self.stats.inputs_clamped += 1;
            tracing::debug!(?sample, "pose angles clamped");
        }

        if self.mode == ControlMode::Idle {
            tracing::debug!("face found, tracking");
            self.mode = ControlMode::Tracking;
        }

        let score = self.scorer.score_sample(&sample);
        self.proximity = score;
        self.envelope.on_observation(score);
        self.stats.poses_observed += 1;

        tracing::trace!(
            score = score.value(),
            level = self.envelope.current_level(),
            "pose observed"
        );
    }

    /// The detector finished a cycle without a face
    pub fn on_face_lost(&mut self) {
        if self.mode == ControlMode::Tracking {
            tracing::debug!("face lost, idling");
            self.mode = ControlMode::Idle;
        }
        self.stats.faces_lost += 1;
    }

    /// Advance the loop by `dt` of real time and return the parameters to write
    pub fn tick(&mut self, dt: Duration) -> ParameterSet {
        self.stats.ticks += 1;
        self.stats.last_tick_dt = dt;

        // The drive never pauses, face or no face
        self.modulator.tick_duration(dt);

        if self.mode == ControlMode::Idle {
            self.envelope.on_face_lost();
        }

        self.last_params = self.mapper.map(
            self.envelope.current_level(),
            self.modulator.value(),
            self.proximity.value(),
        );
        self.last_params
    }

    /// Restart: envelope to its floor, proximity to zero, oscillator to phase 0
    pub fn reset(&mut self) {
        tracing::info!("controller reset");
        self.envelope.reset();
        self.modulator.reset();
        self.proximity = ConfidenceScore::ZERO;
        self.mode = ControlMode::Idle;
        self.last_params = self
            .mapper
            .map(self.envelope.current_level(), self.modulator.value(), 0.0);
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn envelope_level(&self) -> f64 {
        self.envelope.current_level()
    }

    pub fn proximity(&self) -> f64 {
        self.proximity.value()
    }

    pub fn drive(&self) -> f64 {
        self.modulator.value()
    }

    /// Parameters produced by the most recent tick
    pub fn last_params(&self) -> ParameterSet {
        self.last_params
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut ControllerStats {
        &mut self.stats
    }

    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            mode: self.mode,
            envelope_level: self.envelope_level(),
            proximity: self.proximity(),
            drive: self.drive(),
            params: self.last_params,
            stats: self.stats.clone(),
        }
    }
}
