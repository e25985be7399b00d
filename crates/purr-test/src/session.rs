//! Virtual-time session - drives a Controller without a runtime
//!
//! Simulates:
//! - A fixed-rate tick loop with optional jitter
//! - Stalls where the loop misses ticks entirely
//! - Detector reports delivered between ticks
//! - Device writes after every tick
//!
//! Time is virtual: instants are offsets from a fixed base, so a ten second
//! session runs in microseconds and is fully deterministic for a given seed.

use std::time::{Duration, Instant};

use purr_core::{ControlConfig, ParamRanges, ParameterSet, PurrResult};
use purr_runtime::{ControlMode, Controller, ControllerStats};
use purr_synth::AudioDevice;
use purr_time::TickClock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::script::PoseScript;

/// Session configuration
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub control: ControlConfig,
    /// Each tick lands up to this far from its nominal time
    pub tick_jitter: Duration,
    /// Windows `(start, length)` with no ticks at all
    pub stalls: Vec<(Duration, Duration)>,
    pub seed: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            control: ControlConfig::default(),
            tick_jitter: Duration::ZERO,
            stalls: Vec::new(),
            seed: 42,
        }
    }
}

impl SessionConfig {
    pub fn with_control(control: ControlConfig) -> Self {
        SessionConfig {
            control,
            ..Default::default()
        }
    }

    pub fn with_jitter(mut self, jitter: Duration, seed: u64) -> Self {
        self.tick_jitter = jitter;
        self.seed = seed;
        self
    }

    pub fn with_stall(mut self, start: Duration, length: Duration) -> Self {
        self.stalls.push((start, length));
        self
    }

    fn stalled(&self, at: Duration) -> bool {
        self.stalls
            .iter()
            .any(|(start, length)| at >= *start && at < *start + *length)
    }
}

/// What the loop produced on one tick
#[derive(Clone, Debug, PartialEq)]
pub struct TickRecord {
    pub at: Duration,
    pub dt: Duration,
    pub mode: ControlMode,
    pub envelope_level: f64,
    pub proximity: f64,
    pub drive: f64,
    pub params: ParameterSet,
    pub write_ok: bool,
}

/// Everything a session observed
#[derive(Clone, Debug, Default)]
pub struct SessionTrace {
    pub records: Vec<TickRecord>,
    pub device_failures: u64,
    /// Ticks whose gap exceeded the stall threshold
    pub tick_stalls: u64,
    pub stats: ControllerStats,
}

impl SessionTrace {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&TickRecord> {
        self.records.last()
    }

    /// First tick at or after `at`
    pub fn first_at_or_after(&self, at: Duration) -> Option<&TickRecord> {
        self.records.iter().find(|r| r.at >= at)
    }

    pub fn mix_levels(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.params.mix_level).collect()
    }

    /// Time from `since` until the first silent tick
    pub fn silent_after(&self, since: Duration) -> Option<Duration> {
        self.records
            .iter()
            .find(|r| r.at >= since && r.params.mix_level == 0.0)
            .map(|r| r.at - since)
    }

    /// True if every tick from the first silent one after `since` stays silent
    pub fn stays_silent_after(&self, since: Duration) -> bool {
        let mut silent = false;
        for record in self.records.iter().filter(|r| r.at >= since) {
            if record.params.mix_level == 0.0 {
                silent = true;
            } else if silent {
                return false;
            }
        }
        silent
    }

    pub fn all_within(&self, ranges: &ParamRanges) -> bool {
        self.records
            .iter()
            .all(|r| r.params.is_finite() && r.params.is_within(ranges))
    }

    /// Sum of all tick deltas the controller saw
    pub fn total_dt(&self) -> Duration {
        self.records.iter().map(|r| r.dt).sum()
    }
}

/// Single-threaded session over one controller and one device
pub struct VirtualSession<D: AudioDevice> {
    config: SessionConfig,
    controller: Controller,
    device: D,
    clock: TickClock,
    base: Instant,
    interval: Duration,
    rng: StdRng,
}

impl<D: AudioDevice> VirtualSession<D> {
    pub fn new(config: SessionConfig, device: D) -> PurrResult<Self> {
        let controller = Controller::new(config.control.clone())?;
        let interval = config.control.tick_interval();
        let mut clock = TickClock::new(config.control.max_tick_gap());
        let base = Instant::now();
        clock.start_at(base);
        let rng = StdRng::seed_from_u64(config.seed);

        Ok(VirtualSession {
            config,
            controller,
            device,
            clock,
            base,
            interval,
            rng,
        })
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    fn tick_time(&mut self, nominal: Duration, after: Duration) -> Duration {
        let jitter = self.config.tick_jitter;
        let at = if jitter.is_zero() {
            nominal
        } else {
            let offset = self.rng.gen_range(-jitter.as_secs_f64()..=jitter.as_secs_f64());
            if offset >= 0.0 {
                nominal + Duration::from_secs_f64(offset)
            } else {
                nominal.saturating_sub(Duration::from_secs_f64(-offset))
            }
        };
        at.max(after)
    }

    /// Play `script` against the controller for `duration` of virtual time.
    ///
    /// The first tick lands one interval after the start. Events are applied
    /// in order before the first tick at or after their timestamp.
    pub fn run(mut self, script: &PoseScript, duration: Duration) -> SessionTrace {
        let events = script.events();
        let mut next_event = 0;
        let mut now = Duration::ZERO;
        let mut trace = SessionTrace::default();

        for k in 1u32.. {
            let nominal = self.interval * k;
            if nominal > duration {
                break;
            }
            if self.config.stalled(nominal) {
                continue;
            }
            let at = self.tick_time(nominal, now).min(duration);

            while next_event < events.len() && events[next_event].at <= at {
                self.controller.handle_event(events[next_event].event);
                next_event += 1;
            }

            let dt = self.clock.tick_at(self.base + at);
            now = at;
            let params = self.controller.tick(dt);
            let write_ok = self.device.apply(&params).is_ok();
            if !write_ok {
                trace.device_failures += 1;
            }

            trace.records.push(TickRecord {
                at,
                dt,
                mode: self.controller.mode(),
                envelope_level: self.controller.envelope_level(),
                proximity: self.controller.proximity(),
                drive: self.controller.drive(),
                params,
                write_ok,
            });
        }

        trace.tick_stalls = self.clock.stalls();
        trace.stats = self.controller.stats().clone();
        trace
    }
}
