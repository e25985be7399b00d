//! Pose scripts - timed detector output for driving a controller

use std::time::Duration;

use purr_pose::PoseSample;
use purr_runtime::ControlEvent;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One scripted detector report
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScriptedEvent {
    pub at: Duration,
    pub event: ControlEvent,
}

/// Timeline of detector reports, kept sorted by time.
///
/// Events with equal timestamps keep their insertion order.
#[derive(Clone, Debug, Default)]
pub struct PoseScript {
    events: Vec<ScriptedEvent>,
}

impl PoseScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single event
    pub fn at(mut self, at: Duration, event: ControlEvent) -> Self {
        let index = self.events.partition_point(|e| e.at <= at);
        self.events.insert(index, ScriptedEvent { at, event });
        self
    }

    pub fn pose_at(self, at: Duration, sample: PoseSample) -> Self {
        self.at(at, ControlEvent::PoseObserved(sample))
    }

    pub fn face_lost_at(self, at: Duration) -> Self {
        self.at(at, ControlEvent::FaceLost)
    }

    /// Repeat a pose every `every` over `[start, end)`
    pub fn poses_between(
        mut self,
        start: Duration,
        end: Duration,
        every: Duration,
        sample: PoseSample,
    ) -> Self {
        for at in steps(start, end, every) {
            self = self.pose_at(at, sample);
        }
        self
    }

    /// Report no face every `every` over `[start, end)`
    pub fn faces_lost_between(mut self, start: Duration, end: Duration, every: Duration) -> Self {
        for at in steps(start, end, every) {
            self = self.face_lost_at(at);
        }
        self
    }

    /// Head moving steadily from `from` to `to` over `[start, end)`, one
    /// report every `every`
    pub fn turn(
        mut self,
        start: Duration,
        end: Duration,
        every: Duration,
        from: PoseSample,
        to: PoseSample,
    ) -> Self {
        let span = end.saturating_sub(start).as_secs_f64();
        for at in steps(start, end, every) {
            let t = if span > 0.0 {
                (at - start).as_secs_f64() / span
            } else {
                1.0
            };
            self = self.pose_at(at, from.lerp(&to, t));
        }
        self
    }

    /// Head turning side to side, with the face dropping out at random.
    ///
    /// `yaw_amplitude` is in radians; `dropout` is the chance that a cycle
    /// reports no face.
    pub fn wandering(
        seed: u64,
        duration: Duration,
        every: Duration,
        yaw_amplitude: f64,
        dropout: f64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut script = PoseScript::new();
        for at in steps(Duration::ZERO, duration, every) {
            if rng.gen_bool(dropout.clamp(0.0, 1.0)) {
                script = script.face_lost_at(at);
            } else {
                let t = at.as_secs_f64();
                let yaw = yaw_amplitude * (t * 1.3).sin() + rng.gen_range(-0.02..=0.02);
                let pitch = rng.gen_range(-0.05..=0.05);
                script = script.pose_at(at, PoseSample::new(pitch, yaw, 0.0));
            }
        }
        script
    }

    pub fn events(&self) -> &[ScriptedEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Time of the last event
    pub fn end(&self) -> Duration {
        self.events.last().map(|e| e.at).unwrap_or_default()
    }
}

fn steps(start: Duration, end: Duration, every: Duration) -> impl Iterator<Item = Duration> {
    let every = every.max(Duration::from_micros(1));
    std::iter::successors(Some(start), move |at| Some(*at + every)).take_while(move |at| *at < end)
}
