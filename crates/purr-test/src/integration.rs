//! End-to-end scenarios over the controller
//!
//! Each scenario runs a virtual-time session and reports the numbers its
//! assertions need, so the same runs can back tests and benchmarks.

use std::time::Duration;

use purr_core::{ControlConfig, PurrResult};
use purr_pose::PoseSample;

use crate::device::RecordingDevice;
use crate::script::PoseScript;
use crate::session::{SessionConfig, SessionTrace, VirtualSession};

/// Detector cadence used by the scenarios
pub const DETECTOR_PERIOD: Duration = Duration::from_nanos(33_333_333);

/// Attack: a centered face seen a few times, 100ms apart
#[derive(Clone, Debug)]
pub struct AttackReport {
    /// Envelope level on the first tick after each pose
    pub levels: Vec<f64>,
    /// Mix level written on the first tick after each pose
    pub mix: Vec<f64>,
    pub trace: SessionTrace,
}

impl AttackReport {
    pub fn strictly_rising(&self) -> bool {
        rising(&self.levels) && rising(&self.mix)
    }
}

/// Release: a face held long enough to saturate, then lost
#[derive(Clone, Debug)]
pub struct ReleaseReport {
    /// Envelope level when the face went away
    pub level_at_loss: f64,
    /// Time from the loss until the mix first reads zero
    pub silent_after: Option<Duration>,
    pub stays_silent: bool,
    pub trace: SessionTrace,
}

fn rising(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[1] > w[0])
}

fn recorded_session(config: SessionConfig) -> PurrResult<VirtualSession<RecordingDevice>> {
    VirtualSession::new(config, RecordingDevice::new())
}

/// Three centered poses at 0, 100 and 200ms
pub fn scenario_attack(config: ControlConfig) -> PurrResult<AttackReport> {
    let times = [0u64, 100, 200].map(Duration::from_millis);
    let script = times
        .iter()
        .fold(PoseScript::new(), |script, at| script.pose_at(*at, PoseSample::centered()));

    let trace = recorded_session(SessionConfig::with_control(config))?
        .run(&script, Duration::from_millis(300));

    let after_poses: Vec<_> = times
        .iter()
        .filter_map(|at| trace.first_at_or_after(*at))
        .collect();

    Ok(AttackReport {
        levels: after_poses.iter().map(|r| r.envelope_level).collect(),
        mix: after_poses.iter().map(|r| r.params.mix_level).collect(),
        trace,
    })
}

/// Face held for `hold`, then reported lost every detector cycle for `release`
pub fn scenario_release(
    config: ControlConfig,
    hold: Duration,
    release: Duration,
) -> PurrResult<ReleaseReport> {
    let script = PoseScript::new()
        .poses_between(Duration::ZERO, hold, DETECTOR_PERIOD, PoseSample::centered())
        .faces_lost_between(hold, hold + release, DETECTOR_PERIOD);

    let trace =
        recorded_session(SessionConfig::with_control(config))?.run(&script, hold + release);

    let level_at_loss = trace
        .records
        .iter()
        .take_while(|r| r.at < hold)
        .last()
        .map(|r| r.envelope_level)
        .unwrap_or_default();

    Ok(ReleaseReport {
        level_at_loss,
        silent_after: trace.silent_after(hold),
        stays_silent: trace.stays_silent_after(hold),
        trace,
    })
}

/// Turn: head turns from center to `yaw_degrees` over one second
#[derive(Clone, Debug)]
pub struct TurnReport {
    /// Cutoff written on each tick of the turn
    pub cutoff: Vec<f64>,
    /// Mix written on each tick of the turn
    pub mix: Vec<f64>,
    pub trace: SessionTrace,
}

pub fn scenario_turn_away(config: ControlConfig, yaw_degrees: f64) -> PurrResult<TurnReport> {
    let turn = Duration::from_secs(1);
    let script = PoseScript::new().turn(
        Duration::ZERO,
        turn,
        DETECTOR_PERIOD,
        PoseSample::centered(),
        PoseSample::from_degrees(0.0, yaw_degrees, 0.0),
    );
    let trace = recorded_session(SessionConfig::with_control(config))?.run(&script, turn);

    Ok(TurnReport {
        cutoff: trace.records.iter().map(|r| r.params.cutoff_frequency).collect(),
        mix: trace.mix_levels(),
        trace,
    })
}

/// Drive after `ticks` idle ticks at the configured rate
pub fn scenario_drive(config: ControlConfig, ticks: u32) -> PurrResult<f64> {
    let duration = config.tick_interval() * ticks;
    let trace =
        recorded_session(SessionConfig::with_control(config))?.run(&PoseScript::new(), duration);
    Ok(trace.last().map(|r| r.drive).unwrap_or(0.5))
}

/// Noisy head movement with dropouts, jittered ticks and one stall
pub fn scenario_wandering(seed: u64, duration: Duration) -> PurrResult<SessionTrace> {
    let script = PoseScript::wandering(seed, duration, DETECTOR_PERIOD, 0.45, 0.25);
    let config = SessionConfig::default()
        .with_jitter(Duration::from_millis(8), seed)
        .with_stall(duration / 2, Duration::from_millis(600));
    Ok(recorded_session(config)?.run(&script, duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use purr_runtime::ControlMode;

    #[test]
    fn test_attack_rises_with_each_pose() {
        let report = scenario_attack(ControlConfig::default()).unwrap();

        assert_eq!(report.levels.len(), 3);
        assert!(report.strictly_rising(), "{:?}", report.levels);
        assert_eq!(report.levels[0], 0.05);
        assert!((report.levels[2] - 0.05 * 1.15 * 1.15).abs() < 1e-12);
        assert_eq!(report.levels, report.mix);
    }

    #[test]
    fn test_release_reaches_silence_within_two_seconds() {
        let report = scenario_release(
            ControlConfig::default(),
            Duration::from_secs(3),
            Duration::from_secs(2),
        )
        .unwrap();

        assert_eq!(report.level_at_loss, 1.0);
        let silent_after = report.silent_after.expect("never went silent");
        assert!(silent_after < Duration::from_secs(2), "{:?}", silent_after);
        assert!(report.stays_silent);
        assert_eq!(report.trace.last().unwrap().mode, ControlMode::Idle);
    }

    #[test]
    fn test_release_after_short_hold_is_quicker() {
        let short = scenario_release(
            ControlConfig::default(),
            Duration::from_millis(300),
            Duration::from_secs(2),
        )
        .unwrap();
        let long = scenario_release(
            ControlConfig::default(),
            Duration::from_secs(3),
            Duration::from_secs(2),
        )
        .unwrap();

        assert!(short.level_at_loss < long.level_at_loss);
        assert!(short.silent_after.unwrap() < long.silent_after.unwrap());
    }

    #[test]
    fn test_turning_away_darkens_but_keeps_volume() {
        let report = scenario_turn_away(ControlConfig::default(), 30.0).unwrap();

        // Timbre follows the instant pose; loudness follows the envelope
        assert!(report.cutoff[0] > 290.0, "{:?}", report.cutoff);
        assert_eq!(report.cutoff.last().copied(), Some(130.0));
        assert!(report.cutoff.windows(2).all(|w| w[1] <= w[0]));
        assert!(rising(&report.mix[..20]));
        assert_eq!(report.mix.last().copied(), Some(1.0));
    }

    #[test]
    fn test_drive_half_way_after_half_period() {
        let config = ControlConfig {
            oscillator_period: 2.0,
            tick_rate: 30.0,
            ..Default::default()
        };
        let drive = scenario_drive(config, 30).unwrap();
        assert!((drive - 0.5).abs() < 1e-6, "drive = {}", drive);
    }

    #[test]
    fn test_drive_peaks_at_quarter_period() {
        let drive = scenario_drive(ControlConfig::default(), 15).unwrap();
        assert!((drive - 1.0).abs() < 1e-6, "drive = {}", drive);
    }

    #[test]
    fn test_calm_preset_releases_slower() {
        let default = scenario_release(
            ControlConfig::default(),
            Duration::from_secs(3),
            Duration::from_secs(4),
        )
        .unwrap();
        let calm = scenario_release(
            ControlConfig::calm(),
            Duration::from_secs(3),
            Duration::from_secs(4),
        )
        .unwrap();

        assert!(calm.silent_after.unwrap_or(Duration::MAX) > default.silent_after.unwrap());
    }

    #[test]
    fn test_wandering_stays_in_range() {
        let trace = scenario_wandering(11, Duration::from_secs(10)).unwrap();
        let ranges = ControlConfig::default().ranges;

        assert!(trace.all_within(&ranges));
        assert_eq!(trace.tick_stalls, 1);
        assert!(trace.stats.poses_observed > 0);
        assert!(trace.stats.faces_lost > 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_any_session_stays_in_range(seed in any::<u64>(), secs in 1u64..6) {
            let trace = scenario_wandering(seed, Duration::from_secs(secs)).unwrap();
            prop_assert!(trace.all_within(&ControlConfig::default().ranges));
        }

        #[test]
        fn prop_drive_follows_wall_time(seed in any::<u64>(), secs in 1u64..6) {
            let trace = scenario_wandering(seed, Duration::from_secs(secs)).unwrap();
            let last = trace.last().unwrap();
            let period = ControlConfig::default().oscillator_period;
            let expected =
                0.5 + 0.5 * (std::f64::consts::TAU * last.at.as_secs_f64() / period).sin();
            prop_assert!((last.drive - expected).abs() < 1e-6);
        }
    }
}
