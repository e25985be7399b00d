//! Purr Demo Application
//!
//! Runs the control loop against a synthetic face detector:
//! - The head sweeps left and right, passing through center
//! - Every few seconds the face leaves the frame
//! - Parameter writes go to a tracing device
//!
//! Usage: `purr-demo [config.json] [seconds]`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use purr_core::{ControlConfig, PurrError};
use purr_pose::PoseSample;
use purr_runtime::{init_logging, ControllerRuntime, LogConfig, PoseSender};
use purr_synth::TraceDevice;
use rand::Rng;

/// Detector frame period
const FRAME: Duration = Duration::from_millis(33);
/// One full left-right sweep
const SWEEP_SECS: f64 = 6.0;
/// Peak head turn, in degrees
const SWEEP_DEGREES: f64 = 28.0;
/// Face leaves for the last part of every cycle
const PRESENCE_CYCLE_SECS: f64 = 9.0;
const ABSENT_SECS: f64 = 2.5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(&LogConfig::default())?;

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => ControlConfig::load(&path)?,
        None => ControlConfig::default(),
    };
    let run_for = Duration::from_secs(args.next().and_then(|s| s.parse().ok()).unwrap_or(20));

    tracing::info!(
        tick_rate = config.tick_rate,
        period = config.oscillator_period,
        seconds = run_for.as_secs(),
        "starting purr demo"
    );

    let mut runtime = ControllerRuntime::spawn(config, TraceDevice::new())?;

    let running = Arc::new(AtomicBool::new(true));
    let detector = {
        let poses = runtime.pose_sender();
        let running = running.clone();
        thread::spawn(move || run_detector(poses, running))
    };

    let mut report = tokio::time::interval(Duration::from_secs(1));
    let deadline = tokio::time::sleep(run_for);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
            _ = report.tick() => {
                let snapshot = runtime.snapshot();
                tracing::info!(
                    mode = ?snapshot.mode,
                    level = format!("{:.3}", snapshot.envelope_level),
                    proximity = format!("{:.2}", snapshot.proximity),
                    cutoff = format!("{:.1}", snapshot.params.cutoff_frequency),
                    mix = format!("{:.3}", snapshot.params.mix_level),
                    "status"
                );
            }
        }
    }

    running.store(false, Ordering::SeqCst);
    if detector.join().is_err() {
        tracing::warn!("detector thread panicked");
    }
    runtime.stop().await?;
    Ok(())
}

/// Synthetic detector loop; one report per frame until told to stop
fn run_detector(poses: PoseSender, running: Arc<AtomicBool>) {
    let start = Instant::now();
    let mut rng = rand::thread_rng();

    while running.load(Ordering::SeqCst) {
        let t = start.elapsed().as_secs_f64();
        let present = t % PRESENCE_CYCLE_SECS < PRESENCE_CYCLE_SECS - ABSENT_SECS;

        let result = if present {
            let yaw = SWEEP_DEGREES * (std::f64::consts::TAU * t / SWEEP_SECS).sin();
            let pitch = rng.gen_range(-2.0..=2.0);
            poses.on_pose_sample(PoseSample::from_degrees(pitch, yaw, 0.0))
        } else {
            poses.on_face_lost()
        };

        match result {
            Ok(()) | Err(PurrError::EventQueueFull) => {}
            Err(e) => {
                tracing::warn!(error = %e, "detector stopping");
                break;
            }
        }
        thread::sleep(FRAME);
    }
}
