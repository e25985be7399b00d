//! Controller runtime - the 30 Hz tick task and its two handoffs
//!
//! ```text
//!  detector thread(s)     tick task (tokio)        writer (blocking)
//!  PoseSender ──▶ mpsc ──▶ Controller ──▶ mpsc ──▶ AudioDevice::apply
//!                              │
//!                              └──▶ watch<ControlSnapshot>
//! ```
//!
//! The tick task is the only owner of controller state. Neither handoff ever
//! blocks it: full queues drop the newest item and count it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use purr_core::{ControlConfig, ParameterSet, PurrError, PurrResult};
use purr_pose::PoseSample;
use purr_synth::AudioDevice;
use purr_time::TickClock;

use crate::{ControlEvent, ControlSnapshot, Controller};

/// Counters updated outside the tick task
#[derive(Debug, Default)]
struct SharedCounters {
    device_writes: AtomicU64,
    device_write_failures: AtomicU64,
    events_dropped: AtomicU64,
}

/// Detector-side handle. Cheap to clone, usable from any thread, never blocks.
#[derive(Clone, Debug)]
pub struct PoseSender {
    tx: mpsc::Sender<ControlEvent>,
    counters: Arc<SharedCounters>,
}

impl PoseSender {
    /// Report a detected face
    pub fn on_pose_observed(&self, pitch: f64, yaw: f64, roll: f64) -> PurrResult<()> {
        self.send(ControlEvent::PoseObserved(PoseSample::new(pitch, yaw, roll)))
    }

    pub fn on_pose_sample(&self, sample: PoseSample) -> PurrResult<()> {
        self.send(ControlEvent::PoseObserved(sample))
    }

    /// Report a detection cycle with no face
    pub fn on_face_lost(&self) -> PurrResult<()> {
        self.send(ControlEvent::FaceLost)
    }

    pub fn send(&self, event: ControlEvent) -> PurrResult<()> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.counters.events_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(?event, "event queue full, dropping");
                Err(PurrError::EventQueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(PurrError::NotRunning),
        }
    }
}

/// Running control loop
pub struct ControllerRuntime {
    events: PoseSender,
    snapshot: watch::Receiver<ControlSnapshot>,
    shutdown: Option<oneshot::Sender<()>>,
    tick_task: Option<JoinHandle<Controller>>,
    writer_task: Option<JoinHandle<()>>,
}

impl ControllerRuntime {
    /// Validate `config` and start the loop. Must be called inside a tokio
    /// runtime.
    pub fn spawn<D: AudioDevice>(config: ControlConfig, device: D) -> PurrResult<Self> {
        let controller = Controller::new(config)?;
        let config = controller.config().clone();

        let counters = Arc::new(SharedCounters::default());
        let (event_tx, event_rx) = mpsc::channel(config.event_queue_capacity);
        let (device_tx, device_rx) = mpsc::channel(config.device_queue_capacity);
        let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let writer_task = {
            let counters = Arc::clone(&counters);
            tokio::task::spawn_blocking(move || run_device_writer(device, device_rx, counters))
        };

        let tick_task = tokio::spawn(run_tick_loop(
            controller,
            TickLoopChannels {
                events: event_rx,
                device: device_tx,
                snapshot: snapshot_tx,
                shutdown: shutdown_rx,
            },
            Arc::clone(&counters),
        ));

        tracing::info!(
            tick_rate = config.tick_rate,
            period = config.oscillator_period,
            "controller started"
        );

        Ok(ControllerRuntime {
            events: PoseSender {
                tx: event_tx,
                counters,
            },
            snapshot: snapshot_rx,
            shutdown: Some(shutdown_tx),
            tick_task: Some(tick_task),
            writer_task: Some(writer_task),
        })
    }

    /// Handle for the detection pipeline
    pub fn pose_sender(&self) -> PoseSender {
        self.events.clone()
    }

    /// Restart envelope and oscillator
    pub fn reset(&self) -> PurrResult<()> {
        self.events.send(ControlEvent::Reset)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> ControlSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<ControlSnapshot> {
        self.snapshot.clone()
    }

    pub fn is_running(&self) -> bool {
        self.tick_task.is_some()
    }

    /// Halt the tick loop and drain the device writer.
    ///
    /// When this returns no further tick runs and no further device write
    /// happens. Calling it again is a no-op.
    pub async fn stop(&mut self) -> PurrResult<()> {
        let Some(tick_task) = self.tick_task.take() else {
            return Ok(());
        };
        if let Some(shutdown) = self.shutdown.take() {
            // Err means the loop already exited
            let _ = shutdown.send(());
        }

        let controller = join_tasks(tick_task, self.writer_task.take()).await?;

        let stats = controller.stats();
        tracing::info!(
            ticks = stats.ticks,
            poses = stats.poses_observed,
            dropped_writes = stats.device_writes_dropped,
            stalls = stats.tick_stalls,
            "controller stopped"
        );
        Ok(())
    }
}

/// Await the tick task, then the writer. The writer is always joined, even
/// when the tick task failed; the first failure is returned.
async fn join_tasks(
    tick_task: JoinHandle<Controller>,
    writer_task: Option<JoinHandle<()>>,
) -> PurrResult<Controller> {
    let tick_result = tick_task.await;

    // The tick loop owned the device sender, so the writer drains and exits
    // however the loop ended
    let writer_result = match writer_task {
        Some(writer) => writer.await,
        None => Ok(()),
    };

    let controller = tick_result.map_err(|e| PurrError::TaskFailed(e.to_string()))?;
    writer_result.map_err(|e| PurrError::TaskFailed(e.to_string()))?;
    Ok(controller)
}

impl Drop for ControllerRuntime {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

struct TickLoopChannels {
    events: mpsc::Receiver<ControlEvent>,
    device: mpsc::Sender<ParameterSet>,
    snapshot: watch::Sender<ControlSnapshot>,
    shutdown: oneshot::Receiver<()>,
}

async fn run_tick_loop(
    mut controller: Controller,
    channels: TickLoopChannels,
    counters: Arc<SharedCounters>,
) -> Controller {
    let TickLoopChannels {
        mut events,
        device,
        snapshot,
        mut shutdown,
    } = channels;

    let mut ticker = interval(controller.config().tick_interval());
    // Late ticks are absorbed by dt, so never burst to catch up
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut clock = TickClock::new(controller.config().max_tick_gap());

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => break,

            Some(event) = events.recv() => {
                controller.handle_event(event);
            }

            _ = ticker.tick() => {
                // Measure when the tick actually ran, not when it was due
                let dt = clock.tick();
                let params = controller.tick(dt);

                match device.try_send(params) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        controller.stats_mut().device_writes_dropped += 1;
                        tracing::debug!("device writer behind, skipping tick write");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        controller.stats_mut().device_writes_dropped += 1;
                        tracing::warn!("device writer gone, skipping tick write");
                    }
                }

                let stats = controller.stats_mut();
                stats.tick_stalls = clock.stalls();
                stats.device_writes = counters.device_writes.load(Ordering::Relaxed);
                stats.device_write_failures =
                    counters.device_write_failures.load(Ordering::Relaxed);
                stats.events_dropped = counters.events_dropped.load(Ordering::Relaxed);

                // No receivers is fine; the handle may not be watching
                let _ = snapshot.send(controller.snapshot());
            }
        }
    }

    controller
}

/// Blocking writer loop. Failures are logged once per outage, not per tick.
fn run_device_writer<D: AudioDevice>(
    mut device: D,
    mut rx: mpsc::Receiver<ParameterSet>,
    counters: Arc<SharedCounters>,
) {
    let mut failing = false;
    while let Some(params) = rx.blocking_recv() {
        match device.apply(&params) {
            Ok(()) => {
                counters.device_writes.fetch_add(1, Ordering::Relaxed);
                if failing {
                    tracing::info!("audio device recovered");
                    failing = false;
                }
            }
            Err(e) => {
                counters.device_write_failures.fetch_add(1, Ordering::Relaxed);
                if failing {
                    tracing::debug!(error = %e, "device write failed");
                } else {
                    tracing::warn!(error = %e, "device write failed, control loop continues");
                    failing = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    use parking_lot::Mutex;
    use purr_synth::DeviceError;

    use crate::ControlMode;

    /// Records every applied parameter set
    #[derive(Clone, Default)]
    struct SharedRecorder {
        writes: Arc<Mutex<Vec<ParameterSet>>>,
    }

    impl AudioDevice for SharedRecorder {
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
        fn apply(&mut self, params: &ParameterSet) -> Result<(), DeviceError> {
            self.writes.lock().push(*params);
            Ok(())
        }
    }

    struct DeadDevice;

    impl AudioDevice for DeadDevice {
        fn set_cutoff_frequency(&mut self, _hz: f64) -> Result<(), DeviceError> {
            Err(DeviceError::NotRunning)
        }
        fn set_resonance(&mut self, _resonance: f64) -> Result<(), DeviceError> {
            Err(DeviceError::NotRunning)
        }
        fn set_modulation_rate(&mut self, _hz: f64) -> Result<(), DeviceError> {
            Err(DeviceError::NotRunning)
        }
        fn set_modulation_depth(&mut self, _depth: f64) -> Result<(), DeviceError> {
            Err(DeviceError::NotRunning)
        }
        fn set_mix_level(&mut self, _level: f64) -> Result<(), DeviceError> {
            Err(DeviceError::NotRunning)
        }
        fn set_breath_level(&mut self, _level: f64) -> Result<(), DeviceError> {
            Err(DeviceError::NotRunning)
        }
    }

    #[tokio::test]
    async fn test_runtime_writes_parameters() {
        let recorder = SharedRecorder::default();
        let mut runtime =
            ControllerRuntime::spawn(ControlConfig::default(), recorder.clone()).unwrap();
        let poses = runtime.pose_sender();

        for _ in 0..5 {
            poses.on_pose_observed(0.0, 0.0, 0.0).unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        runtime.stop().await.unwrap();

        let writes = recorder.writes.lock();
        assert!(!writes.is_empty());
        let ranges = ControlConfig::default().ranges;
        assert!(writes.iter().all(|p| p.is_within(&ranges)));
        let last = writes.last().unwrap();
        assert!(last.mix_level > 0.0);
        assert_eq!(last.cutoff_frequency, 300.0);
    }

    #[tokio::test]
    async fn test_snapshot_tracks_mode() {
        let mut runtime =
            ControllerRuntime::spawn(ControlConfig::default(), SharedRecorder::default()).unwrap();
        let mut updates = runtime.subscribe();

        runtime.pose_sender().on_pose_observed(0.05, -0.05, 0.0).unwrap();
        updates.changed().await.unwrap();
        updates.changed().await.unwrap();
        assert_eq!(runtime.snapshot().mode, ControlMode::Tracking);

        runtime.pose_sender().on_face_lost().unwrap();
        updates.changed().await.unwrap();
        updates.changed().await.unwrap();
        let snapshot = runtime.snapshot();
        assert_eq!(snapshot.mode, ControlMode::Idle);
        assert_eq!(snapshot.stats.faces_lost, 1);

        runtime.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_is_final_and_idempotent() {
        let recorder = SharedRecorder::default();
        let mut runtime =
            ControllerRuntime::spawn(ControlConfig::default(), recorder.clone()).unwrap();
        let poses = runtime.pose_sender();
        tokio::time::sleep(Duration::from_millis(100)).await;

        runtime.stop().await.unwrap();
        assert!(!runtime.is_running());
        let count = recorder.writes.lock().len();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(recorder.writes.lock().len(), count);

        runtime.stop().await.unwrap();
        assert_eq!(poses.on_face_lost(), Err(PurrError::NotRunning));
    }

    struct PanickingDevice;

    impl AudioDevice for PanickingDevice {
        fn set_cutoff_frequency(&mut self, _hz: f64) -> Result<(), DeviceError> {
            panic!("driver crashed")
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

    #[tokio::test]
    async fn test_writer_joined_when_tick_task_fails() {
        let writer_done = Arc::new(AtomicBool::new(false));
        let writer = {
            let writer_done = Arc::clone(&writer_done);
            tokio::task::spawn_blocking(move || {
                std::thread::sleep(Duration::from_millis(50));
                writer_done.store(true, Ordering::SeqCst);
            })
        };
        let tick: JoinHandle<Controller> = tokio::spawn(async { panic!("tick loop died") });

        let result = join_tasks(tick, Some(writer)).await;
        assert!(matches!(result, Err(PurrError::TaskFailed(_))));
        assert!(writer_done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_writer_panic_reported_once() {
        let mut runtime =
            ControllerRuntime::spawn(ControlConfig::default(), PanickingDevice).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        // The tick loop keeps running without a writer
        assert!(runtime.snapshot().stats.device_writes_dropped >= 1);

        let first = runtime.stop().await;
        assert!(matches!(first, Err(PurrError::TaskFailed(_))));
        assert!(!runtime.is_running());
        assert_eq!(runtime.stop().await, Ok(()));
    }

    #[tokio::test]
    async fn test_failing_device_does_not_stop_loop() {
        let mut runtime = ControllerRuntime::spawn(ControlConfig::default(), DeadDevice).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        let snapshot = runtime.snapshot();
        assert!(snapshot.stats.ticks >= 3);
        assert!(snapshot.stats.device_write_failures >= 1);
        assert_eq!(snapshot.stats.device_writes, 0);
        assert!(runtime.is_running());

        runtime.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_config_never_starts() {
        let config = ControlConfig {
            decay_gain: 1.5,
            ..Default::default()
        };
        let result = ControllerRuntime::spawn(config, SharedRecorder::default());
        assert!(matches!(result, Err(PurrError::ConfigInvalid { .. })));
    }

    #[tokio::test]
    async fn test_full_event_queue_drops() {
        let config = ControlConfig {
            event_queue_capacity: 1,
            ..Default::default()
        };
        let mut runtime = ControllerRuntime::spawn(config, SharedRecorder::default()).unwrap();
        let poses = runtime.pose_sender();

        // Nothing drains the queue until this task yields
        poses.on_pose_observed(0.0, 0.0, 0.0).unwrap();
        assert_eq!(
            poses.on_pose_observed(0.0, 0.0, 0.0),
            Err(PurrError::EventQueueFull)
        );

        runtime.stop().await.unwrap();
    }
}
