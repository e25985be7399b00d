//! Tick clock - real elapsed time between control ticks

use std::time::{Duration, Instant};

/// Measures dt between ticks from a monotonic clock.
///
/// INVARIANT: dt is never negative and always equals the real time since the
/// previous tick, so the sum of all dts is the wall time covered. Gaps longer
/// than `stall_threshold` are passed through unchanged and counted as stalls.
#[derive(Debug, Clone)]
pub struct TickClock {
    /// Instant of the previous tick
    last: Option<Instant>,
    /// Gaps above this count as stalls
    stall_threshold: Duration,
    /// Sum of reported dts
    elapsed: Duration,
    ticks: u64,
    stalls: u64,
}

impl TickClock {
    pub fn new(stall_threshold: Duration) -> Self {
        TickClock {
            last: None,
            stall_threshold,
            elapsed: Duration::ZERO,
            ticks: 0,
            stalls: 0,
        }
    }

    /// Mark the starting point without producing a dt
    pub fn start_at(&mut self, now: Instant) {
        self.last = Some(now);
    }

    /// Advance using the OS monotonic clock
    pub fn tick(&mut self) -> Duration {
        self.tick_at(Instant::now())
    }

    /// Advance to `now` and return the time since the previous tick.
    ///
    /// The first tick after construction returns zero.
    pub fn tick_at(&mut self, now: Instant) -> Duration {
        let dt = match self.last {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };
        self.last = Some(now);
        self.ticks += 1;

        if dt > self.stall_threshold {
            self.stalls += 1;
            tracing::debug!(gap_ms = dt.as_millis() as u64, "tick loop stalled");
        }
        self.elapsed += dt;
        dt
    }

    /// Total time reported so far
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Number of ticks whose gap exceeded the stall threshold
    pub fn stalls(&self) -> u64 {
        self.stalls
    }

    pub fn stall_threshold(&self) -> Duration {
        self.stall_threshold
    }
}
