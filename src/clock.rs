//! Time source for every blocking wait in the pipeline
//!
//! Retry backoff, ingestion polling and search warm-up all sleep through a
//! [`Clock`], so tests can drive them with [`ManualClock`] instead of real time.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Monotonic time plus blocking sleep
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin
    fn now(&self) -> Duration;

    /// Block the current thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant`] and [`std::thread::sleep`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Deterministic clock: time only moves on `sleep`, `advance`, or the per-read tick
///
/// Every `sleep` call is recorded so tests can assert on backoff schedules.
#[derive(Debug, Default)]
pub struct ManualClock {
    state: Mutex<ManualState>,
}

#[derive(Debug, Default)]
struct ManualState {
    now: Duration,
    tick: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock that also advances by `tick` on every `now()` read
    ///
    /// Lets timed sections (query latency) observe a non-zero duration.
    pub fn with_tick(tick: Duration) -> Self {
        let clock = Self::default();
        clock.state.lock().tick = tick;
        clock
    }

    pub fn advance(&self, by: Duration) {
        self.state.lock().now += by;
    }

    /// All durations passed to `sleep`, in call order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().sleeps.clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let mut state = self.state.lock();
        let tick = state.tick;
        state.now += tick;
        state.now
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock();
        state.now += duration;
        state.sleeps.push(duration);
    }
}
