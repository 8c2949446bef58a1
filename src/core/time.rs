//! Simulation time.
//!
//! The whole crate runs off one logical clock that advances in fixed
//! steps. Timers store absolute timestamps from that clock rather than
//! counting down themselves, so they stay cheap to check every tick.

/// Fixed-step logical clock driving a simulation session.
///
/// `now()` is derived purely from the tick counter, so two sessions
/// advanced the same number of times agree on time exactly.
#[derive(Debug, Clone)]
pub struct SimClock {
    tick: u64,
    tick_interval: f32,
}

impl SimClock {
    /// Creates a clock advancing by `tick_interval` seconds per tick.
    #[must_use]
    pub fn new(tick_interval: f32) -> Self {
        Self {
            tick: 0,
            tick_interval: tick_interval.max(1.0e-4),
        }
    }

    /// Advances the clock by one tick.
    pub fn advance(&mut self) {
        self.tick += 1;
    }

    /// Current time in seconds since the session started.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.tick as f64 * self.tick_interval as f64
    }

    /// Number of ticks advanced so far.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Seconds covered by a single tick.
    #[must_use]
    pub fn delta(&self) -> f32 {
        self.tick_interval
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(1.0 / 60.0)
    }
}

/// One-shot timer that fires once a deadline passes.
///
/// An unstarted countdown reports itself as elapsed, which lets callers
/// gate periodic work with a single check.
#[derive(Debug, Clone, Copy, Default)]
pub struct Countdown {
    deadline: Option<f64>,
}

impl Countdown {
    /// Arms the timer to elapse `duration` seconds after `now`.
    pub fn start(&mut self, now: f64, duration: f32) {
        self.deadline = Some(now + duration as f64);
    }

    /// Disarms the timer.
    pub fn invalidate(&mut self) {
        self.deadline = None;
    }

    #[must_use]
    pub fn has_started(&self) -> bool {
        self.deadline.is_some()
    }

    /// True if the timer was never started or its deadline has passed.
    #[must_use]
    pub fn is_elapsed(&self, now: f64) -> bool {
        match self.deadline {
            Some(deadline) => now >= deadline,
            None => true,
        }
    }

    /// Seconds remaining until the deadline, zero if elapsed or unset.
    #[must_use]
    pub fn remaining(&self, now: f64) -> f32 {
        match self.deadline {
            Some(deadline) => (deadline - now).max(0.0) as f32,
            None => 0.0,
        }
    }
}

/// Measures time elapsed since a starting point.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stopwatch {
    since: Option<f64>,
}

impl Stopwatch {
    pub fn start(&mut self, now: f64) {
        self.since = Some(now);
    }

    pub fn reset(&mut self) {
        self.since = None;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.since.is_some()
    }

    /// Seconds since `start`, zero if never started.
    #[must_use]
    pub fn elapsed(&self, now: f64) -> f32 {
        match self.since {
            Some(since) => (now - since).max(0.0) as f32,
            None => 0.0,
        }
    }
}

/// Schedules capability updates at a fixed minimum interval.
///
/// `due` returns the seconds accumulated since the last granted update,
/// or `None` when the interval has not passed yet. The first call after
/// construction (or `reset`) is granted immediately and reports one
/// clock tick of elapsed time, so a capability never divides by zero.
#[derive(Debug, Clone, Copy)]
pub struct UpdateTimer {
    interval: f32,
    last: Option<f64>,
}

impl UpdateTimer {
    /// An interval of zero runs every tick.
    #[must_use]
    pub fn new(interval: f32) -> Self {
        Self {
            interval: interval.max(0.0),
            last: None,
        }
    }

    pub fn set_interval(&mut self, interval: f32) {
        self.interval = interval.max(0.0);
    }

    #[must_use]
    pub fn interval(&self) -> f32 {
        self.interval
    }

    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Grants an update when enough clock time has accumulated.
    pub fn due(&mut self, clock: &SimClock) -> Option<f32> {
        self.due_at(clock.now(), clock.delta())
    }

    /// As [`due`](Self::due), keyed off a raw timestamp. `delta` is the
    /// elapsed time reported when this is the first call.
    pub fn due_at(&mut self, now: f64, delta: f32) -> Option<f32> {
        match self.last {
            None => {
                self.last = Some(now);
                Some(delta)
            }
            Some(last) => {
                let elapsed = (now - last) as f32;
                if elapsed > 0.0 && elapsed >= self.interval {
                    self.last = Some(now);
                    Some(elapsed)
                } else {
                    None
                }
            }
        }
    }
}

// ===== Tests =====
