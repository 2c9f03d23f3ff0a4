//! Time source and pacing
//!
//! Every pacing delay in the translator (key hold, step delay, scroll delay)
//! goes through [`Clock::sleep`]. While the loop sleeps it does not poll the
//! device, so rapid lever motion during a delay is only seen afterwards.

use std::cell::Cell;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

/// Monotonic time plus a blocking suspend.
pub trait Clock {
    fn now(&self) -> Instant;

    /// Suspend the polling loop for `duration`.
    fn sleep(&mut self, duration: Duration);
}

/// Wall clock backed by `Instant::now` and `thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&mut self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Virtual clock that only moves when slept or advanced.
///
/// Clones share the same timeline, so a recording sink or a scripted device
/// can read (and advance) the time the engine sees.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    /// Move virtual time forward without going through the engine.
    pub fn advance(&self, duration: Duration) {
        self.elapsed.set(self.elapsed.get() + duration);
    }

    /// Virtual time since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed.get()
    }

    fn sleep(&mut self, duration: Duration) {
        self.advance(duration);
    }
}
