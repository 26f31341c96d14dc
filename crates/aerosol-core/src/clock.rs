//! Wall-clock time sources
//!
//! The engine never reads a global clock. Anything that needs "now" takes a
//! [`Clock`], so hardware builds can back it with an RTC or network time and
//! tests can step time by hand.

use core::cell::Cell;

use embassy_time::Duration;

/// Shortest sleep the scheduler will request, so a boundary that lands
/// exactly on `now` cannot spin.
pub const MIN_SLEEP: Duration = Duration::from_millis(1);

/// Source of wall-clock time in seconds since the Unix epoch.
pub trait Clock {
    /// Current time in (fractional) seconds.
    fn now(&self) -> f64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

/// Clock that only moves when told to.
///
/// Used by the test suites and by the simulator, which fast-forwards time
/// instead of sleeping.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub const fn new(start: f64) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, time: f64) {
        self.now.set(time);
    }

    /// Move forward by `seconds`.
    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

/// Time left until `target`, never shorter than [`MIN_SLEEP`].
pub fn sleep_until(target: f64, now: f64) -> Duration {
    let remaining = target - now;
    if !(remaining > 0.0) {
        return MIN_SLEEP;
    }
    let micros = remaining * 1_000_000.0;
    let wait = if micros >= u64::MAX as f64 {
        Duration::MAX
    } else {
        Duration::from_micros(micros as u64)
    };
    if wait < MIN_SLEEP { MIN_SLEEP } else { wait }
}
