//! Time sources and blocking sleep used by the throttler.
//!
//! The throttler never reads the system clock or sleeps directly; it goes
//! through [`Clock`] and [`Sleeper`] so a dispatch path can be driven by a
//! virtual clock in simulations and tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

/// A source of the current time in milliseconds since the Unix epoch.
pub trait Clock {
    /// Returns the current time in milliseconds.
    fn now_ms(&self) -> i64;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

/// Blocks the calling dispatch path.
pub trait Sleeper {
    /// Sleep for `ms` milliseconds. Not cancellable.
    fn sleep_ms(&self, ms: u64);
}

impl<T: Sleeper + ?Sized> Sleeper for &T {
    fn sleep_ms(&self, ms: u64) {
        (**self).sleep_ms(ms)
    }
}

/// Wall clock backed by `chrono::Utc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Sleeps the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep_ms(&self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

/// A virtual clock that only moves when told to.
///
/// It is also a [`Sleeper`]: sleeping advances the clock by the requested
/// amount instead of blocking, and the requested durations are kept so they
/// can be inspected afterwards. Clones share the same time line.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<i64>>,
    sleeps: Rc<RefCell<Vec<u64>>>,
}

impl ManualClock {
    /// Create a clock reading `start_ms`.
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
            sleeps: Rc::default(),
        }
    }

    /// Jump to an absolute time. Going backwards is allowed.
    pub fn set(&self, now_ms: i64) {
        self.now.set(now_ms);
    }

    /// Move the clock forward by `ms`.
    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get().saturating_add_unsigned(ms));
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<u64> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }
}

impl Sleeper for ManualClock {
    fn sleep_ms(&self, ms: u64) {
        self.sleeps.borrow_mut().push(ms);
        self.advance(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_sleep_advances_shared_time() {
        let clock = ManualClock::new(100);
        let handle = clock.clone();

        clock.sleep_ms(250);
        assert_eq!(handle.now_ms(), 350);
        assert_eq!(handle.sleeps(), vec![250]);

        handle.set(10);
        assert_eq!(clock.now_ms(), 10);
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }

    #[test]
    fn test_thread_sleeper_blocks() {
        let start = std::time::Instant::now();
        ThreadSleeper.sleep_ms(5);
        assert!(start.elapsed() >= Duration::from_millis(5));
    }
}
