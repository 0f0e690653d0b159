//! Fixed-capacity sliding window of event timestamps.

use crate::error::{Result, ThrottleError};

/// Default window length in milliseconds.
pub const DEFAULT_PERIOD_MS: u64 = 1000;

/// Age reported for a slot that has never been written.
pub const NEVER_WRITTEN_AGE_MS: u64 = u64::MAX;

/// The slot that the next accepted event will overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OldestSlot {
    /// Stored timestamp, 0 for a slot never written
    pub timestamp: i64,
    /// `|now - timestamp|`, or [`NEVER_WRITTEN_AGE_MS`] for a slot never written
    pub age_ms: u64,
    /// True when the slot has never held an event
    pub vacant: bool,
}

impl OldestSlot {
    /// True when the slot has never held an event.
    pub fn is_vacant(&self) -> bool {
        self.vacant
    }
}

/// A ring of the last `capacity` accepted event timestamps.
///
/// Answers "have `capacity` events happened within the last `period_ms`" in
/// constant time by looking at the slot that is about to be overwritten: if
/// that event is at least one period old, so is every other slot.
///
/// Slots never written read as timestamp 0 and are treated as infinitely
/// old, so a cold window never throttles its first `capacity` events. The
/// `filled` count tracks them explicitly; a real event at time 0 is not
/// mistaken for an empty slot.
#[derive(Debug, Clone)]
pub struct RateWindow {
    history: Vec<i64>,
    /// Index of the most recently written slot, `None` before the first record
    cursor: Option<usize>,
    /// Number of slots written so far, saturating at capacity
    filled: usize,
    period_ms: u64,
}

impl RateWindow {
    /// Create a window tracking `capacity` events per default period.
    pub fn new(capacity: usize) -> Result<Self> {
        let mut window = Self {
            history: Vec::new(),
            cursor: None,
            filled: 0,
            period_ms: DEFAULT_PERIOD_MS,
        };
        window.configure(capacity)?;
        Ok(window)
    }

    /// Reallocate to `capacity` cleared slots and forget all history.
    ///
    /// A zero capacity is rejected and leaves the window untouched.
    pub fn configure(&mut self, capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(ThrottleError::Config(
                "throttle capacity must be greater than zero".to_string(),
            ));
        }

        self.history = vec![0; capacity];
        self.cursor = None;
        self.filled = 0;
        Ok(())
    }

    /// Change the window length. Existing timestamps are kept and compared
    /// against the new period from the next check on.
    pub fn set_period(&mut self, period_ms: u64) {
        self.period_ms = period_ms;
    }

    /// Index that the next [`record`](Self::record) will write.
    fn next_index(&self) -> usize {
        match self.cursor {
            Some(idx) if idx + 1 < self.history.len() => idx + 1,
            _ => 0,
        }
    }

    /// Look at the slot that will be overwritten next.
    pub fn oldest_timestamp(&self, now: i64) -> OldestSlot {
        let idx = self.next_index();
        let timestamp = self.history[idx];

        // Slots are written in index order, so the first `filled` are live.
        let vacant = idx >= self.filled;
        let age_ms = if vacant {
            NEVER_WRITTEN_AGE_MS
        } else {
            now.abs_diff(timestamp)
        };

        OldestSlot {
            timestamp,
            age_ms,
            vacant,
        }
    }

    /// Advance the cursor and store `now` in that slot.
    pub fn record(&mut self, now: i64) {
        let idx = self.next_index();
        self.history[idx] = now;
        self.cursor = Some(idx);
        if self.filled < self.history.len() {
            self.filled += 1;
        }
    }

    /// Number of events tracked per period.
    pub fn capacity(&self) -> usize {
        self.history.len()
    }

    /// Current window length in milliseconds.
    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Index of the most recently written slot.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Timestamp of the most recently recorded event.
    pub fn newest(&self) -> Option<i64> {
        self.cursor.map(|idx| self.history[idx])
    }

    /// Number of slots holding a recorded event.
    pub fn len(&self) -> usize {
        self.filled
    }

    /// True if nothing has been recorded since the last `configure`.
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Recorded timestamps, oldest first.
    pub fn snapshot(&self) -> Vec<i64> {
        let start = if self.filled < self.history.len() {
            0
        } else {
            self.next_index()
        };

        (0..self.filled)
            .map(|offset| self.history[(start + offset) % self.history.len()])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(RateWindow::new(0), Err(ThrottleError::Config(_))));
    }

    #[test]
    fn test_failed_configure_keeps_previous_state() {
        let mut window = RateWindow::new(2).unwrap();
        window.record(5);

        assert!(window.configure(0).is_err());
        assert_eq!(window.capacity(), 2);
        assert_eq!(window.cursor(), Some(0));
        assert_eq!(window.snapshot(), vec![5]);
    }

    #[test]
    fn test_cold_window_reports_vacant_slot() {
        let window = RateWindow::new(3).unwrap();
        let oldest = window.oldest_timestamp(0);

        assert_eq!(oldest.timestamp, 0);
        assert!(oldest.is_vacant());
        assert_eq!(window.cursor(), None);
        assert!(window.is_empty());
    }

    #[test]
    fn test_event_at_time_zero_is_not_vacant() {
        let mut window = RateWindow::new(1).unwrap();
        window.record(0);

        let oldest = window.oldest_timestamp(400);
        assert_eq!(oldest.timestamp, 0);
        assert_eq!(oldest.age_ms, 400);
        assert!(!oldest.is_vacant());
    }

    #[test]
    fn test_written_slot_at_extreme_age_is_not_vacant() {
        let mut window = RateWindow::new(1).unwrap();
        window.record(i64::MIN);

        let oldest = window.oldest_timestamp(i64::MAX);
        assert_eq!(oldest.age_ms, u64::MAX);
        assert!(!oldest.is_vacant());
    }

    #[test]
    fn test_record_wraps_cursor() {
        let mut window = RateWindow::new(3).unwrap();
        for ts in [100, 200, 300] {
            window.record(ts);
        }
        assert_eq!(window.cursor(), Some(2));
        assert_eq!(window.oldest_timestamp(350).timestamp, 100);

        window.record(400);
        assert_eq!(window.cursor(), Some(0));
        assert_eq!(window.oldest_timestamp(450).timestamp, 200);
        assert_eq!(window.snapshot(), vec![200, 300, 400]);
    }

    #[test]
    fn test_age_uses_absolute_difference() {
        let mut window = RateWindow::new(1).unwrap();
        window.record(1_000);

        assert_eq!(window.oldest_timestamp(1_300).age_ms, 300);
        assert_eq!(window.oldest_timestamp(700).age_ms, 300);
    }

    #[test]
    fn test_set_period_keeps_history() {
        let mut window = RateWindow::new(2).unwrap();
        window.record(10);
        window.set_period(250);

        assert_eq!(window.period_ms(), 250);
        assert_eq!(window.snapshot(), vec![10]);
    }

    #[test]
    fn test_reconfigure_clears_history() {
        let mut window = RateWindow::new(2).unwrap();
        window.record(10);
        window.record(20);

        window.configure(4).unwrap();
        assert_eq!(window.capacity(), 4);
        assert!(window.is_empty());
        assert_eq!(window.cursor(), None);
        assert!(window.oldest_timestamp(30).is_vacant());
    }
}
