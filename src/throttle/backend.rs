//! Throttler trait for the dispatch path.

use super::message::Message;
use crate::error::{Result, ThrottleExceeded};

/// Outcome of a successful throttle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The window had room; the message passes straight through
    Immediate,
    /// The window was full and the message is exempt; it passes after a delay
    Delayed {
        /// Milliseconds the dispatch path was held
        delay_ms: u64,
        /// True if the computed delay was out of range and replaced by the default
        overridden: bool,
    },
}

impl Admission {
    pub fn is_delayed(&self) -> bool {
        matches!(self, Admission::Delayed { .. })
    }
}

/// Trait for throttlers owned by a single dispatch path.
///
/// Implementations are not shared between threads: every dispatcher owns its
/// own throttler and calls [`check_throttle`](Throttler::check_throttle) once
/// per outbound message before sending it.
pub trait Throttler {
    /// Set the maximum number of messages per period. Clears the history.
    fn configure(&mut self, max_messages_per_period: usize) -> Result<()>;

    /// Set the period length in milliseconds.
    fn set_period_ms(&mut self, period_ms: u64);

    /// Admit, delay then admit, or refuse `message`.
    fn check_throttle(&mut self, message: &dyn Message) -> std::result::Result<Admission, ThrottleExceeded>;

    /// Side-effect free "would a message be throttled at `now_ms`" query.
    fn throttled(&self, now_ms: i64) -> Result<bool>;
}
