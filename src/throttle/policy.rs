//! Reject-or-delay policy applied when the window is full.

use super::message::Message;
use crate::error::ThrottleExceeded;

/// Added to a computed delay so the oldest event is safely out of the window on wake-up.
pub const DEFAULT_EXTRA_MS: u64 = 10;
/// Computed delays above this are treated as anomalous.
pub const DEFAULT_MAX_DELAY_MS: u64 = 1000;
/// Delay used in place of an anomalous computed delay.
pub const DEFAULT_DELAY_MS: u64 = 1000;

/// How long an exempt message will be held back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayPlan {
    /// `(period - age) + extra`, before any clamping
    pub computed_ms: i64,
    /// The delay that will actually be slept
    pub delay_ms: u64,
    /// True if `computed_ms` was out of range and replaced by the default
    pub overridden: bool,
}

/// Decides what happens to a message that arrives while the window is full.
///
/// Possible-duplicate replays and cancel requests are never refused; they are
/// held back long enough for the oldest event to leave the window. Anything
/// else is refused with a fixed error text.
#[derive(Debug, Clone)]
pub struct ThrottlePolicy {
    id: Option<String>,
    capacity: usize,
    period_ms: u64,
    extra_ms: u64,
    max_delay_ms: u64,
    default_delay_ms: u64,
    error_text: String,
}

impl ThrottlePolicy {
    /// Create a policy with the default delay limits.
    pub fn new(capacity: usize, period_ms: u64) -> Self {
        let mut policy = Self {
            id: None,
            capacity,
            period_ms,
            extra_ms: DEFAULT_EXTRA_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            default_delay_ms: DEFAULT_DELAY_MS,
            error_text: String::new(),
        };
        policy.refresh_error_text();
        policy
    }

    /// Name used in log lines, typically the owning session.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Override the delay sizing constants.
    pub fn with_delay_limits(mut self, extra_ms: u64, max_delay_ms: u64, default_delay_ms: u64) -> Self {
        self.extra_ms = extra_ms;
        self.max_delay_ms = max_delay_ms;
        self.default_delay_ms = default_delay_ms;
        self
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.refresh_error_text();
    }

    pub fn set_period_ms(&mut self, period_ms: u64) {
        self.period_ms = period_ms;
        self.refresh_error_text();
    }

    fn refresh_error_text(&mut self) {
        self.error_text = format!(
            "Exceeded throttle rate of {} messages per {} ms",
            self.capacity, self.period_ms
        );
    }

    /// True if the message must be delayed rather than refused.
    pub fn is_exempt(&self, message: &dyn Message) -> bool {
        message.is_poss_dup() || message.is_cancel_request()
    }

    /// Size the delay for a window whose oldest event is `age_ms` old.
    pub fn plan_delay(&self, age_ms: u64) -> DelayPlan {
        let computed = i128::from(self.period_ms) - i128::from(age_ms) + i128::from(self.extra_ms);
        let computed_ms = computed.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64;

        if computed < 0 || computed > i128::from(self.max_delay_ms) {
            DelayPlan {
                computed_ms,
                delay_ms: self.default_delay_ms,
                overridden: true,
            }
        } else {
            DelayPlan {
                computed_ms,
                delay_ms: computed as u64,
                overridden: false,
            }
        }
    }

    /// The line logged before sleeping.
    pub fn delay_line(&self, plan: &DelayPlan) -> String {
        let id = self.id.as_deref().map(|id| format!("{} ", id)).unwrap_or_default();
        if plan.overridden {
            format!(
                "Throttle back, override calc'd delay {}{} to {}",
                id, plan.computed_ms, plan.delay_ms
            )
        } else {
            format!("Throttle back {}{}", id, plan.delay_ms)
        }
    }

    /// The line logged when the rate is (re)configured.
    pub fn rate_line(&self) -> String {
        format!(
            "Throttler for {}, rate={} per {} ms",
            self.name(),
            self.capacity,
            self.period_ms
        )
    }

    /// The line logged when the period is (re)configured.
    pub fn period_line(&self) -> String {
        format!("Throttler for {} set interval to {} ms", self.name(), self.period_ms)
    }

    /// The rejection for a non-exempt message.
    pub fn exceeded(&self) -> ThrottleExceeded {
        ThrottleExceeded::new(self.error_text.clone())
    }

    pub fn error_text(&self) -> &str {
        &self.error_text
    }

    pub fn name(&self) -> &str {
        self.id.as_deref().unwrap_or("unnamed")
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn extra_ms(&self) -> u64 {
        self.extra_ms
    }

    pub fn max_delay_ms(&self) -> u64 {
        self.max_delay_ms
    }

    pub fn default_delay_ms(&self) -> u64 {
        self.default_delay_ms
    }
}
