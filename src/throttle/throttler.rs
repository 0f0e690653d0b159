//! Sliding-window throttler for a single dispatch path.

use tracing::{debug, trace, warn};

use super::backend::{Admission, Throttler};
use super::message::Message;
use super::policy::ThrottlePolicy;
use super::sink::{LogSink, TracingSink};
use super::window::RateWindow;
use crate::clock::{Clock, Sleeper, SystemClock, ThreadSleeper};
use crate::config::ThrottleConfig;
use crate::error::{Result, ThrottleError, ThrottleExceeded};

/// Default number of messages per period.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Throttles outbound messages with a [`RateWindow`] and a [`ThrottlePolicy`].
///
/// Not thread-safe: each dispatcher owns its own instance and is the only
/// caller of [`check_throttle`](Throttler::check_throttle). Reconfigure only
/// during setup, before the dispatch path starts.
pub struct DispatchThrottler<C: Clock = SystemClock, S: Sleeper = ThreadSleeper> {
    window: RateWindow,
    policy: ThrottlePolicy,
    clock: C,
    sleeper: S,
    sink: Box<dyn LogSink>,
}

impl DispatchThrottler {
    /// A throttler on the wall clock that sleeps the current thread.
    pub fn system(capacity: usize) -> Result<Self> {
        Self::new(capacity, SystemClock, ThreadSleeper)
    }
}

impl<C: Clock, S: Sleeper> DispatchThrottler<C, S> {
    /// Create a throttler admitting `capacity` messages per default period.
    pub fn new(capacity: usize, clock: C, sleeper: S) -> Result<Self> {
        let window = RateWindow::new(capacity)?;
        let policy = ThrottlePolicy::new(capacity, window.period_ms());

        Ok(Self {
            window,
            policy,
            clock,
            sleeper,
            sink: Box::new(TracingSink),
        })
    }

    /// Build a throttler from configuration, logging the applied rate and period.
    pub fn from_config(
        config: &ThrottleConfig,
        clock: C,
        sleeper: S,
        sink: Box<dyn LogSink>,
    ) -> Result<Self> {
        config.validate()?;

        let mut throttler = Self::new(config.max_messages_per_period, clock, sleeper)?
            .with_sink(sink)
            .with_delay_limits(config.extra_ms, config.max_delay_ms, config.default_delay_ms);
        if let Some(id) = &config.id {
            throttler = throttler.with_id(id.clone());
        }

        // Apply the period before anything is logged so the rate line reports it.
        throttler.window.set_period(config.period_ms);
        throttler.policy.set_period_ms(config.period_ms);

        throttler.sink.line(&throttler.policy.rate_line());
        throttler.sink.line(&throttler.policy.period_line());
        Ok(throttler)
    }

    /// Send diagnostic lines to `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: Box<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Name this throttler in its log lines.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.policy = self.policy.with_id(id);
        self
    }

    /// Override the delay sizing constants of the policy.
    pub fn with_delay_limits(mut self, extra_ms: u64, max_delay_ms: u64, default_delay_ms: u64) -> Self {
        self.policy = self.policy.with_delay_limits(extra_ms, max_delay_ms, default_delay_ms);
        self
    }

    pub fn window(&self) -> &RateWindow {
        &self.window
    }

    pub fn policy(&self) -> &ThrottlePolicy {
        &self.policy
    }

    fn delay(&mut self, age_ms: u64) -> Admission {
        let plan = self.policy.plan_delay(age_ms);
        self.sink.line(&self.policy.delay_line(&plan));

        self.sleeper.sleep_ms(plan.delay_ms);

        let now = self.clock.now_ms();
        self.window.record(now);

        Admission::Delayed {
            delay_ms: plan.delay_ms,
            overridden: plan.overridden,
        }
    }
}

impl<C: Clock, S: Sleeper> Throttler for DispatchThrottler<C, S> {
    fn configure(&mut self, max_messages_per_period: usize) -> Result<()> {
        self.window.configure(max_messages_per_period)?;
        self.policy.set_capacity(max_messages_per_period);
        self.sink.line(&self.policy.rate_line());
        Ok(())
    }

    fn set_period_ms(&mut self, period_ms: u64) {
        self.window.set_period(period_ms);
        self.policy.set_period_ms(period_ms);
        self.sink.line(&self.policy.period_line());
    }

    fn check_throttle(&mut self, message: &dyn Message) -> std::result::Result<Admission, ThrottleExceeded> {
        let now = self.clock.now_ms();

        if let Some(newest) = self.window.newest() {
            if now < newest {
                warn!(
                    throttler = %self.policy.name(),
                    now,
                    newest,
                    "Clock moved backwards since last admission"
                );
            }
        }

        let oldest = self.window.oldest_timestamp(now);

        if oldest.age_ms >= self.window.period_ms() {
            trace!(throttler = %self.policy.name(), now, "Admitted");
            self.window.record(now);
            return Ok(Admission::Immediate);
        }

        if self.policy.is_exempt(message) {
            debug!(
                throttler = %self.policy.name(),
                kind = %message.kind(),
                poss_dup = message.is_poss_dup(),
                age_ms = oldest.age_ms,
                "Window full, delaying exempt message"
            );
            return Ok(self.delay(oldest.age_ms));
        }

        debug!(
            throttler = %self.policy.name(),
            kind = %message.kind(),
            age_ms = oldest.age_ms,
            "Rate exceeded, rejecting message"
        );
        Err(self.policy.exceeded())
    }

    fn throttled(&self, _now_ms: i64) -> Result<bool> {
        Err(ThrottleError::Unsupported(
            "throttled() is not supported by this throttler, use check_throttle()",
        ))
    }
}
