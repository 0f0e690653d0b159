//! Sliding-window throttling of a single outbound dispatch path.

pub mod backend;
pub mod message;
pub mod policy;
pub mod sink;
pub mod throttler;
pub mod window;

pub use backend::{Admission, Throttler};
pub use message::{Message, MessageKind, OutboundMessage};
pub use policy::{DelayPlan, ThrottlePolicy};
pub use sink::{LogSink, MemorySink, TracingSink};
pub use throttler::DispatchThrottler;
pub use window::{OldestSlot, RateWindow};
