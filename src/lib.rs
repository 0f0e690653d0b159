//! Dispatch Throttle - sliding-window rate limiting for an outbound dispatch path
//!
//! A fixed ring of the last N admission timestamps decides in constant time
//! whether a message fits in the configured rate. When it does not, cancel
//! requests and possible-duplicate replays are held back until the window
//! has room, and everything else is refused with a typed error.

pub mod clock;
pub mod config;
pub mod error;
pub mod scenario;
pub mod throttle;
