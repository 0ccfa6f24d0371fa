//! Interaction helpers built on top of [`crate::browser::Page`]
//!
//! Waits, selector fallback, success detection and queue monitoring.

mod cascade;
mod detect;
mod queue;
mod wait;

pub use cascade::SelectorCascade;
pub use detect::{Outcome, SuccessDetector};
pub use queue::{QueueOutcome, QueueTraceMonitor};
pub use wait::{SmartWait, UrlPattern};
