//! Weighted queue scheduler driven by a virtual clock.
//!
//! Split into focused submodules:
//! - `core`: scheduler struct, queue admission/removal, clock accessors
//! - `dispatch`: the two dispatch variants and clock advancement
//!
//! Dispatch scans queues in ascending weight order and serves the first one
//! with work. This approximates weighted fair queueing: it does not compute
//! per-task virtual finish tags, so a busy low-weight queue starves heavier
//! queues. Weight only scales how far [`WfqScheduler::schedule`] advances the
//! clock.

mod core;
mod dispatch;

pub use self::core::{QueueRef, WfqScheduler};
pub use self::dispatch::Dispatch;
