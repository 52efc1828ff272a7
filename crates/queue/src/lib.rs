//! Weighted FIFO queue of [`Task`](wfq_core::Task)s.
//!
//! A [`Queue`] keeps its task list and its last-finish watermark in two
//! separate [`SerializedCell`](wfq_cell::SerializedCell)s, so it can be shared
//! between producers and the scheduler behind an `Arc` without extra locking.

pub mod queue;

pub use queue::Queue;
