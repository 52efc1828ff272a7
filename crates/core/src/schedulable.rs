use std::fmt;

use chrono::{DateTime, Utc};

use crate::task::Task;

/// Capability set the scheduler needs from a queue.
///
/// The scheduler only talks to queues through this trait, so alternative
/// queue implementations can be plugged in without touching dispatch.
/// Implementations are shared across threads behind `Arc`, hence the
/// `&self` receivers.
pub trait Schedulable: Send + Sync + fmt::Debug {
    /// Label used in log events.
    fn name(&self) -> &str;

    /// Fixed weight. Lower weights are serviced first; the weight also
    /// scales how far one dispatch advances virtual time.
    fn weight(&self) -> u32;

    /// Append a task at the tail.
    fn add_task(&self, task: Task);

    /// Snapshot of pending tasks in insertion order.
    fn tasks(&self) -> Vec<Task>;

    /// Remove and return the head task, or `None` when empty.
    fn pop(&self) -> Option<Task>;

    /// Virtual time at which this queue last finished (or caught up).
    fn last_finish(&self) -> DateTime<Utc>;

    fn set_last_finish(&self, at: DateTime<Utc>);

    /// Raise the watermark to `at` if it is behind; returns whether it moved.
    ///
    /// The default reads then writes in two steps, so a concurrent
    /// [`set_last_finish`](Self::set_last_finish) between them can be
    /// overwritten with the older value. Implementations that can compare
    /// and write atomically should override it.
    fn advance_last_finish(&self, at: DateTime<Utc>) -> bool {
        if self.last_finish() < at {
            self.set_last_finish(at);
            true
        } else {
            false
        }
    }
}
