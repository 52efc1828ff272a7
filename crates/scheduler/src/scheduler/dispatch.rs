use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};
use wfq_core::Task;

use super::core::{QueueRef, WfqScheduler};

/// Outcome of one [`WfqScheduler::dispatch`] call.
#[derive(Debug, Clone)]
pub struct Dispatch {
    /// The popped task; the caller now owns it.
    pub task: Task,
    /// Queue the task came from.
    pub queue: QueueRef,
    /// Virtual time just before this task was charged.
    pub previous_virtual_time: DateTime<Utc>,
    /// Virtual time after advancement. Also the queue's new watermark.
    pub virtual_time: DateTime<Utc>,
}

impl Dispatch {
    /// How far this dispatch moved the virtual clock.
    pub fn advance(&self) -> Duration {
        (self.virtual_time - self.previous_virtual_time)
            .to_std()
            .unwrap_or_default()
    }
}

impl WfqScheduler {
    /// Pop the next task without advancing the virtual clock.
    ///
    /// Scans queues in ascending weight order. Before trying a queue, a
    /// watermark that lags behind the virtual clock is caught up to it, so a
    /// queue that sat idle does not carry stale credit. The first non-empty
    /// queue wins.
    ///
    /// The catch-up goes through [`Schedulable::advance_last_finish`], so it
    /// never lowers a watermark that a concurrent `schedule()` has already
    /// pushed past the clock value read here.
    pub fn get_next_task(&self) -> Option<Task> {
        let virtual_time = self.virtual_time.get();

        for queue in self.queues.get() {
            queue.advance_last_finish(virtual_time);
            if let Some(task) = queue.pop() {
                debug!(queue = %queue.name(), task_id = %task.id(), "next task selected");
                return Some(task);
            }
        }
        None
    }

    /// Pop the head of the lowest-weight non-empty queue and charge it to
    /// the virtual clock.
    ///
    /// The clock advances by `exec_time × queue weight` and the serving
    /// queue's watermark is raised to the new clock value. `None` when no queue
    /// has work.
    pub fn schedule(&self) -> Option<Task> {
        self.dispatch().map(|d| d.task)
    }

    /// Same as [`schedule`](Self::schedule), but also reports which queue
    /// was served and the clock values around the charge.
    pub fn dispatch(&self) -> Option<Dispatch> {
        for queue in self.queues.get() {
            let Some(task) = queue.pop() else {
                continue;
            };

            let exec_time = task.exec_time();
            let weight = queue.weight();
            let (previous_virtual_time, virtual_time) = self.virtual_time.modify(move |now| {
                let before = *now;
                *now = advance(before, exec_time, weight);
                (before, *now)
            });
            queue.advance_last_finish(virtual_time);

            debug!(
                queue = %queue.name(),
                task_id = %task.id(),
                weight,
                exec_time = ?exec_time,
                %virtual_time,
                "task dispatched"
            );
            return Some(Dispatch {
                task,
                queue,
                previous_virtual_time,
                virtual_time,
            });
        }
        None
    }
}

/// `from + exec_time × weight`, saturating at the latest representable time.
pub(crate) fn advance(from: DateTime<Utc>, exec_time: Duration, weight: u32) -> DateTime<Utc> {
    let advanced = exec_time
        .checked_mul(weight)
        .and_then(|charge| TimeDelta::from_std(charge).ok())
        .and_then(|charge| from.checked_add_signed(charge));

    match advanced {
        Some(at) => at,
        None => {
            warn!(
                exec_time = ?exec_time,
                weight,
                "virtual time overflow, clamping to maximum"
            );
            DateTime::<Utc>::MAX_UTC
        }
    }
}
