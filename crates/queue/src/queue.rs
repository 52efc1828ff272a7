use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use tracing::trace;
use wfq_cell::SerializedCell;
use wfq_core::{Schedulable, Task};

/// A weighted FIFO of tasks.
///
/// Insertion order is dispatch order: the sequence only ever grows at the
/// tail and shrinks at the head. There is no capacity bound.
pub struct Queue {
    name: String,
    weight: u32,
    tasks: SerializedCell<VecDeque<Task>>,
    last_finish: SerializedCell<DateTime<Utc>>,
}

impl Queue {
    /// Create a queue named `queue-{weight}`.
    ///
    /// Each queue is backed by two [`SerializedCell`]s and therefore owns
    /// two OS threads until it is dropped.
    pub fn new(weight: u32) -> Self {
        Self::named(format!("queue-{weight}"), weight)
    }

    /// Create a queue with an explicit name. The watermark starts at the
    /// current wall-clock time.
    ///
    /// # Panics
    ///
    /// Panics if a cell worker thread cannot be spawned. See
    /// [`try_named`](Self::try_named).
    pub fn named(name: impl Into<String>, weight: u32) -> Self {
        Self::try_named(name, weight).expect("Failed to spawn queue cell workers")
    }

    /// Like [`named`](Self::named), but returns the spawn error instead of
    /// panicking when the process is out of threads.
    pub fn try_named(name: impl Into<String>, weight: u32) -> std::io::Result<Self> {
        let name = name.into();
        Ok(Self {
            tasks: SerializedCell::try_named(format!("{name}.tasks"), VecDeque::new())?,
            last_finish: SerializedCell::try_named(format!("{name}.last_finish"), Utc::now())?,
            name,
            weight,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Append `task` at the tail.
    pub fn add_task(&self, task: Task) {
        trace!(queue = %self.name, task_id = %task.id(), "task enqueued");
        self.tasks.modify(move |tasks| tasks.push_back(task));
    }

    /// Remove and return the head task. An empty queue yields `None`.
    pub fn pop(&self) -> Option<Task> {
        self.tasks.modify(|tasks| tasks.pop_front())
    }

    /// Snapshot of pending tasks in insertion order.
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.modify(|tasks| tasks.iter().cloned().collect())
    }

    /// Number of pending tasks at the time of the call.
    pub fn len(&self) -> usize {
        self.tasks.modify(|tasks| tasks.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last_finish(&self) -> DateTime<Utc> {
        self.last_finish.get()
    }

    pub fn set_last_finish(&self, at: DateTime<Utc>) {
        self.last_finish.set(at);
    }

    /// Move the watermark forward to `at`. Returns `false` and leaves the
    /// watermark alone when it is already at or past `at`.
    ///
    /// The comparison and the write happen in one cell request.
    pub fn advance_last_finish(&self, at: DateTime<Utc>) -> bool {
        self.last_finish.modify(move |current| {
            if *current < at {
                *current = at;
                true
            } else {
                false
            }
        })
    }
}

impl Schedulable for Queue {
    fn name(&self) -> &str {
        Queue::name(self)
    }

    fn weight(&self) -> u32 {
        Queue::weight(self)
    }

    fn add_task(&self, task: Task) {
        Queue::add_task(self, task)
    }

    fn tasks(&self) -> Vec<Task> {
        Queue::tasks(self)
    }

    fn pop(&self) -> Option<Task> {
        Queue::pop(self)
    }

    fn last_finish(&self) -> DateTime<Utc> {
        Queue::last_finish(self)
    }

    fn set_last_finish(&self, at: DateTime<Utc>) {
        Queue::set_last_finish(self, at)
    }

    fn advance_last_finish(&self, at: DateTime<Utc>) -> bool {
        Queue::advance_last_finish(self, at)
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}
