use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use wfq_cell::SerializedCell;
use wfq_core::{Schedulable, SchedulerConfig, WfqError};
use wfq_queue::Queue;

/// Shared handle to a queue as seen by the scheduler.
pub type QueueRef = Arc<dyn Schedulable>;

/// Weighted queue scheduler.
///
/// Holds queues sorted ascending by weight (equal weights keep insertion
/// order) and a virtual clock. Both live in [`SerializedCell`]s, so the
/// scheduler is `Send + Sync` and can be shared behind an `Arc`. Admission
/// and removal are serialized against each other; dispatch scans a snapshot
/// of the collection, so a queue removed while a scan is in flight may still
/// be served by that scan.
pub struct WfqScheduler {
    pub(super) queues: SerializedCell<Vec<QueueRef>>,
    pub(super) virtual_time: SerializedCell<DateTime<Utc>>,
}

impl WfqScheduler {
    /// Create an empty scheduler whose virtual clock starts at the current
    /// wall-clock time.
    pub fn new() -> Self {
        Self {
            queues: SerializedCell::named("scheduler.queues", Vec::new()),
            virtual_time: SerializedCell::named("scheduler.vtime", Utc::now()),
        }
    }

    /// Build a scheduler with one [`Queue`] per configured entry.
    ///
    /// Returns the scheduler together with the created queues keyed by name,
    /// so producers can enqueue directly.
    pub fn from_config(
        config: &SchedulerConfig,
    ) -> Result<(Self, BTreeMap<String, Arc<Queue>>), WfqError> {
        config.validate()?;

        let scheduler = Self::new();
        let mut by_name = BTreeMap::new();
        for qc in &config.queues {
            let queue = Arc::new(Queue::named(qc.name.clone(), qc.weight));
            scheduler.add_queue(queue.clone());
            by_name.insert(qc.name.clone(), queue);
        }

        info!("Scheduler built with {} queues", by_name.len());
        Ok((scheduler, by_name))
    }

    /// Insert `queue`, keeping ascending weight order. A queue whose weight
    /// ties existing entries goes after them.
    pub fn add_queue(&self, queue: QueueRef) {
        let name = queue.name().to_string();
        let weight = queue.weight();

        let position = self.queues.modify(move |queues| {
            let index = queues.partition_point(|q| q.weight() <= weight);
            queues.insert(index, queue);
            index
        });

        debug!(queue = %name, weight, position, "queue added");
    }

    /// Remove `queue` if present. Returns whether anything was removed.
    ///
    /// Binary-searches to the first entry with the queue's weight, then
    /// matches by identity (same allocation) among the equal-weight entries.
    /// A different queue that merely has the same weight is never removed.
    pub fn remove_queue<Q>(&self, queue: &Arc<Q>) -> bool
    where
        Q: Schedulable + ?Sized + 'static,
    {
        let target = Arc::clone(queue);
        let name = queue.name().to_string();

        let removed = self.queues.modify(move |queues| {
            let weight = target.weight();
            let start = queues.partition_point(|q| q.weight() < weight);
            let offset = queues[start..]
                .iter()
                .take_while(|q| q.weight() == weight)
                .position(|q| std::ptr::addr_eq(Arc::as_ptr(q), Arc::as_ptr(&target)));

            match offset {
                Some(offset) => {
                    queues.remove(start + offset);
                    true
                }
                None => false,
            }
        });

        if removed {
            debug!(queue = %name, "queue removed");
        } else {
            debug!(queue = %name, "queue not registered, nothing removed");
        }
        removed
    }

    /// Queue at ordinal position `index`, or `None` when out of range.
    pub fn queue_at(&self, index: usize) -> Option<QueueRef> {
        self.queues.modify(move |queues| queues.get(index).cloned())
    }

    /// All queues in dispatch order.
    pub fn queues(&self) -> Vec<QueueRef> {
        self.queues.get()
    }

    pub fn queue_count(&self) -> usize {
        self.queues.modify(|queues| queues.len())
    }

    /// Set the virtual clock. Not checked for monotonicity.
    pub fn update_virtual_time(&self, at: DateTime<Utc>) {
        self.virtual_time.set(at);
    }

    pub fn virtual_time(&self) -> DateTime<Utc> {
        self.virtual_time.get()
    }
}

impl Default for WfqScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WfqScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WfqScheduler")
            .field("queues", &self.queues())
            .field("virtual_time", &self.virtual_time())
            .finish()
    }
}
