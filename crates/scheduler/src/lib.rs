pub mod scheduler;
pub mod stats;

pub use scheduler::{Dispatch, QueueRef, WfqScheduler};
pub use stats::DispatchStats;
pub use wfq_core::{QueueConfig, Schedulable, SchedulerConfig, Task, TaskId, WfqError};
pub use wfq_queue::Queue;
