pub mod config;
pub mod error;
pub mod schedulable;
pub mod task;

pub use config::{QueueConfig, SchedulerConfig};
pub use error::WfqError;
pub use schedulable::Schedulable;
pub use task::{Task, TaskId};
