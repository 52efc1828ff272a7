use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task identifier. UUID v7, so ids sort roughly by creation time.
pub type TaskId = Uuid;

/// One unit of schedulable work.
///
/// Immutable once constructed. A task is owned by its queue until popped and
/// by the caller afterwards. No field is validated: a zero weight or a zero
/// execution estimate is accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    /// Reserved; dispatch does not read it.
    weight: u64,
    exec_time: Duration,
    timestamp: DateTime<Utc>,
}

impl Task {
    /// Create a task with a fresh time-ordered id, stamped now.
    pub fn new(weight: u64, exec_time: Duration) -> Self {
        Self {
            id: Uuid::now_v7(),
            weight,
            exec_time,
            timestamp: Utc::now(),
        }
    }

    /// Create a task from caller-supplied values.
    pub fn with_id(id: TaskId, weight: u64, exec_time: Duration, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            weight,
            exec_time,
            timestamp,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn weight(&self) -> u64 {
        self.weight
    }

    /// Estimated execution duration.
    pub fn exec_time(&self) -> Duration {
        self.exec_time
    }

    /// Creation time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
