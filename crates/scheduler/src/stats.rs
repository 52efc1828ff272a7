use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use wfq_core::Schedulable;

use crate::Dispatch;

/// Dispatch counters collected by a driver loop.
///
/// The scheduler itself keeps no statistics; a driver records each
/// [`Dispatch`] it receives.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchStats {
    /// Tasks dispatched per queue name.
    pub dispatched: BTreeMap<String, u64>,
    /// Average estimated execution time per queue name.
    pub avg_exec_time: BTreeMap<String, Duration>,
    /// Total dispatched across all queues.
    pub total_dispatched: u64,
    /// Dispatch calls that found every queue empty.
    pub empty_polls: u64,
    /// Virtual time before the first recorded dispatch was charged.
    pub first_virtual_time: Option<DateTime<Utc>>,
    /// Virtual time after the latest recorded dispatch.
    pub last_virtual_time: Option<DateTime<Utc>>,
    /// Sum of every recorded dispatch's clock advance.
    pub virtual_time_advanced: Duration,
}

impl DispatchStats {
    /// Record one dispatched task.
    pub fn record_dispatch(&mut self, dispatch: &Dispatch) {
        let queue = dispatch.queue.name();
        let count = self.dispatched.entry(queue.to_string()).or_default();
        *count += 1;
        let count = *count;
        self.total_dispatched += 1;

        let mean = self.avg_exec_time.entry(queue.to_string()).or_default();
        *mean = running_mean(*mean, dispatch.task.exec_time(), count);

        self.first_virtual_time.get_or_insert(dispatch.previous_virtual_time);
        self.last_virtual_time = Some(dispatch.virtual_time);
        self.virtual_time_advanced = self.virtual_time_advanced.saturating_add(dispatch.advance());
    }

    pub fn record_empty_poll(&mut self) {
        self.empty_polls += 1;
    }

    /// Fraction of all dispatches served by `queue` (0.0 when nothing ran).
    pub fn share(&self, queue: &str) -> f64 {
        if self.total_dispatched == 0 {
            return 0.0;
        }
        self.dispatched.get(queue).copied().unwrap_or(0) as f64 / self.total_dispatched as f64
    }
}

/// Fold the `n`-th sample into a mean of the previous `n - 1` samples.
fn running_mean(mean: Duration, sample: Duration, n: u64) -> Duration {
    if n <= 1 {
        return sample;
    }
    let mean_ns = mean.as_nanos() as i128;
    let delta = sample.as_nanos() as i128 - mean_ns;
    let next = mean_ns + delta / n as i128;
    Duration::from_nanos(next.clamp(0, u64::MAX as i128) as u64)
}
