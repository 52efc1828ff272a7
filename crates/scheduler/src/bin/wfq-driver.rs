//! wfq-driver — demo runtime driving a weighted queue scheduler.
//!
//! Producer threads enqueue synthetic tasks into the configured queues while
//! the main loop repeatedly calls `dispatch()` and "executes" each task on a
//! rayon pool by sleeping for its (scaled) execution estimate. Prints a JSON
//! dispatch summary on exit.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, info, warn};

use wfq_core::config::load_dotenv;
use wfq_scheduler::{DispatchStats, Queue, SchedulerConfig, Task, WfqScheduler};

// ── CLI ─────────────────────────────────────────────────────────────

/// Drive a weighted queue scheduler with synthetic load.
#[derive(Parser, Debug)]
#[command(name = "wfq-driver", version, about)]
struct Cli {
    /// Path to the scheduler TOML config. Built-in defaults when omitted.
    #[arg(long, env = "WFQ_CONFIG")]
    config: Option<String>,

    /// Number of producer threads.
    #[arg(long, env = "WFQ_PRODUCERS", default_value_t = 4)]
    producers: usize,

    /// Tasks enqueued by each producer.
    #[arg(long, env = "WFQ_TASKS_PER_PRODUCER", default_value_t = 250)]
    tasks_per_producer: usize,

    /// Executor threads. 0 = available parallelism.
    #[arg(long, env = "WFQ_WORKERS", default_value_t = 0)]
    workers: usize,

    /// Upper bound for synthetic execution estimates, in milliseconds.
    #[arg(long, env = "WFQ_MAX_EXEC_MS", default_value_t = 50)]
    max_exec_ms: u64,

    /// Real sleep = estimate / time_scale.
    #[arg(long, env = "WFQ_TIME_SCALE", default_value_t = 100)]
    time_scale: u32,
}

fn resolved_workers(requested: usize) -> usize {
    if requested == 0 {
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    } else {
        requested
    }
}

/// Deterministic spread of execution estimates in `1..=max_ms`.
fn synthetic_exec_time(producer: usize, seq: usize, max_ms: u64) -> Duration {
    let mix = (producer as u64 + 1)
        .wrapping_mul(7919)
        .wrapping_add((seq as u64).wrapping_mul(104_729));
    Duration::from_millis(mix % max_ms.max(1) + 1)
}

fn spawn_producers(
    cli: &Cli,
    queues: &BTreeMap<String, Arc<Queue>>,
    finished: &Arc<AtomicUsize>,
) -> Vec<thread::JoinHandle<()>> {
    let targets: Vec<Arc<Queue>> = queues.values().cloned().collect();

    (0..cli.producers)
        .map(|producer| {
            let targets = targets.clone();
            let finished = Arc::clone(finished);
            let count = cli.tasks_per_producer;
            let max_ms = cli.max_exec_ms;

            thread::spawn(move || {
                for seq in 0..count {
                    let queue = &targets[(producer + seq) % targets.len()];
                    let task = Task::new(1, synthetic_exec_time(producer, seq, max_ms));
                    queue.add_task(task);
                }
                debug!(producer, count, "producer finished");
                finished.fetch_add(1, Ordering::Release);
            })
        })
        .collect()
}

// ── main ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();

    let config = SchedulerConfig::load_or_default(cli.config.as_deref().map(Path::new))?;
    config.log_summary();

    let (scheduler, queues) = WfqScheduler::from_config(&config)?;
    let num_workers = resolved_workers(cli.workers);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_workers)
        .thread_name(|i| format!("wfq-exec-{i}"))
        .build()?;

    info!(
        "Driver starting: {} producers x {} tasks, {} workers",
        cli.producers, cli.tasks_per_producer, num_workers
    );

    let finished = Arc::new(AtomicUsize::new(0));
    let producers = spawn_producers(&cli, &queues, &finished);
    let time_scale = cli.time_scale.max(1);
    let mut stats = DispatchStats::default();

    pool.scope(|scope| loop {
        match scheduler.dispatch() {
            Some(dispatch) => {
                stats.record_dispatch(&dispatch);
                let task = dispatch.task;
                scope.spawn(move |_| {
                    thread::sleep(task.exec_time() / time_scale);
                    debug!(task_id = %task.id(), "task executed");
                });
            }
            None => {
                stats.record_empty_poll();
                let producers_done = finished.load(Ordering::Acquire) == cli.producers;
                if producers_done && queues.values().all(|q| q.is_empty()) {
                    break;
                }
                thread::sleep(Duration::from_millis(1));
            }
        }
    });

    for handle in producers {
        if handle.join().is_err() {
            warn!("producer thread panicked");
        }
    }

    info!(
        "Driver finished: {} tasks dispatched, virtual time {} (advanced {:?})",
        stats.total_dispatched,
        scheduler.virtual_time(),
        stats.virtual_time_advanced
    );
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
