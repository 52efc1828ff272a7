use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::{error, trace};

/// A unit of work executed by the cell worker against the owned value.
type Request<T> = Box<dyn FnOnce(&mut T) + Send>;

/// Panic payload carried back to the caller when a closure panics.
type PanicPayload = Box<dyn Any + Send>;

/// A value whose every access is serialized through one worker thread.
///
/// All operations are blocking round trips: the call returns once the worker
/// has processed the request and every request issued before it. There are
/// no timeouts and no cancellation.
///
/// # Panics
///
/// The blocking wait uses tokio's `blocking_recv`, so operations panic when
/// called from inside an async runtime thread. Call them from plain threads
/// or from `tokio::task::spawn_blocking`.
///
/// If a closure passed to [`update`](Self::update) or [`modify`](Self::modify)
/// panics, the worker survives and the panic is resumed on the calling
/// thread. Other callers of the cell are unaffected.
pub struct SerializedCell<T> {
    name: Arc<str>,
    tx: mpsc::UnboundedSender<Request<T>>,
}

impl<T: Send + 'static> SerializedCell<T> {
    /// Create a cell holding `value`, served by a freshly spawned worker.
    pub fn new(value: T) -> Self {
        Self::named("anon", value)
    }

    /// Create a cell whose worker thread is named `cell-{name}`.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn the worker thread. Use
    /// [`try_named`](Self::try_named) to handle that case.
    pub fn named(name: impl Into<String>, value: T) -> Self {
        Self::try_named(name, value).expect("Failed to spawn serialized cell worker")
    }

    /// Like [`named`](Self::named), but reports a failed thread spawn.
    ///
    /// Every cell owns one OS thread for its whole lifetime.
    pub fn try_named(name: impl Into<String>, value: T) -> std::io::Result<Self> {
        let name: Arc<str> = Arc::from(name.into());
        let (tx, rx) = mpsc::unbounded_channel();

        let worker_name = Arc::clone(&name);
        thread::Builder::new()
            .name(format!("cell-{name}"))
            .spawn(move || run_worker(worker_name, value, rx))?;

        Ok(Self { name, tx })
    }

    /// Replace the value.
    pub fn set(&self, value: T) {
        self.modify(move |current| *current = value);
    }

    /// Atomically replace the value with `f(current)`.
    ///
    /// `f` sees one consistent snapshot and nothing else on this cell runs
    /// while it executes, so it must be short and must not block. If `f`
    /// panics the value is left as it was.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        self.modify(move |current| {
            let next = f(&*current);
            *current = next;
        });
    }

    /// Run `f` against the value in place and return its result.
    ///
    /// Same exclusivity guarantees as [`update`](Self::update); useful when the
    /// caller needs something computed under the same serialization point,
    /// such as an element removed from a collection.
    pub fn modify<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel::<Result<R, PanicPayload>>();
        let name = Arc::clone(&self.name);

        let request: Request<T> = Box::new(move |value: &mut T| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(value)));
            if outcome.is_err() {
                error!(cell = %name, "closure panicked inside cell worker");
            }
            // Receiver is only gone if the caller itself was torn down.
            let _ = reply_tx.send(outcome);
        });

        if self.tx.send(request).is_err() {
            unreachable!("worker for cell `{}` exited while a handle was alive", self.name);
        }

        match reply_rx.blocking_recv() {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(_) => unreachable!("worker for cell `{}` dropped a request", self.name),
        }
    }

    /// Label used for the worker thread and in log events.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T: Clone + Send + 'static> SerializedCell<T> {
    /// Return a copy of the current value.
    pub fn get(&self) -> T {
        self.modify(|current| current.clone())
    }
}

impl<T> Clone for SerializedCell<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            tx: self.tx.clone(),
        }
    }
}

impl<T> fmt::Debug for SerializedCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializedCell")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Worker loop: owns the value and applies requests in arrival order.
///
/// Exits once every sender is dropped and the channel is drained.
fn run_worker<T>(name: Arc<str>, mut value: T, mut rx: mpsc::UnboundedReceiver<Request<T>>) {
    trace!(cell = %name, "cell worker started");
    while let Some(request) = rx.blocking_recv() {
        request(&mut value);
    }
    trace!(cell = %name, "cell worker stopped");
}
