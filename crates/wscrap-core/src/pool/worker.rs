//! Worker loop: INIT → READY → LOOP → DRAINING → DONE.
//!
//! Each worker owns its handler (built by the pool's initializer on the
//! worker thread) and an inner permit set. Tasks run on scoped threads so
//! the end of the scope is the drain point for in-flight work.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use super::permits::InnerPermits;
use super::queue::Entry;
use super::{Shared, TaskHandler};

/// Result a worker reports once initialization finished (or failed).
pub(super) type Readiness = Result<(), anyhow::Error>;

pub(super) struct WorkerArgs<T> {
    pub index: usize,
    pub inner_limit: usize,
    pub shared: Arc<Shared<T>>,
    pub ready: mpsc::SyncSender<Readiness>,
    /// Dropped when the worker thread ends (normally or by panic); the pool
    /// waits on the paired receiver during `dispose`.
    pub exited: mpsc::Sender<()>,
}

pub(super) fn run_worker<T, H, F>(args: WorkerArgs<T>, init: &F)
where
    T: Send,
    H: TaskHandler<T>,
    F: Fn(usize) -> anyhow::Result<H>,
{
    let WorkerArgs {
        index,
        inner_limit,
        shared,
        ready,
        exited: _exited,
    } = args;

    let handler = match init(index) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("worker {} failed to initialize: {:#}", index, e);
            let _ = ready.send(Err(e));
            return;
        }
    };
    let permits = InnerPermits::new(inner_limit);
    tracing::info!("worker {} started ({} concurrent tasks)", index, inner_limit);
    let _ = ready.send(Ok(()));
    drop(ready);

    let mut dispatched = 0u64;
    thread::scope(|scope| {
        loop {
            let permit = permits.acquire();
            let (task, signal) = match shared.queue.pop() {
                Entry::Shutdown => break,
                Entry::Task(_, _) if shared.is_disposed() => {
                    // Task and signal drop here; the submitter sees Abandoned.
                    break;
                }
                Entry::Task(task, signal) => (task, signal),
            };

            let handler = &handler;
            let spawned = thread::Builder::new()
                .name(format!("scrape-worker-{}-task", index))
                .spawn_scoped(scope, move || {
                    let _permit = permit;
                    run_isolated(handler, task, index);
                    signal.release();
                });
            match spawned {
                Ok(_) => dispatched += 1,
                // The closure (task, signal, permit) was dropped with the error.
                Err(e) => tracing::error!("worker {} could not start task thread: {}", index, e),
            }
        }
        tracing::debug!(
            "worker {} draining ({} task(s) in flight)",
            index,
            permits.in_use()
        );
    });

    tracing::info!("worker {} stopped after {} task(s)", index, dispatched);
}

/// Run one task; a panic is logged and contained to this task.
fn run_isolated<T, H: TaskHandler<T>>(handler: &H, task: T, index: usize) {
    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(task))) {
        let msg = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        tracing::error!("worker {}: task panicked: {}", index, msg);
    }
}
