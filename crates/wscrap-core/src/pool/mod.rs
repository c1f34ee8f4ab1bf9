//! Bounded worker pool with blocking submission.
//!
//! A fixed number of workers consume a shared FIFO. Each worker runs at
//! most `inner_limit` tasks at once and takes a permit *before* dequeuing,
//! so a long backlog never turns into unbounded concurrent load: at most
//! `workers × inner_limit` tasks execute at any instant.
//!
//! `submit` blocks the calling thread until a worker has finished the task
//! (successfully or not). `dispose` stops accepting work, wakes idle
//! workers with one shutdown sentinel each and waits a bounded grace period
//! per worker.
//!
//! Usage contract: do not call `submit` concurrently with `dispose`. A
//! submission racing disposal may be dropped, in which case `submit`
//! returns [`PoolError::Abandoned`].

mod completion;
mod permits;
mod queue;
mod worker;

#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub use completion::{completion_pair, CompletionSignal, CompletionWaiter};

use queue::{Entry, TaskQueue};
use worker::{run_worker, Readiness, WorkerArgs};

/// Default time `dispose` waits for each worker to exit.
pub const DEFAULT_DISPOSE_GRACE: Duration = Duration::from_secs(10);

/// Lifecycle errors. Task failures never surface here; handlers own them.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("worker pool has been disposed")]
    Disposed,
    #[error("worker {worker} failed to start: {source}")]
    Initialization {
        worker: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("task was dropped before a worker completed it")]
    Abandoned,
}

/// Runs one task. Shared by all inner task threads of a worker, so it must
/// be `Sync`; it is built on the worker thread and never moves between workers.
pub trait TaskHandler<T>: Sync {
    fn handle(&self, task: T);
}

impl<T, F> TaskHandler<T> for F
where
    F: Fn(T) + Sync,
{
    fn handle(&self, task: T) {
        self(task)
    }
}

/// State shared by the pool handle and every worker.
pub(crate) struct Shared<T> {
    queue: TaskQueue<T>,
    disposed: AtomicBool,
}

impl<T> Shared<T> {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

struct WorkerHandle {
    index: usize,
    thread: JoinHandle<()>,
    exited: mpsc::Receiver<()>,
}

pub struct WorkerPool<T> {
    shared: Arc<Shared<T>>,
    workers: Mutex<Vec<WorkerHandle>>,
    worker_count: usize,
    inner_limit: usize,
    grace: Duration,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Start `worker_count` workers, each limited to `inner_limit` concurrent
    /// tasks, and block until all of them are ready.
    ///
    /// `init` runs once on each worker thread and builds that worker's
    /// handler (e.g. opens its own store connection). If any worker fails to
    /// initialize, the started workers are shut down and the first failure is
    /// returned.
    pub fn create<H, F>(worker_count: usize, inner_limit: usize, init: F) -> Result<Self, PoolError>
    where
        H: TaskHandler<T> + 'static,
        F: Fn(usize) -> anyhow::Result<H> + Send + Sync + 'static,
    {
        Self::create_with_grace(worker_count, inner_limit, DEFAULT_DISPOSE_GRACE, init)
    }

    /// Like [`WorkerPool::create`] with an explicit per-worker dispose grace period.
    pub fn create_with_grace<H, F>(
        worker_count: usize,
        inner_limit: usize,
        grace: Duration,
        init: F,
    ) -> Result<Self, PoolError>
    where
        H: TaskHandler<T> + 'static,
        F: Fn(usize) -> anyhow::Result<H> + Send + Sync + 'static,
    {
        let worker_count = worker_count.max(1);
        let inner_limit = inner_limit.max(1);
        let shared = Arc::new(Shared {
            queue: TaskQueue::new(),
            disposed: AtomicBool::new(false),
        });
        let init = Arc::new(init);

        let mut handles = Vec::with_capacity(worker_count);
        let mut readiness: Vec<(usize, mpsc::Receiver<Readiness>)> =
            Vec::with_capacity(worker_count);
        let mut failure: Option<PoolError> = None;

        for index in 0..worker_count {
            let (ready_tx, ready_rx) = mpsc::sync_channel(1);
            let (exit_tx, exit_rx) = mpsc::channel();
            let args = WorkerArgs {
                index,
                inner_limit,
                shared: Arc::clone(&shared),
                ready: ready_tx,
                exited: exit_tx,
            };
            let init = Arc::clone(&init);
            let spawned = thread::Builder::new()
                .name(format!("scrape-worker-{}", index))
                .spawn(move || run_worker(args, init.as_ref()));
            match spawned {
                Ok(thread) => {
                    handles.push(WorkerHandle {
                        index,
                        thread,
                        exited: exit_rx,
                    });
                    readiness.push((index, ready_rx));
                }
                Err(e) => {
                    failure = Some(PoolError::Initialization {
                        worker: index,
                        source: Box::new(e),
                    });
                    break;
                }
            }
        }

        // Wait for every started worker, even after a failure, so none is
        // still initializing when we shut the pool down.
        for (index, ready_rx) in readiness {
            let err = match ready_rx.recv() {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => PoolError::Initialization {
                    worker: index,
                    source: e.into(),
                },
                Err(_) => PoolError::Initialization {
                    worker: index,
                    source: "worker exited before signaling readiness".into(),
                },
            };
            if failure.is_none() {
                failure = Some(err);
            }
        }

        let pool = WorkerPool {
            shared,
            workers: Mutex::new(handles),
            worker_count,
            inner_limit,
            grace,
        };

        if let Some(err) = failure {
            pool.dispose();
            return Err(err);
        }
        tracing::info!(
            "worker pool ready: {} worker(s) × {} concurrent task(s)",
            worker_count,
            inner_limit
        );
        Ok(pool)
    }

    /// Queue `task` and block until a worker has finished it.
    ///
    /// Fails immediately with [`PoolError::Disposed`] once `dispose` has
    /// started; nothing is queued in that case.
    pub fn submit(&self, task: T) -> Result<(), PoolError> {
        if self.shared.is_disposed() {
            return Err(PoolError::Disposed);
        }
        let (signal, waiter) = completion_pair();
        self.shared.queue.push(Entry::Task(task, signal));
        waiter.wait()
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn inner_limit(&self) -> usize {
        self.inner_limit
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }

    /// Stop accepting work and shut the workers down.
    ///
    /// Waits up to the grace period per worker; workers still busy after that
    /// are left running detached. Calling it again is a no-op.
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!("disposing worker pool");

        for _ in 0..self.worker_count {
            self.shared.queue.push(Entry::Shutdown);
        }

        let workers = std::mem::take(
            &mut *self
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for worker in workers {
            match worker.exited.recv_timeout(self.grace) {
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        "worker {} still busy after {:?}; leaving it running",
                        worker.index,
                        self.grace
                    );
                }
                _ => {
                    if worker.thread.join().is_err() {
                        tracing::error!("worker {} panicked", worker.index);
                    }
                }
            }
        }

        let abandoned = self.shared.queue.drain_tasks();
        if abandoned > 0 {
            tracing::warn!("{} queued task(s) abandoned at dispose", abandoned);
        }
        tracing::info!("worker pool disposed");
    }
}

impl<T> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        if !self.shared.disposed.load(Ordering::Acquire) {
            // Best effort: wake idle workers so their threads can exit.
            self.shared.disposed.store(true, Ordering::Release);
            for _ in 0..self.worker_count {
                self.shared.queue.push(Entry::Shutdown);
            }
        }
    }
}
