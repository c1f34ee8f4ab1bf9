//! Tests for the worker pool lifecycle and concurrency bounds.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::{PoolError, WorkerPool};

/// Tracks how many handlers run at once.
#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    max: AtomicUsize,
    finished: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

fn sleeping_pool(workers: usize, inner: usize, gauge: Arc<Gauge>, work: Duration) -> WorkerPool<u32> {
    WorkerPool::create(workers, inner, move |_index| {
        let gauge = Arc::clone(&gauge);
        Ok(move |_task: u32| {
            gauge.enter();
            thread::sleep(work);
            gauge.exit();
        })
    })
    .unwrap()
}

fn submit_all(pool: &Arc<WorkerPool<u32>>, tasks: u32) -> Vec<Result<(), PoolError>> {
    let handles: Vec<_> = (0..tasks)
        .map(|t| {
            let pool = Arc::clone(pool);
            thread::spawn(move || pool.submit(t))
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn concurrency_never_exceeds_workers_times_inner_limit() {
    let gauge = Arc::new(Gauge::default());
    let pool = Arc::new(sleeping_pool(2, 3, Arc::clone(&gauge), Duration::from_millis(40)));

    let results = submit_all(&pool, 24);
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(gauge.finished.load(Ordering::SeqCst), 24);
    let max = gauge.max.load(Ordering::SeqCst);
    assert!(max <= 6, "saw {} concurrent tasks", max);
    assert!(max >= 2, "expected tasks to overlap, saw {}", max);
    pool.dispose();
}

#[test]
fn single_slot_workers_run_at_most_two_tasks() {
    let gauge = Arc::new(Gauge::default());
    let pool = Arc::new(sleeping_pool(2, 1, Arc::clone(&gauge), Duration::from_millis(30)));

    let results = submit_all(&pool, 3);
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(gauge.finished.load(Ordering::SeqCst), 3);
    assert!(gauge.max.load(Ordering::SeqCst) <= 2);
    pool.dispose();
}

#[test]
fn submit_returns_after_task_side_effects() {
    let done: Arc<Mutex<HashSet<u32>>> = Arc::new(Mutex::new(HashSet::new()));
    let pool = {
        let done = Arc::clone(&done);
        Arc::new(
            WorkerPool::<u32>::create(2, 2, move |_| {
                let done = Arc::clone(&done);
                Ok(move |task: u32| {
                    thread::sleep(Duration::from_millis(10));
                    done.lock().unwrap().insert(task);
                })
            })
            .unwrap(),
        )
    };

    let handles: Vec<_> = (0..8u32)
        .map(|t| {
            let pool = Arc::clone(&pool);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                pool.submit(t).unwrap();
                assert!(done.lock().unwrap().contains(&t), "task {} not finished", t);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    pool.dispose();
}

#[test]
fn each_task_runs_exactly_once() {
    let runs: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let pool = {
        let runs = Arc::clone(&runs);
        Arc::new(
            WorkerPool::<u32>::create(3, 2, move |_| {
                let runs = Arc::clone(&runs);
                Ok(move |task: u32| runs.lock().unwrap().push(task))
            })
            .unwrap(),
        )
    };

    submit_all(&pool, 30);
    pool.dispose();
    let mut runs = runs.lock().unwrap().clone();
    runs.sort_unstable();
    assert_eq!(runs, (0..30).collect::<Vec<_>>());
}

#[test]
fn submit_after_dispose_fails_without_blocking() {
    let gauge = Arc::new(Gauge::default());
    let pool = sleeping_pool(2, 1, Arc::clone(&gauge), Duration::from_millis(1));
    pool.dispose();
    assert!(pool.is_disposed());

    let started = Instant::now();
    for t in 0..5 {
        assert!(matches!(pool.submit(t), Err(PoolError::Disposed)));
    }
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(gauge.finished.load(Ordering::SeqCst), 0);
}

#[test]
fn dispose_twice_is_a_no_op() {
    let gauge = Arc::new(Gauge::default());
    let pool = Arc::new(sleeping_pool(2, 2, Arc::clone(&gauge), Duration::from_millis(1)));
    submit_all(&pool, 4);

    pool.dispose();
    // Every worker consumed exactly its own sentinel.
    assert_eq!(pool.shared.queue.len(), 0);

    let started = Instant::now();
    pool.dispose();
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(pool.shared.queue.len(), 0, "second dispose queued sentinels");
    assert!(matches!(pool.submit(9), Err(PoolError::Disposed)));
    assert_eq!(gauge.finished.load(Ordering::SeqCst), 4);
}

#[test]
fn failed_worker_initialization_is_reported() {
    let result = WorkerPool::<u32>::create(3, 1, |index| {
        if index == 1 {
            anyhow::bail!("cannot reach database");
        }
        Ok(|_task: u32| {})
    });
    match result {
        Err(PoolError::Initialization { worker, source }) => {
            assert_eq!(worker, 1);
            assert!(source.to_string().contains("cannot reach database"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("pool should not start"),
    }
}

#[test]
fn panicking_task_does_not_poison_the_worker() {
    let finished = Arc::new(AtomicUsize::new(0));
    let pool = {
        let finished = Arc::clone(&finished);
        WorkerPool::<u32>::create(1, 1, move |_| {
            let finished = Arc::clone(&finished);
            Ok(move |task: u32| {
                if task == 0 {
                    panic!("boom");
                }
                finished.fetch_add(1, Ordering::SeqCst);
            })
        })
        .unwrap()
    };

    assert!(pool.submit(0).is_ok());
    assert!(pool.submit(1).is_ok());
    assert!(pool.submit(2).is_ok());
    assert_eq!(finished.load(Ordering::SeqCst), 2);
    pool.dispose();
}

#[test]
fn dispose_gives_up_on_stragglers_after_grace() {
    let pool = Arc::new(
        WorkerPool::<u32>::create_with_grace(1, 1, Duration::from_millis(50), |_| {
            Ok(|_task: u32| thread::sleep(Duration::from_millis(800)))
        })
        .unwrap(),
    );

    let submitter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.submit(1))
    };
    // Let the worker pick the task up.
    thread::sleep(Duration::from_millis(100));

    let started = Instant::now();
    pool.dispose();
    assert!(started.elapsed() < Duration::from_millis(600));

    // The in-flight task still completes and releases its submitter.
    assert!(submitter.join().unwrap().is_ok());
}

#[test]
fn idle_workers_exit_promptly_on_dispose() {
    let gauge = Arc::new(Gauge::default());
    let pool = sleeping_pool(4, 3, gauge, Duration::from_millis(1));
    let started = Instant::now();
    pool.dispose();
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn zero_sizes_are_clamped_to_one() {
    let gauge = Arc::new(Gauge::default());
    let pool = sleeping_pool(0, 0, Arc::clone(&gauge), Duration::from_millis(1));
    assert_eq!(pool.worker_count(), 1);
    assert_eq!(pool.inner_limit(), 1);
    assert!(pool.submit(7).is_ok());
    assert_eq!(gauge.finished.load(Ordering::SeqCst), 1);
    pool.dispose();
}

#[test]
fn reported_sizes_match_configuration() {
    let gauge = Arc::new(Gauge::default());
    let pool = sleeping_pool(3, 4, gauge, Duration::from_millis(1));
    assert_eq!(pool.worker_count(), 3);
    assert_eq!(pool.inner_limit(), 4);
    pool.dispose();
}
