//! End-to-end run: read pending articles, fan them out over the worker
//! pool and wait for completion under a global timeout.

mod progress;


use std::collections::VecDeque;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::config::WscrapConfig;
use crate::pool::WorkerPool;
use crate::retry::{run_with_retry, RetryPolicy};
use crate::store::{ArticleStore, ArticleTask};

pub use progress::ProgressCounter;

/// Knobs the orchestrator needs, derived from [`WscrapConfig`].
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Concurrent submitting threads.
    pub fanout: usize,
    pub log_frequency: u64,
    pub program_timeout: Duration,
    pub read_retry: RetryPolicy,
}

impl OrchestratorSettings {
    pub fn from_config(cfg: &WscrapConfig) -> Self {
        Self {
            fanout: cfg.fanout_width(),
            log_frequency: cfg.log_frequency,
            program_timeout: cfg.program_timeout(),
            read_retry: cfg.db_retry_policy(),
        }
    }
}

/// How `run` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every pending article went through the pool.
    Completed { processed: u64 },
    /// The program timeout elapsed first; in-flight work keeps running.
    TimedOut { processed_so_far: u64 },
    /// The pipeline thread died (panic or failed to start).
    Aborted { processed_so_far: u64 },
}

/// Result of reading the pending list.
#[derive(Debug)]
pub struct PendingRead {
    pub articles: Vec<ArticleTask>,
    /// Failed read attempts before success (or exhaustion).
    pub failed_attempts: u32,
}

#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn ArticleStore>,
    pool: Arc<WorkerPool<ArticleTask>>,
    progress: Arc<ProgressCounter>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        pool: Arc<WorkerPool<ArticleTask>>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            pool,
            progress: Arc::new(ProgressCounter::new(settings.log_frequency)),
            settings,
        }
    }

    /// Articles whose submission returned successfully so far.
    pub fn processed(&self) -> u64 {
        self.progress.processed()
    }

    pub fn progress(&self) -> &ProgressCounter {
        &self.progress
    }

    /// Read pending articles, retrying with backoff. Exhausting the retries
    /// is not fatal: it yields an empty list.
    pub fn read_pending(&self) -> PendingRead {
        tracing::info!("Reading articles to web scrape");
        let policy = &self.settings.read_retry;
        let mut failed_attempts = 0u32;
        let result = run_with_retry(
            policy,
            || self.store.fetch_pending(),
            |attempt, e| {
                failed_attempts += 1;
                tracing::error!(
                    "reading pending articles failed (attempt {}/{}): {}",
                    attempt,
                    policy.max_attempts,
                    e
                );
            },
        );
        let articles = match result {
            Ok(articles) => articles,
            Err(exhausted) => {
                tracing::error!(
                    "retries exhausted after {} attempt(s); continuing with no articles: {}",
                    exhausted.attempts,
                    exhausted.last_error
                );
                Vec::new()
            }
        };
        tracing::info!("Found {} articles to process", articles.len());
        PendingRead {
            articles,
            failed_attempts,
        }
    }

    /// Read pending articles and push each through the pool, blocking until
    /// all submissions have returned. Returns the processed count.
    pub fn build_pipeline(&self) -> u64 {
        let PendingRead { articles, .. } = self.read_pending();
        let count = articles.len();
        if count == 0 {
            return self.progress.processed();
        }

        let work: Arc<Mutex<VecDeque<ArticleTask>>> =
            Arc::new(Mutex::new(articles.into_iter().collect()));
        let width = self.settings.fanout.max(1).min(count);
        let mut handles = Vec::with_capacity(width);
        for slot in 0..width {
            let this = self.clone();
            let work = Arc::clone(&work);
            let spawned = std::thread::Builder::new()
                .name(format!("scrape-fanout-{}", slot))
                .spawn(move || this.submit_from(&work));
            match spawned {
                Ok(h) => handles.push(h),
                Err(e) => tracing::error!("could not start fan-out thread {}: {}", slot, e),
            }
        }
        if handles.is_empty() {
            // Still make progress on the calling thread.
            self.submit_from(&work);
        }
        for h in handles {
            if h.join().is_err() {
                tracing::error!("fan-out thread panicked");
            }
        }
        self.progress.processed()
    }

    fn submit_from(&self, work: &Mutex<VecDeque<ArticleTask>>) {
        loop {
            let next = work
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            let Some(article) = next else {
                break;
            };
            let id = article.id;
            match self.pool.submit(article) {
                Ok(()) => {
                    self.progress.record();
                }
                Err(e) => tracing::error!("article {} dropped: {}", id, e),
            }
        }
    }

    /// Run the pipeline on a background thread and wait for it, at most
    /// the program timeout. A timeout does not cancel in-flight work.
    pub fn run(&self) -> RunOutcome {
        let (done_tx, done_rx) = mpsc::channel();
        let this = self.clone();
        let spawned = std::thread::Builder::new()
            .name("scrape-pipeline".to_string())
            .spawn(move || {
                let processed = this.build_pipeline();
                let _ = done_tx.send(processed);
            });
        if let Err(e) = spawned {
            tracing::error!("could not start scrape pipeline: {}", e);
            return RunOutcome::Aborted {
                processed_so_far: self.processed(),
            };
        }

        match done_rx.recv_timeout(self.settings.program_timeout) {
            Ok(processed) => {
                tracing::info!("Completed extraction for {} articles", processed);
                RunOutcome::Completed { processed }
            }
            Err(RecvTimeoutError::Timeout) => {
                let processed_so_far = self.processed();
                tracing::error!(
                    "web scraping did not finish within {:?}; {} article(s) processed so far",
                    self.settings.program_timeout,
                    processed_so_far
                );
                RunOutcome::TimedOut { processed_so_far }
            }
            Err(RecvTimeoutError::Disconnected) => {
                let processed_so_far = self.processed();
                tracing::error!(
                    "scrape pipeline stopped unexpectedly after {} article(s)",
                    processed_so_far
                );
                RunOutcome::Aborted { processed_so_far }
            }
        }
    }
}
