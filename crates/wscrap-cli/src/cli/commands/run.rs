//! `wscrap run` – scrape every pending article through the worker pool.

use anyhow::{Context, Result};
use std::sync::Arc;
use wscrap_core::config::WscrapConfig;
use wscrap_core::extract::ReadableTextExtractor;
use wscrap_core::fetch::CurlFetcher;
use wscrap_core::orchestrator::{Orchestrator, OrchestratorSettings, RunOutcome};
use wscrap_core::pool::WorkerPool;
use wscrap_core::scrape::Scraper;
use wscrap_core::store::{ArticleTask, SqliteArticleStore};

pub fn run_scraper(cfg: &WscrapConfig) -> Result<()> {
    tracing::debug!(
        "WEB_SCRAP_RETRIES={} is reserved and not applied",
        cfg.web_scrap_retries
    );
    let store = SqliteArticleStore::open(cfg).context("failed to open article store")?;
    let pool = start_pool(cfg)?;
    tracing::info!(
        "scraping with {} worker(s), {} article(s) each at a time",
        pool.worker_count(),
        pool.inner_limit()
    );

    let orchestrator =
        Orchestrator::new(Arc::new(store), Arc::clone(&pool), OrchestratorSettings::from_config(cfg));
    let outcome = orchestrator.run();
    pool.dispose();

    match outcome {
        RunOutcome::Completed { processed } => println!("Processed {processed} article(s)."),
        RunOutcome::TimedOut { processed_so_far } => println!(
            "Stopped waiting after {:?}; {processed_so_far} article(s) processed.",
            cfg.program_timeout()
        ),
        RunOutcome::Aborted { processed_so_far } => {
            println!("Pipeline stopped early; {processed_so_far} article(s) processed.")
        }
    }
    Ok(())
}

/// One store connection and one fetcher per worker, opened on the worker thread.
fn start_pool(cfg: &WscrapConfig) -> Result<Arc<WorkerPool<ArticleTask>>> {
    let worker_cfg = cfg.clone();
    let pool = WorkerPool::<ArticleTask>::create_with_grace(
        cfg.worker_count(),
        cfg.inner_concurrency(),
        cfg.dispose_grace(),
        move |index| {
            let store = SqliteArticleStore::open(&worker_cfg)
                .with_context(|| format!("worker {index}: failed to open article store"))?;
            let fetcher = CurlFetcher::new(worker_cfg.request_timeout());
            Ok(Scraper::new(store, fetcher, ReadableTextExtractor))
        },
    )
    .context("failed to start worker pool")?;
    Ok(Arc::new(pool))
}
