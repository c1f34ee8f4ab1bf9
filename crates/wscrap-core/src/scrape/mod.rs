//! Per-article scrape pipeline: fetch → persist raw → extract → persist cleaned.
//!
//! Every failure is logged here and ends processing for that one article;
//! nothing propagates to the worker pool.

use crate::extract::Extractor;
use crate::fetch::Fetcher;
use crate::pool::TaskHandler;
use crate::store::{ArticleStore, ArticleTask};

/// How far one article got. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// Raw page and non-empty cleaned text stored.
    Cleaned,
    /// Raw page stored; nothing readable extracted (or the page was empty).
    RawOnly,
    /// Page could not be retrieved; nothing stored.
    FetchFailed,
    /// A store write failed.
    PersistFailed,
}

/// The scrape pipeline bound to one worker's store, fetcher and extractor.
pub struct Scraper<S, F, E> {
    store: S,
    fetcher: F,
    extractor: E,
}

impl<S, F, E> Scraper<S, F, E>
where
    S: ArticleStore,
    F: Fetcher,
    E: Extractor,
{
    pub fn new(store: S, fetcher: F, extractor: E) -> Self {
        Self {
            store,
            fetcher,
            extractor,
        }
    }

    pub fn scrape(&self, article: &ArticleTask) -> ScrapeOutcome {
        let raw = match self.fetcher.fetch(&article.url) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(
                    "web scrape failed for article {} ({}): {}",
                    article.id,
                    article.url,
                    e
                );
                return ScrapeOutcome::FetchFailed;
            }
        };

        if let Err(e) = self.store.persist_raw_scrape(article.id, &raw) {
            tracing::error!("failed to store raw page for article {}: {}", article.id, e);
            return ScrapeOutcome::PersistFailed;
        }
        if raw.is_empty() {
            return ScrapeOutcome::RawOnly;
        }

        let text = self.extractor.extract(&raw);
        if let Err(e) = self.store.persist_cleaned_text(article.id, &text) {
            tracing::error!("failed to store cleaned text for article {}: {}", article.id, e);
            return ScrapeOutcome::PersistFailed;
        }
        if text.trim().is_empty() {
            ScrapeOutcome::RawOnly
        } else {
            ScrapeOutcome::Cleaned
        }
    }
}

impl<S, F, E> TaskHandler<ArticleTask> for Scraper<S, F, E>
where
    S: ArticleStore,
    F: Fetcher,
    E: Extractor,
{
    fn handle(&self, article: ArticleTask) {
        let outcome = self.scrape(&article);
        tracing::debug!("article {} scraped: {:?}", article.id, outcome);
    }
}
