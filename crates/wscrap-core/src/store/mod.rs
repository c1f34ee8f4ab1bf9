//! Article store: reads articles that still need scraping and persists
//! scrape results (SQLite via sqlx).
//!
//! The pipeline only sees the blocking [`ArticleStore`] trait; the SQLite
//! implementation drives its async pool on a private runtime.

mod articles;
mod db;
pub mod types;


use std::sync::Arc;

pub use db::SqliteArticleStore;
pub use types::*;

/// Failure talking to the article store. Reads are retried by the
/// orchestrator; writes are logged and dropped by the scrape pipeline.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Blocking interface to the persistent article store.
pub trait ArticleStore: Send + Sync {
    /// Articles with no raw scrape yet.
    fn fetch_pending(&self) -> Result<Vec<ArticleTask>, StoreError>;

    /// Store the raw page for `id`, replacing any previous value.
    fn persist_raw_scrape(&self, id: ArticleId, content: &str) -> Result<(), StoreError>;

    /// Store extracted text for `id`, replacing any previous value.
    /// Empty (or whitespace-only) text is a no-op.
    fn persist_cleaned_text(&self, id: ArticleId, text: &str) -> Result<(), StoreError>;
}

impl<S: ArticleStore + ?Sized> ArticleStore for Arc<S> {
    fn fetch_pending(&self) -> Result<Vec<ArticleTask>, StoreError> {
        (**self).fetch_pending()
    }

    fn persist_raw_scrape(&self, id: ArticleId, content: &str) -> Result<(), StoreError> {
        (**self).persist_raw_scrape(id, content)
    }

    fn persist_cleaned_text(&self, id: ArticleId, text: &str) -> Result<(), StoreError> {
        (**self).persist_cleaned_text(id, text)
    }
}
