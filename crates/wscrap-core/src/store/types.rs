//! Types used by the article store.

/// Article identifier (SQLite row id).
pub type ArticleId = i64;

/// One article to scrape. Produced by a pending read, consumed once by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleTask {
    pub id: ArticleId,
    pub url: String,
}

impl ArticleTask {
    pub fn new(id: ArticleId, url: impl Into<String>) -> Self {
        Self { id, url: url.into() }
    }
}

/// Full article row.
#[derive(Debug, Clone)]
pub struct ArticleRecord {
    pub id: ArticleId,
    pub url: String,
    pub raw_scrape: Option<String>,
    pub cleaned_text: Option<String>,
    pub created_at: i64,
    pub scraped_at: Option<i64>,
}

/// Row counts used by the CLI `status` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArticleCounts {
    pub total: i64,
    pub scraped: i64,
    pub cleaned: i64,
}

impl ArticleCounts {
    /// Articles still waiting for a raw scrape.
    pub fn pending(&self) -> i64 {
        self.total - self.scraped
    }
}
