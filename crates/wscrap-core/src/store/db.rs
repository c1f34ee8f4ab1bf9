//! SQLite-backed article store.
//!
//! Handles connection, migrations, and the blocking facade over the async
//! pool. Queries live in `articles`.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::runtime::Runtime;

use super::articles;
use super::types::{ArticleCounts, ArticleId, ArticleRecord, ArticleTask};
use super::{ArticleStore, StoreError};
use crate::config::WscrapConfig;

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Handle to the SQLite article database.
///
/// Every worker opens its own handle (own pool, own runtime), so a worker
/// that cannot reach the database fails at startup instead of mid-run.
/// The default file lives under the XDG state directory:
/// `~/.local/state/wscrap/articles.db` on Debian.
#[derive(Clone)]
pub struct SqliteArticleStore {
    pub(super) pool: Pool<Sqlite>,
    runtime: Arc<Runtime>,
}

impl SqliteArticleStore {
    /// Open the database named by `cfg.db_path`, or the default location.
    pub fn open(cfg: &WscrapConfig) -> Result<Self, StoreError> {
        match &cfg.db_path {
            Some(path) => Self::open_at(path),
            None => Self::open_default(),
        }
    }

    /// Open (or create) the default article database and run migrations.
    pub fn open_default() -> Result<Self, StoreError> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("wscrap")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::open_at(xdg_dirs.get_state_home().join("articles.db"))
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let options = SqliteConnectOptions::from_str(&path_to_sqlite_uri(path))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        let runtime = build_runtime()?;
        let pool = runtime.block_on(
            SqlitePoolOptions::new()
                .max_connections(4)
                .connect_with(options),
        )?;
        let store = SqliteArticleStore {
            pool,
            runtime: Arc::new(runtime),
        };
        store.block_on(articles::migrate(&store.pool))?;
        Ok(store)
    }

    /// Queue a URL for scraping. Adding a URL that is already known returns
    /// the existing id and leaves its scrape results untouched.
    pub fn add_article(&self, url: &str) -> Result<ArticleId, StoreError> {
        self.block_on(articles::insert_article(&self.pool, url, unix_timestamp()))
    }

    pub fn get_article(&self, id: ArticleId) -> Result<Option<ArticleRecord>, StoreError> {
        self.block_on(articles::get_article(&self.pool, id))
    }

    pub fn counts(&self) -> Result<ArticleCounts, StoreError> {
        self.block_on(articles::counts(&self.pool))
    }

    fn block_on<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        Ok(self.runtime.block_on(fut)?)
    }
}

impl ArticleStore for SqliteArticleStore {
    fn fetch_pending(&self) -> Result<Vec<ArticleTask>, StoreError> {
        self.block_on(articles::pending_articles(&self.pool))
    }

    fn persist_raw_scrape(&self, id: ArticleId, content: &str) -> Result<(), StoreError> {
        self.block_on(articles::set_raw_scrape(
            &self.pool,
            id,
            content,
            unix_timestamp(),
        ))
    }

    fn persist_cleaned_text(&self, id: ArticleId, text: &str) -> Result<(), StoreError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        self.block_on(articles::set_cleaned_text(&self.pool, id, text))
    }
}

fn build_runtime() -> Result<Runtime, StoreError> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("wscrap-sqlite")
        .enable_all()
        .build()?)
}

/// Current time as Unix seconds (for DB timestamps).
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
/// Open an in-memory database for tests (no disk I/O).
pub(crate) fn open_memory() -> Result<SqliteArticleStore, StoreError> {
    let runtime = build_runtime()?;
    let pool = runtime.block_on(
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:"),
    )?;
    let store = SqliteArticleStore {
        pool,
        runtime: Arc::new(runtime),
    };
    store.block_on(articles::migrate(&store.pool))?;
    Ok(store)
}
