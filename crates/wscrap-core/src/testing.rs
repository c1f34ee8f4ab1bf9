//! In-memory fakes shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use crate::fetch::{FetchError, Fetcher};
use crate::store::{ArticleId, ArticleStore, ArticleTask, StoreError};

/// Article store backed by maps, with injectable failures.
#[derive(Default)]
pub(crate) struct MemoryStore {
    pending: Mutex<Vec<ArticleTask>>,
    read_failures_left: AtomicU32,
    pub reads: AtomicU32,
    raw: Mutex<HashMap<ArticleId, String>>,
    cleaned: Mutex<HashMap<ArticleId, String>>,
    fail_raw_for: Mutex<HashSet<ArticleId>>,
}

impl MemoryStore {
    pub fn with_articles(articles: &[(ArticleId, &str)]) -> Self {
        let store = Self::default();
        *store.pending.lock().unwrap() = articles
            .iter()
            .map(|(id, url)| ArticleTask::new(*id, *url))
            .collect();
        store
    }

    /// The next `n` pending reads fail.
    pub fn fail_reads(self, n: u32) -> Self {
        self.read_failures_left.store(n, Ordering::SeqCst);
        self
    }

    /// Raw-scrape writes for `id` fail.
    pub fn fail_raw_for(self, id: ArticleId) -> Self {
        self.fail_raw_for.lock().unwrap().insert(id);
        self
    }

    pub fn raw_scrape(&self, id: ArticleId) -> Option<String> {
        self.raw.lock().unwrap().get(&id).cloned()
    }

    pub fn cleaned_text(&self, id: ArticleId) -> Option<String> {
        self.cleaned.lock().unwrap().get(&id).cloned()
    }

    pub fn raw_count(&self) -> usize {
        self.raw.lock().unwrap().len()
    }
}

impl ArticleStore for MemoryStore {
    fn fetch_pending(&self) -> Result<Vec<ArticleTask>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .read_failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Unavailable("injected read failure".into()));
        }
        Ok(self.pending.lock().unwrap().clone())
    }

    fn persist_raw_scrape(&self, id: ArticleId, content: &str) -> Result<(), StoreError> {
        if self.fail_raw_for.lock().unwrap().contains(&id) {
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        self.raw.lock().unwrap().insert(id, content.to_string());
        Ok(())
    }

    fn persist_cleaned_text(&self, id: ArticleId, text: &str) -> Result<(), StoreError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        self.cleaned.lock().unwrap().insert(id, text.to_string());
        Ok(())
    }
}

/// Fetcher serving canned pages; unknown URLs get HTTP 404.
#[derive(Default)]
pub(crate) struct StubFetcher {
    pages: HashMap<String, Result<String, u32>>,
    delay: Duration,
    current: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
}

impl StubFetcher {
    pub fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn status(mut self, url: &str, status: u32) -> Self {
        self.pages.insert(url.to_string(), Err(status));
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Fetcher for StubFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.current.fetch_sub(1, Ordering::SeqCst);

        match self.pages.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
