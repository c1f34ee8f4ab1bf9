//! `wscrap status` – show article counts.

use anyhow::Result;
use wscrap_core::store::{ArticleCounts, SqliteArticleStore};

pub fn run_status(store: &SqliteArticleStore) -> Result<()> {
    let counts = store.counts()?;
    for line in status_lines(&counts) {
        println!("{line}");
    }
    Ok(())
}

pub(crate) fn status_lines(counts: &ArticleCounts) -> Vec<String> {
    if counts.total == 0 {
        return vec!["No articles in database.".to_string()];
    }
    vec![
        format!("{:<10} {:<10} {:<10} {}", "TOTAL", "PENDING", "SCRAPED", "CLEANED"),
        format!(
            "{:<10} {:<10} {:<10} {}",
            counts.total,
            counts.pending(),
            counts.scraped,
            counts.cleaned
        ),
    ]
}
