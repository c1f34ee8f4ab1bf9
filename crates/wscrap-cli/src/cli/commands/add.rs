//! `wscrap add <url>...` – queue articles for scraping.

use anyhow::Result;
use wscrap_core::store::SqliteArticleStore;

pub fn run_add(store: &SqliteArticleStore, urls: &[String]) -> Result<()> {
    for url in urls {
        let id = store.add_article(url)?;
        println!("Added article {id} for URL: {url}");
    }
    Ok(())
}
