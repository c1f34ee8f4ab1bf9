//! Article queries: schema, pending reads, result writes.

use sqlx::{Pool, Row, Sqlite};

use super::types::{ArticleCounts, ArticleId, ArticleRecord, ArticleTask};

pub(super) async fn migrate(pool: &Pool<Sqlite>) -> Result<(), sqlx::Error> {
    // - `raw_scrape` NULL marks an article as pending.
    // - `cleaned_text` stays NULL when extraction produced nothing.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS articles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL UNIQUE,
            raw_scrape TEXT,
            cleaned_text TEXT,
            created_at INTEGER NOT NULL,
            scraped_at INTEGER
        );
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub(super) async fn pending_articles(pool: &Pool<Sqlite>) -> Result<Vec<ArticleTask>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, url
        FROM articles
        WHERE raw_scrape IS NULL
        ORDER BY id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ArticleTask {
            id: row.get("id"),
            url: row.get("url"),
        })
        .collect())
}

pub(super) async fn set_raw_scrape(
    pool: &Pool<Sqlite>,
    id: ArticleId,
    content: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE articles
        SET raw_scrape = ?1,
            scraped_at = ?2
        WHERE id = ?3
        "#,
    )
    .bind(content)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

pub(super) async fn set_cleaned_text(
    pool: &Pool<Sqlite>,
    id: ArticleId,
    text: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE articles
        SET cleaned_text = ?1
        WHERE id = ?2
        "#,
    )
    .bind(text)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

pub(super) async fn insert_article(
    pool: &Pool<Sqlite>,
    url: &str,
    now: i64,
) -> Result<ArticleId, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO articles (url, created_at)
        VALUES (?1, ?2)
        ON CONFLICT(url) DO NOTHING
        "#,
    )
    .bind(url)
    .bind(now)
    .execute(pool)
    .await?;

    let row = sqlx::query(r#"SELECT id FROM articles WHERE url = ?1"#)
        .bind(url)
        .fetch_one(pool)
        .await?;
    Ok(row.get("id"))
}

pub(super) async fn get_article(
    pool: &Pool<Sqlite>,
    id: ArticleId,
) -> Result<Option<ArticleRecord>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, url, raw_scrape, cleaned_text, created_at, scraped_at
        FROM articles
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| ArticleRecord {
        id: row.get("id"),
        url: row.get("url"),
        raw_scrape: row.get("raw_scrape"),
        cleaned_text: row.get("cleaned_text"),
        created_at: row.get("created_at"),
        scraped_at: row.get("scraped_at"),
    }))
}

pub(super) async fn counts(pool: &Pool<Sqlite>) -> Result<ArticleCounts, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS total,
               COUNT(raw_scrape) AS scraped,
               COUNT(cleaned_text) AS cleaned
        FROM articles
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(ArticleCounts {
        total: row.get("total"),
        scraped: row.get("scraped"),
        cleaned: row.get("cleaned"),
    })
}
