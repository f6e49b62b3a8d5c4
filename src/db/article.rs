use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use tracing::{debug, error, instrument};

use super::core::Database;
use crate::article::Article;
use crate::clustering::ArticleSource;
use crate::db::Row;
use crate::TARGET_DB;

/// Columns selected for every [`Article`] read, joined with the source row
pub(crate) const ARTICLE_COLUMNS: &str = r#"
    a.id, a.title, a.excerpt, a.content, a.url, a.published_at,
    s.id AS source_id, s.name AS source_name, s.bias AS source_bias,
    s.bias_score AS source_bias_score
"#;

pub(crate) fn article_from_row(row: &SqliteRow) -> Article {
    Article {
        id: row.get("id"),
        title: row.get("title"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        url: row.get("url"),
        source_id: row.get("source_id"),
        source_name: row.get("source_name"),
        source_bias: row.get("source_bias"),
        source_bias_score: row.get("source_bias_score"),
        published_at: row.get("published_at"),
    }
}

impl Database {
    /// Registers a news source, returning the existing id if the url is known
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn add_source(
        &self,
        name: &str,
        url: &str,
        bias: &str,
        bias_score: f64,
    ) -> Result<i64, sqlx::Error> {
        let (id,) = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO sources (name, url, bias, bias_score, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(url) DO UPDATE SET
                name = excluded.name,
                bias = excluded.bias,
                bias_score = excluded.bias_score
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(url)
        .bind(bias)
        .bind(bias_score)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(self.pool())
        .await?;

        debug!(target: TARGET_DB, "Source {} stored with id {}", name, id);
        Ok(id)
    }

    /// Inserts an article, or refreshes its text when the url is already stored
    #[instrument(target = "db", level = "info", skip(self, excerpt, content))]
    pub async fn add_article(
        &self,
        source_id: i64,
        title: &str,
        url: &str,
        excerpt: Option<&str>,
        content: Option<&str>,
        published_at: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        debug!(target: TARGET_DB, "Adding/updating article: {}", url);

        let (id,) = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO articles (source_id, title, url, excerpt, content, published_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                excerpt = excluded.excerpt,
                content = excluded.content,
                published_at = excluded.published_at
            RETURNING id
            "#,
        )
        .bind(source_id)
        .bind(title)
        .bind(url)
        .bind(excerpt)
        .bind(content)
        .bind(published_at)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(self.pool())
        .await
        .map_err(|err| {
            error!(target: TARGET_DB, "Failed to add article {}: {}", url, err);
            err
        })?;

        debug!(target: TARGET_DB, "Article added/updated: {} with id {}", url, id);
        Ok(id)
    }

    /// Most recent articles across all sources, newest first.
    ///
    /// Articles without a publication date sort last; ties are broken by
    /// descending id so that paging is stable.
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn get_recent_articles(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Article>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM articles a
            JOIN sources s ON a.source_id = s.id
            ORDER BY a.published_at IS NULL, a.published_at DESC, a.id DESC
            LIMIT ?1 OFFSET ?2
            "#,
            ARTICLE_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool())
            .await?;

        let articles: Vec<Article> = rows.iter().map(article_from_row).collect();
        debug!(target: TARGET_DB, "Fetched {} recent articles (limit {}, offset {})", articles.len(), limit, offset);
        Ok(articles)
    }

    pub async fn get_article(&self, article_id: i64) -> Result<Option<Article>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM articles a
            JOIN sources s ON a.source_id = s.id
            WHERE a.id = ?1
            "#,
            ARTICLE_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(article_id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.as_ref().map(article_from_row))
    }
}

impl ArticleSource for Database {
    async fn get_recent_articles(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Article>> {
        Ok(Database::get_recent_articles(self, limit, offset).await?)
    }
}
