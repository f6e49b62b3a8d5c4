use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, instrument, warn};

use super::core::Database;
use crate::TARGET_DB;

impl Database {
    /// Cached embedding for an article, if one has been stored
    #[instrument(target = "db", level = "debug", skip(self))]
    pub async fn get_embedding(&self, article_id: i64) -> Result<Option<Vec<f32>>> {
        let row = sqlx::query_as::<_, (Vec<u8>, String)>(
            "SELECT embedding, model_name FROM embeddings WHERE article_id = ?1",
        )
        .bind(article_id)
        .fetch_optional(self.pool())
        .await?;

        let Some((bytes, model_name)) = row else {
            return Ok(None);
        };

        let embedding: Vec<f32> = serde_json::from_slice(&bytes)
            .with_context(|| format!("Corrupt embedding stored for article {}", article_id))?;
        debug!(target: TARGET_DB, "Loaded {}-dimension {} embedding for article {}", embedding.len(), model_name, article_id);
        Ok(Some(embedding))
    }

    /// Stores an embedding. The first stored embedding for an article wins.
    #[instrument(target = "db", level = "debug", skip(self, embedding))]
    pub async fn store_embedding(
        &self,
        article_id: i64,
        embedding: &[f32],
        model_name: &str,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(embedding)?;
        let result = sqlx::query(
            r#"
            INSERT INTO embeddings (article_id, embedding, model_name, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(article_id) DO NOTHING
            "#,
        )
        .bind(article_id)
        .bind(bytes)
        .bind(model_name)
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            warn!(target: TARGET_DB, "Embedding for article {} already cached, keeping existing", article_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_stored_embedding_wins() {
        let db = Database::in_memory().await.unwrap();
        let source = db
            .add_source("Wire", "https://wire.example", "center", 0.0)
            .await
            .unwrap();
        let article = db
            .add_article(source, "Rates hold", "https://wire.example/a", None, None, None)
            .await
            .unwrap();

        assert!(db.get_embedding(article).await.unwrap().is_none());
        db.store_embedding(article, &[0.5, 0.25], "model-a").await.unwrap();
        db.store_embedding(article, &[9.0, 9.0], "model-b").await.unwrap();
        assert_eq!(db.get_embedding(article).await.unwrap(), Some(vec![0.5, 0.25]));
    }

    #[tokio::test]
    async fn test_corrupt_embedding_is_an_error() {
        let db = Database::in_memory().await.unwrap();
        let source = db
            .add_source("Wire", "https://wire.example", "center", 0.0)
            .await
            .unwrap();
        let article = db
            .add_article(source, "Rates hold", "https://wire.example/a", None, None, None)
            .await
            .unwrap();
        sqlx::query("INSERT INTO embeddings (article_id, embedding, model_name, created_at) VALUES (?1, ?2, 'x', 'now')")
            .bind(article)
            .bind(b"not json".to_vec())
            .execute(db.pool())
            .await
            .unwrap();

        assert!(db.get_embedding(article).await.is_err());
    }
}
