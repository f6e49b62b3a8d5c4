use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, error, info, instrument};

use super::article::{article_from_row, ARTICLE_COLUMNS};
use super::core::Database;
use crate::bias::calculate_bias_distribution;
use crate::clustering::{ClusterDetail, ClusterDraft, ClusterMember, ClusterRecord, ClusterSink};
use crate::db::Row;
use crate::TARGET_DB;

async fn insert_cluster(
    conn: &mut SqliteConnection,
    draft: &ClusterDraft,
) -> Result<i64, sqlx::Error> {
    let (id,) = sqlx::query_as::<_, (i64,)>(
        r#"
        INSERT INTO clusters (title, summary, fact_core, confidence_score, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING id
        "#,
    )
    .bind(&draft.title)
    .bind(&draft.summary)
    .bind(&draft.fact_core)
    .bind(draft.confidence_score)
    .bind(Utc::now().to_rfc3339())
    .fetch_one(conn)
    .await?;

    Ok(id)
}

async fn insert_membership(
    conn: &mut SqliteConnection,
    cluster_id: i64,
    article_id: i64,
    similarity_score: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO article_clusters (cluster_id, article_id, similarity_score)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(cluster_id, article_id) DO UPDATE SET
            similarity_score = excluded.similarity_score
        "#,
    )
    .bind(cluster_id)
    .bind(article_id)
    .bind(similarity_score)
    .execute(conn)
    .await?;

    Ok(())
}

impl Database {
    /// Inserts a cluster row without members
    #[instrument(target = "db", level = "info", skip(self, draft))]
    pub async fn create_cluster(&self, draft: &ClusterDraft) -> Result<i64, sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        let id = insert_cluster(&mut conn, draft).await?;
        info!(target: TARGET_DB, "Created cluster {}: {}", id, draft.title);
        Ok(id)
    }

    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn add_article_to_cluster(
        &self,
        cluster_id: i64,
        article_id: i64,
        similarity_score: f64,
    ) -> Result<(), sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        insert_membership(&mut conn, cluster_id, article_id, similarity_score).await?;
        debug!(target: TARGET_DB, "Added article {} to cluster {} (score {:.2})", article_id, cluster_id, similarity_score);
        Ok(())
    }

    /// Stores a cluster and all of its memberships in one transaction
    #[instrument(target = "db", level = "info", skip(self, draft, members))]
    pub async fn save_cluster(
        &self,
        draft: &ClusterDraft,
        members: &[(i64, f64)],
    ) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        let cluster_id = insert_cluster(&mut tx, draft).await?;
        for (article_id, similarity_score) in members {
            if let Err(e) = insert_membership(&mut tx, cluster_id, *article_id, *similarity_score).await {
                error!(target: TARGET_DB, "Failed to add article {} to new cluster: {}", article_id, e);
                // Dropping the transaction rolls back the cluster row as well
                return Err(e);
            }
        }

        tx.commit().await?;
        info!(target: TARGET_DB, "Saved cluster {} with {} articles: {}", cluster_id, members.len(), draft.title);
        Ok(cluster_id)
    }

    /// Clusters newest first, with their member counts
    pub async fn list_clusters(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ClusterRecord>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.title, c.summary, c.fact_core, c.confidence_score, c.created_at,
                   COUNT(ac.article_id) AS article_count
            FROM clusters c
            LEFT JOIN article_clusters ac ON ac.cluster_id = c.id
            GROUP BY c.id
            ORDER BY c.created_at DESC, c.id DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().map(cluster_from_row).collect())
    }

    pub async fn get_cluster(&self, cluster_id: i64) -> Result<Option<ClusterRecord>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT c.id, c.title, c.summary, c.fact_core, c.confidence_score, c.created_at,
                   COUNT(ac.article_id) AS article_count
            FROM clusters c
            LEFT JOIN article_clusters ac ON ac.cluster_id = c.id
            WHERE c.id = ?1
            GROUP BY c.id
            "#,
        )
        .bind(cluster_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.as_ref().map(cluster_from_row))
    }

    /// Member articles, highest membership score first
    pub async fn get_cluster_articles(
        &self,
        cluster_id: i64,
    ) -> Result<Vec<ClusterMember>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}, ac.similarity_score
            FROM article_clusters ac
            JOIN articles a ON ac.article_id = a.id
            JOIN sources s ON a.source_id = s.id
            WHERE ac.cluster_id = ?1
            ORDER BY ac.similarity_score DESC, a.id ASC
            "#,
            ARTICLE_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(cluster_id)
            .fetch_all(self.pool())
            .await?;

        Ok(rows
            .iter()
            .map(|row| ClusterMember {
                article: article_from_row(row),
                similarity_score: row.get("similarity_score"),
            })
            .collect())
    }

    /// A cluster with its articles and the bias distribution computed from them
    pub async fn get_cluster_detail(
        &self,
        cluster_id: i64,
    ) -> Result<Option<ClusterDetail>, sqlx::Error> {
        let Some(cluster) = self.get_cluster(cluster_id).await? else {
            return Ok(None);
        };

        let members = self.get_cluster_articles(cluster_id).await?;
        let articles: Vec<_> = members.iter().map(|m| m.article.clone()).collect();
        let bias_distribution = calculate_bias_distribution(&articles);

        Ok(Some(ClusterDetail {
            cluster,
            articles: members,
            bias_distribution,
        }))
    }
}

fn cluster_from_row(row: &sqlx::sqlite::SqliteRow) -> ClusterRecord {
    ClusterRecord {
        id: row.get("id"),
        title: row.get("title"),
        summary: row.get("summary"),
        fact_core: row.get("fact_core"),
        confidence_score: row.get("confidence_score"),
        created_at: row.get("created_at"),
        article_count: row.get("article_count"),
    }
}

impl ClusterSink for Database {
    async fn save_cluster(&self, draft: &ClusterDraft, members: &[(i64, f64)]) -> anyhow::Result<i64> {
        Ok(Database::save_cluster(self, draft, members).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::BiasLabel;

    fn draft(title: &str) -> ClusterDraft {
        ClusterDraft {
            title: title.to_string(),
            summary: "Coverage from 2 sources across 2 perspectives.".to_string(),
            fact_core: String::new(),
            confidence_score: 0.5,
        }
    }

    async fn seeded() -> (Database, Vec<i64>) {
        let db = Database::in_memory().await.unwrap();
        let left = db
            .add_source("Left Daily", "https://left.example", "left", -1.0)
            .await
            .unwrap();
        let right = db
            .add_source("Right Times", "https://right.example", "right", 1.0)
            .await
            .unwrap();
        let mut ids = Vec::new();
        for (source, url) in [
            (left, "https://left.example/1"),
            (right, "https://right.example/1"),
            (right, "https://right.example/2"),
        ] {
            ids.push(
                db.add_article(source, "Budget vote", url, None, None, None)
                    .await
                    .unwrap(),
            );
        }
        (db, ids)
    }

    #[tokio::test]
    async fn test_save_cluster_and_read_detail() {
        let (db, ids) = seeded().await;
        let members: Vec<(i64, f64)> = vec![(ids[0], 0.8), (ids[1], 0.9), (ids[2], 0.8)];
        let cluster_id = db.save_cluster(&draft("Budget vote"), &members).await.unwrap();

        let detail = db.get_cluster_detail(cluster_id).await.unwrap().unwrap();
        assert_eq!(detail.cluster.title, "Budget vote");
        assert_eq!(detail.cluster.article_count, 3);
        assert_eq!(detail.articles.len(), 3);
        assert_eq!(detail.articles[0].article.id, ids[1]);
        assert_eq!(detail.articles[0].similarity_score, 0.9);
        assert_eq!(detail.bias_distribution.total, 3);
        assert_eq!(detail.bias_distribution.counts[&BiasLabel::Left], 1);
        assert_eq!(detail.bias_distribution.counts[&BiasLabel::Right], 2);
    }

    #[tokio::test]
    async fn test_failed_membership_rolls_back_cluster() {
        let (db, ids) = seeded().await;
        let members = vec![(ids[0], 0.8), (9_999, 0.8)];
        assert!(db.save_cluster(&draft("Broken"), &members).await.is_err());
        assert!(db.list_clusters(10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_clusters_newest_first() {
        let (db, ids) = seeded().await;
        let first = db.create_cluster(&draft("First")).await.unwrap();
        let second = db.create_cluster(&draft("Second")).await.unwrap();
        db.add_article_to_cluster(second, ids[0], 0.8).await.unwrap();

        let clusters = db.list_clusters(10, 0).await.unwrap();
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().position(|c| c.id == second) < clusters.iter().position(|c| c.id == first));
        let second_record = clusters.iter().find(|c| c.id == second).unwrap();
        assert_eq!(second_record.article_count, 1);

        assert!(db.get_cluster_detail(second + 10).await.unwrap().is_none());
    }
}
