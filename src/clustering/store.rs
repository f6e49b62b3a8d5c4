//! Persistence seams used by the cluster builder.
//!
//! `Database` implements both traits; tests substitute in-memory fakes.

use anyhow::Result;

use crate::article::Article;
use crate::clustering::types::ClusterDraft;

/// Supplies the articles a clustering run works on
#[allow(async_fn_in_trait)]
pub trait ArticleSource {
    /// Most recent articles first, in a stable order
    async fn get_recent_articles(&self, limit: i64, offset: i64) -> Result<Vec<Article>>;
}

/// Receives finished clusters
#[allow(async_fn_in_trait)]
pub trait ClusterSink {
    /// Creates the cluster row and one membership row per `(article_id, similarity_score)`.
    ///
    /// Implementations must commit the cluster and its memberships together or
    /// not at all. Returns the new cluster id.
    async fn save_cluster(&self, draft: &ClusterDraft, members: &[(i64, f64)]) -> Result<i64>;
}
