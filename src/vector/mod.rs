// Vector embedding configuration and the provider seam used by cluster refinement
pub const TARGET_VECTOR: &str = "article-embeddings";

/// Model used when `EMBEDDING_MODEL` is not set
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

pub mod config;
pub mod embedding;

pub use config::EmbeddingConfig;
pub use embedding::EmbeddingService;

use anyhow::Result;

use crate::article::Article;

/// Source of dense article embeddings with a per-article cache.
///
/// One embedding is kept per article regardless of model; once cached it is
/// never recomputed.
#[allow(async_fn_in_trait)]
pub trait EmbeddingProvider {
    /// Identifier stored alongside cached vectors
    fn model_name(&self) -> &str;

    async fn cached_embedding(&self, article_id: i64) -> Result<Option<Vec<f32>>>;

    /// Computes a fresh embedding. Failures and timeouts yield `None`.
    async fn compute_embedding(&self, article: &Article) -> Option<Vec<f32>>;

    async fn cache_embedding(&self, article_id: i64, embedding: &[f32], model_name: &str)
        -> Result<()>;
}
