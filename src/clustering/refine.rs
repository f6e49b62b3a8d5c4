use tracing::{debug, info, warn};

use crate::article::Article;
use crate::clustering::kmeans::{KMeans, KMEANS_MAX_ITERATIONS, KMEANS_SEED};
use crate::clustering::{MAX_SUBCLUSTERS, MIN_EMBEDDINGS_FOR_REFINEMENT};
use crate::vector::EmbeddingProvider;
use crate::TARGET_CLUSTER;

/// Looks up the cached embedding for `article`, computing and caching it on a miss.
///
/// A failed cache write is logged and the computed vector is still returned.
async fn embedding_for<E: EmbeddingProvider>(provider: &E, article: &Article) -> Option<Vec<f32>> {
    match provider.cached_embedding(article.id).await {
        Ok(Some(embedding)) => return Some(embedding),
        Ok(None) => {}
        Err(e) => {
            warn!(target: TARGET_CLUSTER, "Failed to read cached embedding for article {}: {:?}", article.id, e);
            return None;
        }
    }

    let embedding = provider.compute_embedding(article).await?;
    if let Err(e) = provider
        .cache_embedding(article.id, &embedding, provider.model_name())
        .await
    {
        warn!(target: TARGET_CLUSTER, "Failed to cache embedding for article {}: {:?}", article.id, e);
    }
    Some(embedding)
}

/// Splits a coarse cluster into semantically tighter subclusters.
///
/// Embeddings are fetched (and cached) for every article before deciding.
/// Every article needs one; if any is unavailable, or there are fewer
/// than [`MIN_EMBEDDINGS_FOR_REFINEMENT`], the cluster is returned unchanged as
/// `vec![articles]`. Otherwise the embeddings are partitioned with k-means into
/// `min(n / 3, MAX_SUBCLUSTERS)` groups and subgroups smaller than
/// `min_cluster_size` are dropped. The result may be empty.
///
/// Never fails: partitioning errors also fall back to the unchanged cluster.
pub async fn refine_cluster<E: EmbeddingProvider>(
    articles: Vec<Article>,
    provider: &E,
    min_cluster_size: usize,
) -> Vec<Vec<Article>> {
    let mut embeddings = Vec::with_capacity(articles.len());
    let mut missing = 0;
    for article in &articles {
        match embedding_for(provider, article).await {
            Some(embedding) => embeddings.push(embedding),
            None => missing += 1,
        }
    }

    if missing > 0 {
        info!(target: TARGET_CLUSTER,
            "{} of {} articles have no embedding, keeping cluster unrefined",
            missing,
            articles.len()
        );
        return vec![articles];
    }

    if embeddings.len() < MIN_EMBEDDINGS_FOR_REFINEMENT {
        return vec![articles];
    }

    let k = (embeddings.len() / 3).min(MAX_SUBCLUSTERS);
    let kmeans = match KMeans::fit(&embeddings, k, KMEANS_MAX_ITERATIONS, KMEANS_SEED) {
        Ok(kmeans) => kmeans,
        Err(e) => {
            warn!(target: TARGET_CLUSTER, "Partitioning failed, keeping cluster unrefined: {:?}", e);
            return vec![articles];
        }
    };

    let subclusters: Vec<Vec<Article>> = kmeans
        .groups()
        .into_iter()
        .filter(|group| group.len() >= min_cluster_size)
        .map(|group| group.into_iter().map(|i| articles[i].clone()).collect())
        .collect();

    debug!(target: TARGET_CLUSTER,
        "Refined cluster of {} into {} subclusters (k={})",
        articles.len(),
        subclusters.len(),
        k
    );
    subclusters
}
