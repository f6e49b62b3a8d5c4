use anyhow::{Context, Result};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument};

use crate::clustering::grouping::group_by_keywords;
use crate::clustering::metadata::build_cluster_draft;
use crate::clustering::refine::refine_cluster;
use crate::clustering::store::{ArticleSource, ClusterSink};
use crate::clustering::types::RunSummary;
use crate::clustering::{ClusteringConfig, MEMBERSHIP_SIMILARITY_PLACEHOLDER};
use crate::vector::EmbeddingProvider;
use crate::TARGET_CLUSTER;

/// Runs the clustering pipeline over the most recent articles.
///
/// `S` supplies articles and receives finished clusters. `E` is only consulted
/// when semantic refinement is enabled; without a provider every coarse group
/// is saved as is.
pub struct ClusterBuilder<S, E> {
    store: S,
    embeddings: Option<E>,
    config: ClusteringConfig,
}

impl<S, E> ClusterBuilder<S, E>
where
    S: ArticleSource + ClusterSink,
    E: EmbeddingProvider,
{
    pub fn new(store: S, embeddings: Option<E>, config: ClusteringConfig) -> Self {
        Self {
            store,
            embeddings,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    /// Consumes the builder, handing back the embedding provider for shutdown
    pub fn into_embeddings(self) -> Option<E> {
        self.embeddings
    }

    /// One clustering run.
    ///
    /// Only a failure to read articles is returned as an error. A cluster that
    /// fails to save is logged and skipped; `clusters_created` counts saved
    /// clusters only.
    #[instrument(target = "clustering", level = "info", skip(self))]
    pub async fn run_clustering(&self) -> Result<RunSummary> {
        let start = Instant::now();

        let articles = self
            .store
            .get_recent_articles(self.config.window_size, 0)
            .await
            .context("Failed to read recent articles for clustering")?;

        let mut summary = RunSummary {
            articles_processed: articles.len(),
            clusters_created: 0,
        };

        if articles.len() < 2 {
            info!(target: TARGET_CLUSTER, "Only {} articles available, nothing to cluster", articles.len());
            return Ok(summary);
        }

        let coarse_groups = group_by_keywords(&articles, self.config.min_cluster_size);
        info!(target: TARGET_CLUSTER,
            "Grouped {} articles into {} coarse clusters",
            articles.len(),
            coarse_groups.len()
        );

        let refine_with = self
            .embeddings
            .as_ref()
            .filter(|_| self.config.refinement.is_semantic());

        for group in coarse_groups {
            let groups = match refine_with {
                Some(provider) => {
                    refine_cluster(group, provider, self.config.min_cluster_size).await
                }
                None => vec![group],
            };

            for group in groups {
                let draft = build_cluster_draft(&group);
                let members: Vec<(i64, f64)> = group
                    .iter()
                    .map(|a| (a.id, MEMBERSHIP_SIMILARITY_PLACEHOLDER))
                    .collect();

                match self.store.save_cluster(&draft, &members).await {
                    Ok(cluster_id) => {
                        summary.clusters_created += 1;
                        debug!(target: TARGET_CLUSTER,
                            "Saved cluster {} \"{}\" with {} articles (confidence {:.2})",
                            cluster_id,
                            draft.title,
                            members.len(),
                            draft.confidence_score
                        );
                    }
                    Err(e) => {
                        error!(target: TARGET_CLUSTER, "Failed to save cluster \"{}\": {:?}", draft.title, e);
                    }
                }
            }
        }

        info!(target: TARGET_CLUSTER,
            "Clustering run complete: {} articles, {} clusters created in {:?}",
            summary.articles_processed,
            summary.clusters_created,
            start.elapsed()
        );

        Ok(summary)
    }
}
