use serde::{Deserialize, Serialize};

use crate::article::Article;
use crate::bias::BiasDistribution;

/// Derived metadata for a group of articles about to be saved as one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterDraft {
    pub title: String,
    pub summary: String,
    pub fact_core: String,
    pub confidence_score: f64,
}

/// Result of one clustering run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub articles_processed: usize,
    pub clusters_created: usize,
}

/// A persisted cluster row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub fact_core: String,
    pub confidence_score: f64,
    pub created_at: String,
    pub article_count: i64,
}

/// A persisted cluster with its articles and a freshly computed bias distribution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterDetail {
    #[serde(flatten)]
    pub cluster: ClusterRecord,
    pub articles: Vec<ClusterMember>,
    pub bias_distribution: BiasDistribution,
}

/// An article in a cluster, with its membership score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterMember {
    #[serde(flatten)]
    pub article: Article,
    pub similarity_score: f64,
}
