use serde::{Deserialize, Serialize};

use crate::environment::{get_env_var_or, get_env_var_parsed};
use crate::vector::DEFAULT_EMBEDDING_MODEL;

/// Whether coarse clusters are split further using embeddings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefinementMode {
    /// Lexical grouping only
    Lexical,
    /// Lexical grouping followed by embedding-based subclustering
    Semantic,
}

impl RefinementMode {
    /// `CONTENT_MODE=research` turns on semantic refinement
    pub fn from_content_mode(mode: &str) -> Self {
        if mode.trim().eq_ignore_ascii_case("research") {
            RefinementMode::Semantic
        } else {
            RefinementMode::Lexical
        }
    }

    pub fn is_semantic(&self) -> bool {
        matches!(self, RefinementMode::Semantic)
    }
}

/// Settings consumed by a clustering run. Owned by the caller, read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringConfig {
    pub min_cluster_size: usize,
    /// Number of most recent articles read per run
    pub window_size: i64,
    pub refinement: RefinementMode,
    pub embedding_model: String,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: 2,
            window_size: 200,
            refinement: RefinementMode::Lexical,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

impl ClusteringConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            // A cluster of one is never a cluster
            min_cluster_size: get_env_var_parsed("MIN_CLUSTER_SIZE", defaults.min_cluster_size)
                .max(2),
            window_size: get_env_var_parsed("CLUSTER_WINDOW", defaults.window_size).max(0),
            refinement: RefinementMode::from_content_mode(&get_env_var_or("CONTENT_MODE", "")),
            embedding_model: get_env_var_or("EMBEDDING_MODEL", &defaults.embedding_model),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_mode_parsing() {
        assert_eq!(
            RefinementMode::from_content_mode("research"),
            RefinementMode::Semantic
        );
        assert_eq!(
            RefinementMode::from_content_mode(" Research "),
            RefinementMode::Semantic
        );
        assert_eq!(
            RefinementMode::from_content_mode("headlines"),
            RefinementMode::Lexical
        );
        assert_eq!(RefinementMode::from_content_mode(""), RefinementMode::Lexical);
    }

    #[test]
    fn test_defaults() {
        let config = ClusteringConfig::default();
        assert_eq!(config.min_cluster_size, 2);
        assert_eq!(config.window_size, 200);
        assert!(!config.refinement.is_semantic());
    }
}
