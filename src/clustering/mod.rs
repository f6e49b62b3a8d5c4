// Module declarations
pub mod builder;
pub mod config;
pub mod grouping;
pub mod kmeans;
pub mod metadata;
pub mod refine;
pub mod store;
pub mod types;

pub use types::*;

pub use builder::ClusterBuilder;
pub use config::{ClusteringConfig, RefinementMode};
pub use grouping::group_by_keywords;
pub use metadata::{
    build_cluster_draft, calculate_confidence_score, extract_fact_core, find_common_words,
    generate_cluster_summary, generate_cluster_title,
};
pub use refine::refine_cluster;
pub use store::{ArticleSource, ClusterSink};

/// Title overlap an article pair must exceed before the corpus similarity is checked
pub const TITLE_SIMILARITY_GATE: f64 = 0.3;

/// TF-IDF cosine similarity above which a gated pair is grouped
pub const CORPUS_SIMILARITY_THRESHOLD: f64 = 0.2;

/// Title overlap above which a gated pair is grouped regardless of corpus similarity
pub const STRONG_TITLE_SIMILARITY: f64 = 0.5;

/// Fixed value written to every membership row.
///
/// Membership similarity is not computed per article yet; see DESIGN.md.
pub const MEMBERSHIP_SIMILARITY_PLACEHOLDER: f64 = 0.8;

/// Upper bound on the number of subclusters a coarse cluster may split into
pub const MAX_SUBCLUSTERS: usize = 3;

/// Embeddings needed before a coarse cluster is considered for splitting
pub const MIN_EMBEDDINGS_FOR_REFINEMENT: usize = 3;
