pub mod article;
pub mod bias;
pub mod clustering;
pub mod db;
pub mod environment;
pub mod llm;
pub mod logging;
pub mod similarity;
pub mod vector;

pub const TARGET_LLM_REQUEST: &str = "llm_request";
pub const TARGET_DB: &str = "db_query";
pub const TARGET_CLUSTER: &str = "clustering";

pub use article::{Article, BiasLabel};
pub use clustering::{ClusterBuilder, ClusteringConfig, RunSummary};
