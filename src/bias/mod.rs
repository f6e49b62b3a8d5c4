pub mod distribution;

pub use distribution::{calculate_bias_distribution, diversity_score, BiasDistribution};
