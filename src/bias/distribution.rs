use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::article::{Article, BiasLabel};

/// Spread of bias labels across a set of articles.
///
/// Computed on every read and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasDistribution {
    pub counts: BTreeMap<BiasLabel, usize>,
    /// Share of `total` per label, one decimal place
    pub percentages: BTreeMap<BiasLabel, String>,
    /// Number of input articles, including ones with unrecognized labels
    pub total: usize,
    /// Normalized Shannon entropy in [0, 1], two decimal places
    pub diversity_score: f64,
}

/// Counts articles per bias label and scores how evenly they spread.
///
/// Articles whose source label is not one of the five known labels are not
/// counted under any label, but still contribute to `total`.
pub fn calculate_bias_distribution(articles: &[Article]) -> BiasDistribution {
    let mut counts: BTreeMap<BiasLabel, usize> =
        BiasLabel::ALL.iter().map(|label| (*label, 0)).collect();

    for article in articles {
        if let Some(label) = article.bias_label() {
            *counts.entry(label).or_insert(0) += 1;
        }
    }

    let total = articles.len();
    let percentages = counts
        .iter()
        .map(|(label, &count)| {
            let pct = if total > 0 {
                // Half up, in integer tenths of a percent
                let tenths = (count * 1000 + total / 2) / total;
                format!("{}.{}", tenths / 10, tenths % 10)
            } else {
                "0.0".to_string()
            };
            (*label, pct)
        })
        .collect();

    let diversity_score = diversity_score(&counts, total);

    BiasDistribution {
        counts,
        percentages,
        total,
        diversity_score,
    }
}

/// Shannon entropy of the observed labels, normalized by `log2(5)`.
pub fn diversity_score(counts: &BTreeMap<BiasLabel, usize>, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }

    let entropy: f64 = counts
        .values()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total as f64;
            -p * p.log2()
        })
        .sum();

    let max_entropy = (BiasLabel::ALL.len() as f64).log2();
    round_to(entropy / max_entropy, 2)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article_with_bias(id: i64, bias: &str) -> Article {
        Article {
            id,
            title: format!("Story {}", id),
            excerpt: None,
            content: None,
            url: None,
            source_id: id,
            source_name: format!("Source {}", id),
            source_bias: bias.to_string(),
            source_bias_score: 0.0,
            published_at: None,
        }
    }

    #[test]
    fn test_mixed_distribution() {
        let articles: Vec<Article> = ["left", "left", "right", "center"]
            .iter()
            .enumerate()
            .map(|(i, bias)| article_with_bias(i as i64, bias))
            .collect();

        let dist = calculate_bias_distribution(&articles);

        assert_eq!(dist.counts[&BiasLabel::Left], 2);
        assert_eq!(dist.counts[&BiasLabel::CenterLeft], 0);
        assert_eq!(dist.counts[&BiasLabel::Center], 1);
        assert_eq!(dist.counts[&BiasLabel::CenterRight], 0);
        assert_eq!(dist.counts[&BiasLabel::Right], 1);

        assert_eq!(dist.percentages[&BiasLabel::Left], "50.0");
        assert_eq!(dist.percentages[&BiasLabel::CenterLeft], "0.0");
        assert_eq!(dist.percentages[&BiasLabel::Center], "25.0");
        assert_eq!(dist.percentages[&BiasLabel::CenterRight], "0.0");
        assert_eq!(dist.percentages[&BiasLabel::Right], "25.0");

        assert!(dist.diversity_score > 0.0 && dist.diversity_score < 1.0);
        // 1.5 bits / log2(5)
        assert_eq!(dist.diversity_score, 0.65);
    }

    #[test]
    fn test_percentages_round_half_up() {
        let mut articles: Vec<Article> = (0..15).map(|i| article_with_bias(i, "center")).collect();
        articles.push(article_with_bias(15, "left"));
        let dist = calculate_bias_distribution(&articles);
        // 6.25 and 93.75
        assert_eq!(dist.percentages[&BiasLabel::Left], "6.3");
        assert_eq!(dist.percentages[&BiasLabel::Center], "93.8");

        let mut articles: Vec<Article> = (0..79).map(|i| article_with_bias(i, "center")).collect();
        articles.push(article_with_bias(79, "right"));
        let dist = calculate_bias_distribution(&articles);
        // 1.25 and 98.75
        assert_eq!(dist.percentages[&BiasLabel::Right], "1.3");
        assert_eq!(dist.percentages[&BiasLabel::Center], "98.8");
    }

    #[test]
    fn test_single_bias_has_zero_diversity() {
        for size in [1, 2, 7] {
            let articles: Vec<Article> =
                (0..size).map(|i| article_with_bias(i, "center-right")).collect();
            let dist = calculate_bias_distribution(&articles);
            assert_eq!(dist.diversity_score, 0.0);
            assert_eq!(dist.percentages[&BiasLabel::CenterRight], "100.0");
        }
    }

    #[test]
    fn test_empty_set() {
        let dist = calculate_bias_distribution(&[]);
        assert_eq!(dist.total, 0);
        assert!(dist.counts.values().all(|&c| c == 0));
        assert!(dist.percentages.values().all(|p| p == "0.0"));
        assert_eq!(dist.counts.len(), 5);
        assert_eq!(dist.diversity_score, 0.0);
    }

    #[test]
    fn test_even_spread_is_maximal() {
        let articles: Vec<Article> = BiasLabel::ALL
            .iter()
            .enumerate()
            .map(|(i, label)| article_with_bias(i as i64, label.as_str()))
            .collect();
        let dist = calculate_bias_distribution(&articles);
        assert_eq!(dist.diversity_score, 1.0);
    }

    #[test]
    fn test_unknown_labels_are_ignored() {
        let articles = vec![
            article_with_bias(1, "left"),
            article_with_bias(2, "satire"),
        ];
        let dist = calculate_bias_distribution(&articles);
        assert_eq!(dist.counts.values().sum::<usize>(), 1);
        assert_eq!(dist.total, 2);
        assert_eq!(dist.percentages[&BiasLabel::Left], "50.0");
    }

    #[test]
    fn test_serializes_with_kebab_case_keys() {
        let dist = calculate_bias_distribution(&[article_with_bias(1, "center-left")]);
        let json = serde_json::to_value(&dist).unwrap();
        assert_eq!(json["counts"]["center-left"], 1);
        assert_eq!(json["percentages"]["center-left"], "100.0");
    }
}
