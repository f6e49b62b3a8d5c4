use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::article::Article;
use crate::clustering::types::ClusterDraft;

const TITLE_STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "is", "are", "was", "were", "been", "be",
];

/// Words kept in a generated cluster title
const MAX_TITLE_WORDS: usize = 5;

/// Characters of the first article's title used when no common words are found
const FALLBACK_TITLE_CHARS: usize = 50;

const MIN_FACT_SENTENCE_CHARS: usize = 20;
const MAX_FACTS: usize = 3;

fn is_factual(sentence: &str) -> bool {
    static FACT_INDICATOR: OnceLock<Option<Regex>> = OnceLock::new();
    FACT_INDICATOR
        .get_or_init(|| {
            Regex::new(r"(?i)\d|%|percent|million|billion|thousand|according to|reported|announced")
                .ok()
        })
        .as_ref()
        .map_or(false, |re| re.is_match(sentence))
}

fn title_words(title: &str) -> Vec<String> {
    title
        .to_lowercase()
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                .collect::<String>()
        })
        .filter(|word| word.len() > 2 && !TITLE_STOP_WORDS.contains(&word.as_str()))
        .collect()
}

/// Words shared by at least `max(2, ceil(0.4 * titles.len()))` of the titles.
///
/// Words are lower-cased and stripped of anything but ASCII letters and
/// digits. Results are ordered by descending title count, ties in order of
/// first appearance.
pub fn find_common_words<S: AsRef<str>>(titles: &[S]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut first_seen: Vec<String> = Vec::new();

    for title in titles {
        let mut in_title = HashSet::new();
        for word in title_words(title.as_ref()) {
            if !in_title.insert(word.clone()) {
                continue;
            }
            match counts.get_mut(&word) {
                Some(count) => *count += 1,
                None => {
                    first_seen.push(word.clone());
                    counts.insert(word, 1);
                }
            }
        }
    }

    // ceil(0.4 * n) without floating point
    let threshold = ((2 * titles.len() + 4) / 5).max(2);

    let mut common: Vec<(String, usize)> = first_seen
        .into_iter()
        .filter_map(|word| {
            let count = counts.get(&word).copied().unwrap_or(0);
            (count >= threshold).then_some((word, count))
        })
        .collect();
    common.sort_by(|a, b| b.1.cmp(&a.1));

    common.into_iter().map(|(word, _)| word).collect()
}

/// Up to five common title words, or the truncated first title
pub fn generate_cluster_title(articles: &[Article]) -> String {
    let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
    let common = find_common_words(&titles);

    if !common.is_empty() {
        return common
            .into_iter()
            .take(MAX_TITLE_WORDS)
            .collect::<Vec<_>>()
            .join(" ");
    }

    let first = titles.first().copied().unwrap_or_default();
    let truncated: String = first.chars().take(FALLBACK_TITLE_CHARS).collect();
    format!("{}...", truncated)
}

pub fn generate_cluster_summary(articles: &[Article]) -> String {
    let sources: HashSet<&str> = articles.iter().map(|a| a.source_name.as_str()).collect();
    let biases: HashSet<&str> = articles.iter().map(|a| a.source_bias.as_str()).collect();

    format!(
        "Coverage from {} sources across {} perspectives.",
        sources.len(),
        biases.len()
    )
}

/// Up to three distinct factual-looking sentences from the excerpts, in scan order.
///
/// Excerpts are split on `.`; a sentence qualifies when it is longer than 20
/// characters and mentions a number, a percentage, a magnitude word, or a
/// reporting phrase.
pub fn extract_fact_core(articles: &[Article]) -> String {
    let mut facts: Vec<&str> = Vec::new();

    let sentences = articles
        .iter()
        .filter_map(|a| a.excerpt.as_deref())
        .flat_map(|excerpt| excerpt.split('.'));

    for sentence in sentences {
        if sentence.chars().count() <= MIN_FACT_SENTENCE_CHARS
            || !is_factual(sentence)
        {
            continue;
        }
        let fact = sentence.trim();
        if !facts.contains(&fact) {
            facts.push(fact);
            if facts.len() == MAX_FACTS {
                break;
            }
        }
    }

    facts.join(". ")
}

/// `0.3 * min(n/10, 1) + 0.3 * min(sources/5, 1) + 0.4 * min(biases/5, 1)`
///
/// Sources are counted by id and bias labels by their raw text.
pub fn calculate_confidence_score(articles: &[Article]) -> f64 {
    let article_factor = (articles.len() as f64 / 10.0).min(1.0);

    let sources: HashSet<i64> = articles.iter().map(|a| a.source_id).collect();
    let source_factor = (sources.len() as f64 / 5.0).min(1.0);

    let biases: HashSet<&str> = articles.iter().map(|a| a.source_bias.as_str()).collect();
    let bias_factor = (biases.len() as f64 / 5.0).min(1.0);

    article_factor * 0.3 + source_factor * 0.3 + bias_factor * 0.4
}

/// Derives all persisted metadata for one group of articles
pub fn build_cluster_draft(articles: &[Article]) -> ClusterDraft {
    ClusterDraft {
        title: generate_cluster_title(articles),
        summary: generate_cluster_summary(articles),
        fact_core: extract_fact_core(articles),
        confidence_score: calculate_confidence_score(articles),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: i64, source_id: i64, bias: &str, title: &str, excerpt: Option<&str>) -> Article {
        Article {
            id,
            title: title.to_string(),
            excerpt: excerpt.map(str::to_string),
            content: None,
            url: None,
            source_id,
            source_name: format!("Source {}", source_id),
            source_bias: bias.to_string(),
            source_bias_score: 0.0,
            published_at: None,
        }
    }

    #[test]
    fn test_common_words_in_senate_titles() {
        let titles = [
            "Senate Passes New Climate Bill",
            "Senate approves climate legislation",
            "New climate law passed by Senate",
        ];
        let common = find_common_words(&titles);
        assert_eq!(common, vec!["senate", "climate", "new"]);
    }

    #[test]
    fn test_common_words_counts_titles_not_repeats() {
        let titles = ["Rally rally rally downtown", "Quiet evening downtown"];
        assert_eq!(find_common_words(&titles), vec!["downtown"]);
    }

    #[test]
    fn test_common_words_threshold_grows_with_titles() {
        // Six titles need three mentions
        let titles = [
            "Storm hits coast",
            "Storm leaves damage",
            "Coast cleanup begins",
            "Markets rally",
            "Markets slide",
            "Election nears",
        ];
        assert!(find_common_words(&titles).is_empty());
    }

    #[test]
    fn test_common_words_strip_punctuation_and_short_words() {
        let titles = ["U.S. tariffs: what's next?", "New U.S. tariffs, explained"];
        assert_eq!(find_common_words(&titles), vec!["tariffs"]);
    }

    #[test]
    fn test_cluster_title_from_common_words() {
        let articles = vec![
            article(1, 1, "left", "Senate Passes New Climate Bill", None),
            article(2, 2, "right", "Senate approves climate legislation", None),
            article(3, 3, "center", "New climate law passed by Senate", None),
        ];
        let title = generate_cluster_title(&articles);
        assert!(title.contains("senate"));
        assert!(title.contains("climate"));
    }

    #[test]
    fn test_cluster_title_falls_back_to_first_title() {
        let long = "An extraordinarily long headline about an unusual event that keeps going";
        let articles = vec![
            article(1, 1, "left", long, None),
            article(2, 2, "right", "Something else entirely", None),
        ];
        let expected = format!("{}...", &long[..50]);
        assert_eq!(generate_cluster_title(&articles), expected);
    }

    #[test]
    fn test_summary_counts_sources_and_perspectives() {
        let articles = vec![
            article(1, 1, "left", "a", None),
            article(2, 1, "left", "b", None),
            article(3, 2, "right", "c", None),
        ];
        assert_eq!(
            generate_cluster_summary(&articles),
            "Coverage from 2 sources across 2 perspectives."
        );
    }

    #[test]
    fn test_fact_core_keeps_three_distinct_factual_sentences() {
        let articles = vec![
            article(
                1,
                1,
                "left",
                "t",
                Some("The bill allocates 370 billion dollars. Critics were unhappy about it. Short 5."),
            ),
            article(
                2,
                2,
                "right",
                "t",
                Some("The bill allocates 370 billion dollars. Turnout rose 12 percent statewide. Officials announced a review on Monday. Another 40 thousand jobs are expected"),
            ),
        ];
        assert_eq!(
            extract_fact_core(&articles),
            "The bill allocates 370 billion dollars. Turnout rose 12 percent statewide. Officials announced a review on Monday"
        );
    }

    #[test]
    fn test_fact_core_empty_without_excerpts() {
        let articles = vec![article(1, 1, "left", "t", None)];
        assert_eq!(extract_fact_core(&articles), "");
    }

    #[test]
    fn test_confidence_score() {
        let articles = vec![
            article(1, 1, "left", "a", None),
            article(2, 2, "right", "b", None),
        ];
        // 0.3 * 0.2 + 0.3 * 0.4 + 0.4 * 0.4
        assert!((calculate_confidence_score(&articles) - 0.34).abs() < 1e-9);

        let saturated: Vec<Article> = (0..12)
            .map(|i| {
                let bias = ["left", "center-left", "center", "center-right", "right"][i % 5];
                article(i as i64, i as i64, bias, "x", None)
            })
            .collect();
        assert!((calculate_confidence_score(&saturated) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_build_cluster_draft() {
        let articles = vec![
            article(1, 1, "left", "Senate Passes New Climate Bill", Some("The vote was 51 to 50 in the chamber.")),
            article(2, 2, "right", "Senate approves climate legislation", None),
        ];
        let draft = build_cluster_draft(&articles);
        assert_eq!(draft.title, "senate climate");
        assert_eq!(draft.summary, "Coverage from 2 sources across 2 perspectives.");
        assert_eq!(draft.fact_core, "The vote was 51 to 50 in the chamber");
        assert!(draft.confidence_score > 0.0 && draft.confidence_score <= 1.0);
    }
}
