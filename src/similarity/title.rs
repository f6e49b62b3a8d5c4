use std::collections::HashSet;

fn word_set(title: &str) -> HashSet<String> {
    title
        .to_lowercase()
        .split_whitespace()
        .map(|w| w.to_string())
        .collect()
}

/// Jaccard similarity of the lower-cased, whitespace-split word sets of two titles.
///
/// Returns 0.0 when both titles are empty.
pub fn title_similarity(title_a: &str, title_b: &str) -> f64 {
    let words_a = word_set(title_a);
    let words_b = word_set(title_b);

    let union = words_a.union(&words_b).count();
    if union == 0 {
        return 0.0;
    }

    let intersection = words_a.intersection(&words_b).count();
    intersection as f64 / union as f64
}
