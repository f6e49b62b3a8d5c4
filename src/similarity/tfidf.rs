use std::collections::{HashMap, HashSet};

use super::STOP_WORDS;

/// TF-IDF weights for a fixed, ordered corpus of documents.
///
/// Term weight is `tf * idf` with raw term counts for `tf` and
/// `idf = 1 + ln(N / (1 + df))`, where `N` is the corpus size and `df` the
/// number of documents containing the term. Every weight is positive.
#[derive(Debug, Clone)]
pub struct TfIdfCorpus {
    weights: Vec<HashMap<String, f64>>,
}

impl TfIdfCorpus {
    /// Builds the model over `documents`; document indices follow input order.
    pub fn build<S: AsRef<str>>(documents: &[S]) -> Self {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d.as_ref())).collect();

        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for tokens in &tokenized {
            let unique: HashSet<&str> = tokens.iter().map(|t| t.as_str()).collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let n = documents.len() as f64;
        let weights = tokenized
            .iter()
            .map(|tokens| {
                let mut tf: HashMap<&str, f64> = HashMap::new();
                for token in tokens {
                    *tf.entry(token.as_str()).or_insert(0.0) += 1.0;
                }
                tf.into_iter()
                    .map(|(term, count)| {
                        let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
                        let idf = 1.0 + (n / (1.0 + df)).ln();
                        (term.to_string(), count * idf)
                    })
                    .collect()
            })
            .collect();

        Self { weights }
    }

    /// Weight of `term` in document `index`, 0.0 when absent
    #[cfg(test)]
    fn weight(&self, index: usize, term: &str) -> f64 {
        self.weights
            .get(index)
            .and_then(|w| w.get(term))
            .copied()
            .unwrap_or(0.0)
    }

    /// Cosine similarity between the TF-IDF vectors of two documents.
    ///
    /// Returns 0.0 if either vector has zero norm or an index is out of range.
    pub fn similarity(&self, index_a: usize, index_b: usize) -> f64 {
        let (Some(a), Some(b)) = (self.weights.get(index_a), self.weights.get(index_b)) else {
            return 0.0;
        };

        let norm_a: f64 = a.values().map(|w| w * w).sum::<f64>().sqrt();
        let norm_b: f64 = b.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        // Terms missing from either side contribute nothing to the dot product
        let dot: f64 = a
            .iter()
            .filter_map(|(term, wa)| b.get(term).map(|wb| wa * wb))
            .sum();

        (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
    }
}

/// Lower-cases, splits on non-alphanumeric characters, and drops stop words.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .filter(|w| !STOP_WORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_documents_are_fully_similar() {
        let corpus = TfIdfCorpus::build(&[
            "senate passes climate bill",
            "senate passes climate bill",
            "storm floods coastal towns",
        ]);
        assert!((corpus.similarity(0, 1) - 1.0).abs() < 1e-9);
        assert_eq!(corpus.similarity(0, 2), 0.0);
    }

    #[test]
    fn test_similarity_is_symmetric_and_bounded() {
        let corpus = TfIdfCorpus::build(&[
            "fed raises interest rates again",
            "interest rates climb as fed acts",
            "local team wins championship",
        ]);
        let ab = corpus.similarity(0, 1);
        assert!(ab > 0.0 && ab < 1.0);
        assert!((ab - corpus.similarity(1, 0)).abs() < 1e-12);
    }

    #[test]
    fn test_rare_terms_weigh_more() {
        let corpus = TfIdfCorpus::build(&[
            "election results election",
            "election turnout",
            "election recount",
            "hurricane warning",
        ]);
        assert!(corpus.weight(1, "turnout") > corpus.weight(1, "election"));
        // Raw term frequency scales the weight
        assert!((corpus.weight(0, "election") - 2.0 * corpus.weight(1, "election")).abs() < 1e-12);
    }

    #[test]
    fn test_zero_norm_and_out_of_range() {
        let corpus = TfIdfCorpus::build(&["the and of", "budget talks stall"]);
        assert_eq!(corpus.similarity(0, 1), 0.0);
        assert_eq!(corpus.similarity(1, 5), 0.0);
        assert_eq!(corpus.weight(5, "budget"), 0.0);
    }

    #[test]
    fn test_stop_words_and_punctuation_removed() {
        let corpus = TfIdfCorpus::build(&["The budget, passed!", "budget passed"]);
        assert_eq!(corpus.weight(0, "the"), 0.0);
        assert!((corpus.similarity(0, 1) - 1.0).abs() < 1e-9);
    }
}
