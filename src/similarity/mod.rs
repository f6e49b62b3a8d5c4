//! Lexical similarity between articles.
//!
//! Two measures are used by coarse grouping: word-set overlap of titles, and
//! cosine similarity of TF-IDF vectors built over a fixed corpus.

pub mod tfidf;
pub mod title;

pub use tfidf::TfIdfCorpus;
pub use title::title_similarity;

/// Stop words dropped from TF-IDF documents
pub(crate) const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "did", "do", "does", "for", "from", "had", "has", "have", "he",
    "her", "his", "how", "i", "if", "in", "into", "is", "it", "its", "more", "new", "no", "not",
    "of", "on", "or", "our", "out", "over", "said", "she", "so", "than", "that", "the", "their",
    "them", "then", "there", "these", "they", "this", "to", "up", "was", "we", "were", "what",
    "when", "which", "who", "will", "with", "would", "you",
];
