use tracing::debug;

use crate::article::Article;
use crate::clustering::{CORPUS_SIMILARITY_THRESHOLD, STRONG_TITLE_SIMILARITY, TITLE_SIMILARITY_GATE};
use crate::similarity::{title_similarity, TfIdfCorpus};
use crate::TARGET_CLUSTER;

/// Groups articles by lexical similarity in a single greedy pass.
///
/// Articles are visited in input order. Each unclaimed article seeds a group
/// and claims every later unclaimed article whose title overlap exceeds
/// [`TITLE_SIMILARITY_GATE`] and which either shares enough TF-IDF weight with
/// the seed or has a title overlap above [`STRONG_TITLE_SIMILARITY`]. Groups
/// smaller than `min_cluster_size` are dropped and their members are not
/// offered to later seeds.
///
/// The result depends on input order.
///
/// # Returns
/// Groups of indices into `articles`, each in input order
pub fn group_indices_by_keywords(articles: &[Article], min_cluster_size: usize) -> Vec<Vec<usize>> {
    if articles.len() < 2 {
        return Vec::new();
    }

    let documents: Vec<String> = articles
        .iter()
        .map(|a| a.title_with_excerpt().to_lowercase())
        .collect();
    let corpus = TfIdfCorpus::build(&documents);

    let mut claimed = vec![false; articles.len()];
    let mut groups = Vec::new();

    for i in 0..articles.len() {
        if claimed[i] {
            continue;
        }

        let mut group = vec![i];
        claimed[i] = true;

        for j in 0..articles.len() {
            if claimed[j] {
                continue;
            }

            let title_sim = title_similarity(&articles[i].title, &articles[j].title);
            if title_sim <= TITLE_SIMILARITY_GATE {
                continue;
            }

            let corpus_sim = corpus.similarity(i, j);
            if corpus_sim > CORPUS_SIMILARITY_THRESHOLD || title_sim > STRONG_TITLE_SIMILARITY {
                debug!(
                    target: TARGET_CLUSTER,
                    "Grouping article {} with seed {} (title: {:.3}, corpus: {:.3})",
                    articles[j].id, articles[i].id, title_sim, corpus_sim
                );
                group.push(j);
                claimed[j] = true;
            }
        }

        if group.len() >= min_cluster_size {
            groups.push(group);
        }
    }

    groups
}

/// Same as [`group_indices_by_keywords`], returning the grouped articles
pub fn group_by_keywords(articles: &[Article], min_cluster_size: usize) -> Vec<Vec<Article>> {
    group_indices_by_keywords(articles, min_cluster_size)
        .into_iter()
        .map(|group| group.into_iter().map(|i| articles[i].clone()).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: i64, title: &str, excerpt: &str) -> Article {
        Article {
            id,
            title: title.to_string(),
            excerpt: Some(excerpt.to_string()),
            content: None,
            url: None,
            source_id: id,
            source_name: format!("Source {}", id),
            source_bias: "center".to_string(),
            source_bias_score: 0.0,
            published_at: None,
        }
    }

    #[test]
    fn test_related_titles_grouped_unrelated_dropped() {
        let articles = vec![
            article(1, "Senate passes sweeping climate bill", "Lawmakers voted on emissions."),
            article(2, "Senate passes sweeping climate bill today", "The vote came late."),
            article(3, "Senate passes sweeping climate bill after debate", "Debate lasted hours."),
            article(4, "Local bakery wins pastry award", "Croissants were praised."),
            article(5, "Quarterback injured during playoff game", "Team doctors assess knee."),
        ];

        let groups = group_indices_by_keywords(&articles, 2);
        assert_eq!(groups, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_fewer_than_two_articles() {
        assert!(group_by_keywords(&[], 2).is_empty());
        let single = vec![article(1, "Lone headline", "")];
        assert!(group_by_keywords(&single, 2).is_empty());
    }

    #[test]
    fn test_gate_blocks_weak_title_overlap() {
        // Same excerpt, but titles share one word out of eight
        let articles = vec![
            article(1, "Mayor unveils downtown transit plan", "Buses and trains expand."),
            article(2, "Mayor attends charity gala", "Buses and trains expand."),
        ];
        assert!(group_by_keywords(&articles, 2).is_empty());
    }

    #[test]
    fn test_corpus_similarity_admits_moderate_title_overlap() {
        // Title Jaccard is 3/7, between the gate and the strong threshold
        let articles = vec![
            article(1, "Wildfire forces evacuations near Denver", "Firefighters battle wildfire near Denver suburbs."),
            article(2, "Wildfire forces evacuations outside Boulder", "Wildfire near Denver and Boulder spreads."),
            article(3, "Stock markets close higher", "Investors cheered earnings."),
        ];
        let groups = group_indices_by_keywords(&articles, 2);
        assert_eq!(groups, vec![vec![0, 1]]);
    }

    #[test]
    fn test_claimed_articles_are_not_regrouped() {
        let articles = vec![
            article(1, "Central bank holds rates steady", ""),
            article(2, "Central bank holds rates steady again", ""),
            article(3, "Central bank holds rates steady again today", ""),
        ];
        let groups = group_by_keywords(&articles, 2);
        assert_eq!(groups.len(), 1);
        let ids: Vec<i64> = groups[0].iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_min_cluster_size_filters_groups() {
        let articles = vec![
            article(1, "Central bank holds rates steady", ""),
            article(2, "Central bank holds rates steady again", ""),
            article(3, "Storm batters northern coast", ""),
        ];
        assert!(group_by_keywords(&articles, 3).is_empty());
        assert_eq!(group_by_keywords(&articles, 2).len(), 1);
    }
}
