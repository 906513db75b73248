//! Deduplicating retrieved or generated answer fragments across users.

use std::collections::HashSet;

use crate::types::RetrievalResult;

/// One piece of content attributed to a user, as collected during an
/// iterative response loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attributed {
    /// The user the content is about or came from.
    pub user: String,
    /// The content itself.
    pub content: String,
}

/// Remove duplicate entries, keyed by `(user, trimmed-lowercased
/// content)`. The first occurrence of each key is kept; later duplicates
/// are dropped, preserving overall order.
#[must_use]
pub fn dedup_by_user_and_content(items: Vec<Attributed>) -> Vec<Attributed> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert((item.user.clone(), item.content.trim().to_lowercase())))
        .collect()
}

/// Deduplicate accumulated search results across iterations and
/// candidate users by `(source_user, line)`, preserving the
/// highest-scoring occurrence of each and overall rank order.
///
/// Results are sorted by descending score before deduplication so that,
/// when the same line resurfaces from a later, lower-scoring query, the
/// earlier and stronger match is the one kept.
#[must_use]
pub fn dedup_retrieval_results(mut results: Vec<RetrievalResult>) -> Vec<RetrievalResult> {
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let attributed: Vec<Attributed> =
        results.iter().map(|r| Attributed { user: r.source_user.clone(), content: r.line.clone() }).collect();
    let kept = dedup_by_user_and_content(attributed);

    let mut remaining = results;
    kept.into_iter()
        .filter_map(|item| {
            let pos = remaining.iter().position(|r| {
                r.source_user == item.user && r.line.trim().to_lowercase() == item.content.trim().to_lowercase()
            })?;
            Some(remaining.remove(pos))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_exact_duplicate_after_trim_and_case_fold() {
        let items = vec![
            Attributed { user: "alice".into(), content: "Hiked Yosemite".into() },
            Attributed { user: "alice".into(), content: "  hiked yosemite  ".into() },
            Attributed { user: "bob".into(), content: "Hiked Yosemite".into() },
        ];
        let deduped = dedup_by_user_and_content(items);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].user, "alice");
        assert_eq!(deduped[1].user, "bob");
    }

    #[test]
    fn preserves_order_of_first_occurrence() {
        let items = vec![
            Attributed { user: "alice".into(), content: "first".into() },
            Attributed { user: "alice".into(), content: "second".into() },
            Attributed { user: "alice".into(), content: "first".into() },
        ];
        let deduped = dedup_by_user_and_content(items);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].content, "first");
        assert_eq!(deduped[1].content, "second");
    }

    fn result(source_user: &str, line: &str, score: f64) -> RetrievalResult {
        RetrievalResult {
            category: "event".to_string(),
            source_user: source_user.to_string(),
            line_index: 0,
            line: line.to_string(),
            snippet: line.to_string(),
            score,
            semantic_score: 0.0,
            bm25_score: 0.0,
            string_score: 0.0,
            exact_match: false,
            methods_used: Vec::new(),
            tier: crate::types::RelevanceTier::Low,
        }
    }

    #[test]
    fn dedup_retrieval_results_keeps_the_highest_scoring_duplicate() {
        let results = vec![
            result("alice", "Hiked Yosemite", 0.4),
            result("alice", "hiked yosemite", 0.9),
            result("bob", "Hiked Yosemite", 0.5),
        ];
        let deduped = dedup_retrieval_results(results);
        assert_eq!(deduped.len(), 2);
        assert!((deduped[0].score - 0.9).abs() < 1e-9);
        assert_eq!(deduped[0].source_user, "alice");
    }
}
