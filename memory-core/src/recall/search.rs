//! Multi-modal line-level search: BM25 + Jaccard word-overlap "string"
//! search + semantic cosine similarity, combined into one weighted score.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::constants::search as weights;
use crate::types::{all_search_methods, RelevanceTier, RetrievalResult, SearchMethod};

/// One candidate line from a category artifact, ready to be scored
/// against a query.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Category the line came from.
    pub category: String,
    /// Zero-based index of `line` within its category artifact.
    pub line_index: usize,
    /// The line's text.
    pub line: String,
}

/// Lightweight lexical comparison between two pieces of text, attached to
/// each [`crate::recall::RecallAgent::find_similar`] hit alongside its
/// search scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalAnalysis {
    /// Words present in both texts, sorted.
    pub common_words: Vec<String>,
    /// Jaccard word-overlap ratio between the two texts.
    pub jaccard_similarity: f64,
    /// Ratio of the shorter text's word count to the longer's, in `(0, 1]`,
    /// or `0.0` if either text is empty.
    pub length_ratio: f64,
}

/// Compare `reference` against `candidate` word-by-word.
#[must_use]
pub fn lexical_analysis(reference: &str, candidate: &str) -> LexicalAnalysis {
    let a: HashSet<String> = tokenize(reference).into_iter().collect();
    let b: HashSet<String> = tokenize(candidate).into_iter().collect();

    let mut common_words: Vec<String> = a.intersection(&b).cloned().collect();
    common_words.sort();

    let union = a.union(&b).count();
    #[allow(clippy::cast_precision_loss)]
    let jaccard_similarity = if union == 0 { 0.0 } else { a.intersection(&b).count() as f64 / union as f64 };

    #[allow(clippy::cast_precision_loss)]
    let length_ratio = if a.is_empty() || b.is_empty() {
        0.0
    } else {
        let (shorter, longer) = if a.len() < b.len() { (a.len(), b.len()) } else { (b.len(), a.len()) };
        shorter as f64 / longer as f64
    };

    LexicalAnalysis { common_words, jaccard_similarity, length_ratio }
}

fn truncate_snippet(line: &str) -> String {
    if line.chars().count() <= weights::SNIPPET_MAX_CHARS {
        return line.to_string();
    }
    let truncated: String = line.chars().take(weights::SNIPPET_MAX_CHARS).collect();
    format!("{truncated}…")
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// BM25 score of `query` against `document`, given corpus-wide average
/// document length and per-term document frequencies.
#[must_use]
pub fn bm25_score(
    query_terms: &[String],
    document: &[String],
    doc_freq: &HashMap<String, usize>,
    total_docs: usize,
    avg_doc_len: f64,
) -> f64 {
    if document.is_empty() || total_docs == 0 {
        return 0.0;
    }
    let doc_len = document.len() as f64;
    let mut term_counts: HashMap<&str, usize> = HashMap::new();
    for term in document {
        *term_counts.entry(term.as_str()).or_insert(0) += 1;
    }

    let mut score = 0.0;
    for term in query_terms {
        let Some(&tf) = term_counts.get(term.as_str()) else { continue };
        let df = doc_freq.get(term).copied().unwrap_or(0);
        if df == 0 {
            continue;
        }
        #[allow(clippy::cast_precision_loss)]
        let idf = (((total_docs as f64 - df as f64 + 0.5) / (df as f64 + 0.5)) + 1.0).ln();
        let tf = tf as f64;
        let numerator = tf * (weights::BM25_K1 + 1.0);
        let denominator = tf + weights::BM25_K1 * (1.0 - weights::BM25_B + weights::BM25_B * (doc_len / avg_doc_len));
        score += idf * (numerator / denominator);
    }
    score
}

/// Whether `query` appears verbatim (case-insensitive substring) in
/// `line`. A non-empty query is required; an empty query never counts as
/// an exact match.
#[must_use]
pub fn is_exact_match(query: &str, line: &str) -> bool {
    !query.is_empty() && line.to_lowercase().contains(&query.to_lowercase())
}

/// The "string" search signal: `1.0` for a verbatim (case-insensitive)
/// substring match, else Jaccard word-overlap scaled by
/// [`weights::JACCARD_SCALE`] so it stays comparable to the other two
/// signals before the final weighted combination.
#[must_use]
pub fn string_score(query: &str, line: &str) -> f64 {
    if is_exact_match(query, line) {
        return 1.0;
    }

    let query_words: HashSet<String> = tokenize(query).into_iter().collect();
    let line_words: HashSet<String> = tokenize(line).into_iter().collect();
    if query_words.is_empty() || line_words.is_empty() {
        return 0.0;
    }
    let intersection = query_words.intersection(&line_words).count();
    let union = query_words.union(&line_words).count();
    if union == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let jaccard = intersection as f64 / union as f64;
    jaccard * weights::JACCARD_SCALE
}

fn relevance_tier(score: f64) -> RelevanceTier {
    if score >= weights::RELEVANCE_HIGH {
        RelevanceTier::High
    } else if score >= weights::RELEVANCE_MEDIUM {
        RelevanceTier::Medium
    } else {
        RelevanceTier::Low
    }
}

/// Split every category's content into non-empty lines, tagging each with
/// its source category and its index within that category's content.
#[must_use]
pub fn candidates_from_artifacts(artifacts: &HashMap<String, String>) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for (category, content) in artifacts {
        for (line_index, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                candidates.push(Candidate { category: category.clone(), line_index, line: trimmed.to_string() });
            }
        }
    }
    candidates
}

/// Combine the enabled signals into ranked [`RetrievalResult`]s, dropping
/// anything whose combined score is below `cutoff`.
///
/// `semantic_scores` must contain one entry per `candidates` element, in
/// the same order (the semantic signal requires an embedding provider the
/// caller has already invoked; this function only combines scores). A
/// method absent from `methods` contributes nothing to the combined score,
/// though its raw per-method value is still reported on the result.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn combine_scores(
    query: &str,
    candidates: &[Candidate],
    semantic_scores: &[f64],
    source_user: &str,
    methods: &[SearchMethod],
    cutoff: f64,
    limit: usize,
) -> Vec<RetrievalResult> {
    let query_terms = tokenize(query);
    let documents: Vec<Vec<String>> = candidates.iter().map(|c| tokenize(&c.line)).collect();
    let total_docs = documents.len();
    #[allow(clippy::cast_precision_loss)]
    let avg_doc_len = if total_docs == 0 {
        1.0
    } else {
        documents.iter().map(Vec::len).sum::<usize>() as f64 / total_docs as f64
    }
    .max(1.0);

    let mut doc_freq: HashMap<String, usize> = HashMap::new();
    for document in &documents {
        let unique: HashSet<&String> = document.iter().collect();
        for term in unique {
            *doc_freq.entry(term.clone()).or_insert(0) += 1;
        }
    }

    let semantic_enabled = methods.contains(&SearchMethod::Semantic);
    let bm25_enabled = methods.contains(&SearchMethod::Bm25);
    let string_enabled = methods.contains(&SearchMethod::String);
    let methods_used: Vec<SearchMethod> = methods.to_vec();

    let mut results: Vec<RetrievalResult> = candidates
        .iter()
        .zip(documents.iter())
        .zip(semantic_scores.iter())
        .map(|((candidate, document), &semantic_score)| {
            let bm25 = bm25_score(&query_terms, document, &doc_freq, total_docs, avg_doc_len);
            // BM25 is unbounded; squash to (0, 1) so it combines
            // sensibly with the other two normalized signals.
            let bm25_normalized = bm25 / (bm25 + 1.0);
            let string = string_score(query, &candidate.line);
            let exact_match = string_enabled && is_exact_match(query, &candidate.line);

            let mut combined = weights::WEIGHT_SEMANTIC * semantic_score * f64::from(semantic_enabled)
                + weights::WEIGHT_BM25 * bm25_normalized * f64::from(bm25_enabled)
                + weights::WEIGHT_STRING * string * f64::from(string_enabled);

            if exact_match {
                combined += (1.0 - combined).min(weights::EXACT_MATCH_BOOST_CAP);
            }

            RetrievalResult {
                category: candidate.category.clone(),
                source_user: source_user.to_string(),
                line_index: candidate.line_index,
                snippet: truncate_snippet(&candidate.line),
                line: candidate.line.clone(),
                score: combined,
                semantic_score,
                bm25_score: bm25_normalized,
                string_score: string,
                exact_match,
                methods_used: methods_used.clone(),
                tier: relevance_tier(combined),
            }
        })
        .filter(|r| r.score >= cutoff)
        .collect();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(limit);
    results
}
