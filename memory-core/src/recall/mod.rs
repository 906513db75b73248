//! The recall agent: multi-modal search across a memory space's stored
//! categories, plus similarity lookup and document import.

mod import;
mod search;

pub use import::{detect_category, import_directory, import_document, provenance_header, ImportFileReport, ImportedDocument};
pub use search::{bm25_score, candidates_from_artifacts, combine_scores, lexical_analysis, string_score, Candidate, LexicalAnalysis};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::embeddings::{EmbeddingCache, EmbeddingProvider};
use crate::error::{Error, Result};
use crate::storage::StorageBackend;
use crate::types::{all_search_methods, MemorySpace, RetrievalResult, SearchMethod};

/// A [`RetrievalResult`] paired with the lexical comparison between the
/// query text and the matching line, as returned by
/// [`RecallAgent::find_similar`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarMatch {
    /// The underlying search match.
    pub result: RetrievalResult,
    /// Word-overlap comparison between the query text and `result.line`.
    pub analysis: LexicalAnalysis,
}

/// A cooperative cancellation flag. Long-running recall or response
/// operations check this between iterations rather than being forcibly
/// preempted; callers set it from outside (e.g. on an HTTP client
/// disconnect) to request early exit.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal(Arc<AtomicBool>);

impl CancellationSignal {
    /// Build a signal that starts out not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::CancelledBySignal)
        } else {
            Ok(())
        }
    }
}

/// Performs multi-modal search and similarity lookups over a memory
/// space's stored category artifacts.
pub struct RecallAgent<'a> {
    storage: &'a dyn StorageBackend,
    provider: &'a dyn EmbeddingProvider,
    cache: &'a EmbeddingCache,
}

impl<'a> RecallAgent<'a> {
    /// Build a recall agent over the given storage backend, embedding
    /// provider, and embedding cache.
    #[must_use]
    pub fn new(storage: &'a dyn StorageBackend, provider: &'a dyn EmbeddingProvider, cache: &'a EmbeddingCache) -> Self {
        Self { storage, provider, cache }
    }

    async fn load_artifacts(
        &self,
        space: &MemorySpace,
        categories: Option<&[String]>,
    ) -> Result<HashMap<String, String>> {
        let stored = self.storage.list_categories(space).await?;
        let mut artifacts = HashMap::with_capacity(stored.len());
        for category in stored {
            if let Some(allowed) = categories {
                if !allowed.contains(&category) {
                    continue;
                }
            }
            if let Some(content) = self.storage.read(space, &category).await? {
                artifacts.insert(category, content);
            }
        }
        Ok(artifacts)
    }

    /// Search every stored category artifact in `space` for lines
    /// relevant to `query`, combining semantic similarity, BM25, and
    /// Jaccard string overlap into one ranked list.
    ///
    /// `categories` restricts the search to the named categories (all
    /// stored categories when `None`). `methods` restricts which of the
    /// three scoring signals are computed and combined (all three when
    /// `None`); the semantic signal is skipped entirely, including its
    /// embedding lookups, when it is not requested.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CancelledBySignal`] if `cancel` is set mid-search,
    /// and propagates storage or embedding errors.
    pub async fn search(
        &self,
        space: &MemorySpace,
        query: &str,
        categories: Option<&[String]>,
        methods: Option<&[SearchMethod]>,
        limit: usize,
        cutoff: f64,
        cancel: &CancellationSignal,
    ) -> Result<Vec<RetrievalResult>> {
        cancel.check()?;
        let owned_methods = all_search_methods();
        let methods = methods.unwrap_or(&owned_methods);
        let semantic_enabled = methods.contains(&SearchMethod::Semantic);

        let artifacts = self.load_artifacts(space, categories).await?;
        let candidates = candidates_from_artifacts(&artifacts);

        cancel.check()?;
        let query_embedding = if semantic_enabled {
            self.cache.get_or_compute(query, self.provider).await.ok()
        } else {
            None
        };

        let mut semantic_scores = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            cancel.check()?;
            let score = match &query_embedding {
                Some(query_vec) => {
                    let line_vec = self.cache.get_or_compute(&candidate.line, self.provider).await.ok();
                    line_vec.map_or(0.0, |v| self.provider.similarity(query_vec, &v))
                }
                None => 0.0,
            };
            semantic_scores.push(score);
        }

        cancel.check()?;
        Ok(combine_scores(query, &candidates, &semantic_scores, &space.user_id, methods, cutoff, limit))
    }

    /// Find lines across stored artifacts lexically similar to `text`,
    /// keeping only matches whose combined score meets `threshold`, and
    /// attach a lexical comparison between `text` and each matching line.
    ///
    /// # Errors
    ///
    /// Propagates the same errors as [`RecallAgent::search`].
    pub async fn find_similar(
        &self,
        space: &MemorySpace,
        text: &str,
        threshold: f64,
        limit: usize,
        cancel: &CancellationSignal,
    ) -> Result<Vec<SimilarMatch>> {
        let results = self.search(space, text, None, None, limit, threshold, cancel).await?;
        Ok(results
            .into_iter()
            .map(|result| {
                let analysis = lexical_analysis(text, &result.line);
                SimilarMatch { result, analysis }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;
    use crate::storage::in_memory::InMemoryStorage;

    async fn seeded_storage() -> InMemoryStorage {
        let storage = InMemoryStorage::new();
        let space = MemorySpace::new("agent-1", "alice");
        storage
            .write(
                &space,
                "event",
                "2026-07-01: Alice hiked in Yosemite National Park\n\
                 2026-07-15: Alice visited Seattle for a conference\n\
                 2026-07-20: Alice attended a birthday party",
            )
            .await
            .unwrap();
        storage
    }

    #[tokio::test]
    async fn search_ranks_exact_keyword_match_first() {
        let storage = seeded_storage().await;
        let provider = MockEmbeddingProvider::default();
        let cache = EmbeddingCache::new(100);
        let agent = RecallAgent::new(&storage, &provider, &cache);
        let space = MemorySpace::new("agent-1", "alice");
        let cancel = CancellationSignal::new();

        let results = agent.search(&space, "Yosemite", None, None, 5, 0.0, &cancel).await.unwrap();
        assert!(!results.is_empty());
        assert!(results[0].line.contains("Yosemite"));
        assert_eq!(results[0].source_user, "alice");
    }

    #[tokio::test]
    async fn search_respects_cancellation() {
        let storage = seeded_storage().await;
        let provider = MockEmbeddingProvider::default();
        let cache = EmbeddingCache::new(100);
        let agent = RecallAgent::new(&storage, &provider, &cache);
        let space = MemorySpace::new("agent-1", "alice");
        let cancel = CancellationSignal::new();
        cancel.cancel();

        let err = agent.search(&space, "Seattle", None, None, 5, 0.0, &cancel).await.unwrap_err();
        assert!(matches!(err, Error::CancelledBySignal));
    }

    #[tokio::test]
    async fn find_similar_returns_results_without_exact_match() {
        let storage = seeded_storage().await;
        let provider = MockEmbeddingProvider::default();
        let cache = EmbeddingCache::new(100);
        let agent = RecallAgent::new(&storage, &provider, &cache);
        let space = MemorySpace::new("agent-1", "alice");
        let cancel = CancellationSignal::new();

        let results = agent.find_similar(&space, "Alice conference trip", 0.0, 5, &cancel).await.unwrap();
        assert!(!results.is_empty());
        assert!(results[0].analysis.jaccard_similarity > 0.0);
    }

    #[tokio::test]
    async fn search_can_be_restricted_to_a_subset_of_categories() {
        let storage = seeded_storage().await;
        let space = MemorySpace::new("agent-1", "alice");
        storage.write(&space, "profile", "Alice enjoys Yosemite merchandise").await.unwrap();
        let provider = MockEmbeddingProvider::default();
        let cache = EmbeddingCache::new(100);
        let agent = RecallAgent::new(&storage, &provider, &cache);
        let cancel = CancellationSignal::new();

        let categories = vec!["event".to_string()];
        let results = agent.search(&space, "Yosemite", Some(&categories), None, 5, 0.0, &cancel).await.unwrap();
        assert!(results.iter().all(|r| r.category == "event"));
    }

    #[tokio::test]
    async fn search_with_only_bm25_skips_semantic_contribution() {
        let storage = seeded_storage().await;
        let provider = MockEmbeddingProvider::default();
        let cache = EmbeddingCache::new(100);
        let agent = RecallAgent::new(&storage, &provider, &cache);
        let space = MemorySpace::new("agent-1", "alice");
        let cancel = CancellationSignal::new();

        let methods = vec![SearchMethod::Bm25];
        let results = agent.search(&space, "Yosemite", None, Some(&methods), 5, 0.0, &cancel).await.unwrap();
        assert!(results.iter().all(|r| r.semantic_score == 0.0 || !r.methods_used.contains(&SearchMethod::Semantic)));
    }
}
