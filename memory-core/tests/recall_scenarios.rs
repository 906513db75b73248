//! End-to-end recall scenarios: multi-modal search ranking and document
//! import with category auto-detection.

use memory_orchestrator_core::embeddings::{EmbeddingProvider, MockEmbeddingProvider};
use memory_orchestrator_core::recall::{import_document, CancellationSignal, RecallAgent};
use memory_orchestrator_core::storage::in_memory::InMemoryStorage;
use memory_orchestrator_core::storage::StorageBackend;
use memory_orchestrator_core::types::MemorySpace;
use memory_orchestrator_core::{Category, WritePolicy};

/// An embedding provider that always returns the zero vector, so cosine
/// similarity contributes nothing to a ranking and BM25/string scores
/// alone decide it.
#[derive(Debug, Default)]
struct ZeroEmbeddingProvider;

#[async_trait::async_trait]
impl EmbeddingProvider for ZeroEmbeddingProvider {
    async fn embed_text(&self, _text: &str) -> memory_orchestrator_core::error::Result<Vec<f32>> {
        Ok(vec![0.0; 8])
    }

    fn embedding_dimension(&self) -> usize {
        8
    }

    fn model_name(&self) -> &str {
        "zero"
    }
}

#[tokio::test]
async fn multi_modal_search_ranks_the_matching_line_first() {
    let storage = InMemoryStorage::new();
    let space = MemorySpace::new("a1", "alice");
    storage
        .write(
            &space,
            "event",
            "Alice completed a 5-mile run\n\nAlice finished a machine learning course\n\nAlice had dinner with Bob",
        )
        .await
        .unwrap();

    let provider = ZeroEmbeddingProvider;
    let cache = memory_orchestrator_core::embeddings::EmbeddingCache::new(10);
    let agent = RecallAgent::new(&storage, &provider, &cache);
    let cancel = CancellationSignal::new();

    let results = agent.search(&space, "run", None, None, 10, 0.0, &cancel).await.unwrap();

    assert!(!results.is_empty());
    assert!(results[0].line.contains("run"));
    assert!(results.last().unwrap().line.contains("dinner"));
    for result in &results {
        assert!((0.0..=1.0).contains(&result.score));
    }
    assert!(results[0].score > results.last().unwrap().score);
}

#[tokio::test]
async fn document_import_with_auto_detected_category_is_searchable() {
    let storage = InMemoryStorage::new();
    let space = MemorySpace::new("a1", "alice");
    let categories = vec![
        Category {
            name: "profile".into(),
            filename: "profile.md".into(),
            description: String::new(),
            dependencies: vec![],
            priority: 5,
            prompt_template_name: "profile".into(),
            write_policy: WritePolicy::Replace,
        },
        Category {
            name: "event".into(),
            filename: "event.md".into(),
            description: String::new(),
            dependencies: vec![],
            priority: 4,
            prompt_template_name: "event".into(),
            write_policy: WritePolicy::Append,
        },
    ];

    let imported_at = chrono::DateTime::parse_from_rfc3339("2026-08-01T00:00:00Z").unwrap().with_timezone(&chrono::Utc);
    let imported = import_document("alice_profile_export.md", "# Alice\n- Loves hiking", &categories, None, imported_at);

    assert_eq!(imported.category, "profile");
    storage.write(&space, &imported.category, &imported.content).await.unwrap();

    let provider = MockEmbeddingProvider::default();
    let cache = memory_orchestrator_core::embeddings::EmbeddingCache::new(10);
    let agent = RecallAgent::new(&storage, &provider, &cache);
    let cancel = CancellationSignal::new();
    let results = agent.search(&space, "hiking", None, None, 5, 0.0, &cancel).await.unwrap();

    assert!(results.iter().any(|r| r.line.contains("hiking")));
}
