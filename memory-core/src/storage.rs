//! The storage backend interface every persistence implementation
//! (file-tree, relational+vector, ...) satisfies.
//!
//! Keeping this interface narrow lets storage backends reach parity
//! without needing to implement every capability: a backend with no
//! native vector support can return an empty result set from
//! [`StorageBackend::search_by_vector`] instead of implementing a real
//! index, and callers that need to know which capabilities are native
//! can check [`StorageBackend::supports_vector_search`].

use async_trait::async_trait;

use crate::error::Result;
use crate::types::MemorySpace;

/// Persistence operations the orchestration, recall, and response agents
/// depend on. Implemented once per storage technology (a deterministic
/// file tree, a relational database with a vector extension, ...).
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read a category's current artifact content for a memory space.
    ///
    /// Returns `Ok(None)` if the category has never been written for
    /// this space, rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::StorageIoError`] on a backend I/O
    /// failure.
    async fn read(&self, space: &MemorySpace, category: &str) -> Result<Option<String>>;

    /// Overwrite a category's artifact content, replacing whatever was
    /// previously stored.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::StorageIoError`] on a backend I/O
    /// failure.
    async fn write(&self, space: &MemorySpace, category: &str, content: &str) -> Result<()>;

    /// Append content to a category's artifact, separated from existing
    /// content by a blank line. Equivalent to `write` when no content
    /// previously existed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::StorageIoError`] on a backend I/O
    /// failure.
    async fn append(&self, space: &MemorySpace, category: &str, content: &str) -> Result<()>;

    /// Whether a category has ever been written for this memory space.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::StorageIoError`] on a backend I/O
    /// failure.
    async fn exists(&self, space: &MemorySpace, category: &str) -> Result<bool>;

    /// List the category names with stored artifacts for a memory space.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::StorageIoError`] on a backend I/O
    /// failure.
    async fn list_categories(&self, space: &MemorySpace) -> Result<Vec<String>>;

    /// List every user id with at least one stored artifact under the
    /// given agent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::StorageIoError`] on a backend I/O
    /// failure.
    async fn list_users(&self, agent_id: &str) -> Result<Vec<String>>;

    /// Delete stored artifacts for a memory space: every category when
    /// `category` is `None`, or just the named category otherwise.
    /// Returns the number of artifacts actually deleted.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::StorageIoError`] on a backend I/O
    /// failure.
    async fn clear(&self, space: &MemorySpace, category: Option<&str>) -> Result<usize>;

    /// Persist an embedding vector for a category's current content, if
    /// the backend natively supports embedding storage. Backends without
    /// native support return `Ok(())` without persisting anything.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::StorageIoError`] on a backend I/O
    /// failure.
    async fn save_embedding(
        &self,
        space: &MemorySpace,
        category: &str,
        embedding: &[f32],
    ) -> Result<()>;

    /// Search persisted embeddings by cosine similarity to `query`,
    /// returning up to `limit` `(category, score)` pairs sorted by
    /// descending score. Backends without native vector search return an
    /// empty vector; callers fall back to the recall agent's in-memory
    /// multi-modal search in that case.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::StorageIoError`] on a backend I/O
    /// failure.
    async fn search_by_vector(
        &self,
        space: &MemorySpace,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<(String, f64)>>;

    /// Whether this backend implements native vector search rather than
    /// always returning an empty result from `search_by_vector`.
    fn supports_vector_search(&self) -> bool {
        false
    }
}

/// A minimal in-memory [`StorageBackend`], exported (but hidden from
/// docs) so both this crate's unit tests and the workspace's integration
/// tests can exercise the orchestration, recall, and response agents
/// without standing up a real backend.
#[doc(hidden)]
pub mod in_memory {
    use super::{MemorySpace, Result, StorageBackend};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// An in-memory, process-lifetime [`StorageBackend`] for tests.
    #[derive(Debug, Default)]
    pub struct InMemoryStorage {
        artifacts: Mutex<HashMap<(String, String, String), String>>,
    }

    impl InMemoryStorage {
        /// Build an empty in-memory storage backend.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    fn key(space: &MemorySpace, category: &str) -> (String, String, String) {
        (space.agent_id.clone(), space.user_id.clone(), category.to_string())
    }

    #[async_trait]
    impl StorageBackend for InMemoryStorage {
        async fn read(&self, space: &MemorySpace, category: &str) -> Result<Option<String>> {
            let artifacts = self.artifacts.lock().expect("lock poisoned");
            Ok(artifacts.get(&key(space, category)).cloned())
        }

        async fn write(&self, space: &MemorySpace, category: &str, content: &str) -> Result<()> {
            let mut artifacts = self.artifacts.lock().expect("lock poisoned");
            artifacts.insert(key(space, category), content.to_string());
            Ok(())
        }

        async fn append(&self, space: &MemorySpace, category: &str, content: &str) -> Result<()> {
            let mut artifacts = self.artifacts.lock().expect("lock poisoned");
            let entry = artifacts.entry(key(space, category)).or_default();
            if entry.is_empty() {
                *entry = content.to_string();
            } else {
                entry.push_str("\n\n");
                entry.push_str(content);
            }
            Ok(())
        }

        async fn exists(&self, space: &MemorySpace, category: &str) -> Result<bool> {
            let artifacts = self.artifacts.lock().expect("lock poisoned");
            Ok(artifacts.contains_key(&key(space, category)))
        }

        async fn list_categories(&self, space: &MemorySpace) -> Result<Vec<String>> {
            let artifacts = self.artifacts.lock().expect("lock poisoned");
            Ok(artifacts
                .keys()
                .filter(|(a, u, _)| a == &space.agent_id && u == &space.user_id)
                .map(|(_, _, c)| c.clone())
                .collect())
        }

        async fn list_users(&self, agent_id: &str) -> Result<Vec<String>> {
            let artifacts = self.artifacts.lock().expect("lock poisoned");
            let mut users: Vec<String> = artifacts
                .keys()
                .filter(|(a, _, _)| a == agent_id)
                .map(|(_, u, _)| u.clone())
                .collect();
            users.sort();
            users.dedup();
            Ok(users)
        }

        async fn clear(&self, space: &MemorySpace, category: Option<&str>) -> Result<usize> {
            let mut artifacts = self.artifacts.lock().expect("lock poisoned");
            let before = artifacts.len();
            artifacts.retain(|(a, u, c), _| {
                let in_space = a == &space.agent_id && u == &space.user_id;
                let in_scope = category.is_none_or(|wanted| c == wanted);
                !(in_space && in_scope)
            });
            Ok(before - artifacts.len())
        }

        async fn save_embedding(&self, _space: &MemorySpace, _category: &str, _embedding: &[f32]) -> Result<()> {
            Ok(())
        }

        async fn search_by_vector(&self, _space: &MemorySpace, _query: &[f32], _limit: usize) -> Result<Vec<(String, f64)>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let storage = InMemoryStorage::new();
        let space = MemorySpace::new("agent-1", "alice");
        storage.write(&space, "profile", "likes hiking").await.unwrap();
        let content = storage.read(&space, "profile").await.unwrap();
        assert_eq!(content.as_deref(), Some("likes hiking"));
    }

    #[tokio::test]
    async fn append_accumulates_with_blank_line_separator() {
        let storage = InMemoryStorage::new();
        let space = MemorySpace::new("agent-1", "alice");
        storage.append(&space, "event", "2026-07-01: hiked Yosemite").await.unwrap();
        storage.append(&space, "event", "2026-07-15: visited Seattle").await.unwrap();
        let content = storage.read(&space, "event").await.unwrap().unwrap();
        assert_eq!(content, "2026-07-01: hiked Yosemite\n\n2026-07-15: visited Seattle");
    }

    #[tokio::test]
    async fn clear_removes_only_the_target_space() {
        let storage = InMemoryStorage::new();
        let alice = MemorySpace::new("agent-1", "alice");
        let bob = MemorySpace::new("agent-1", "bob");
        storage.write(&alice, "profile", "alice data").await.unwrap();
        storage.write(&bob, "profile", "bob data").await.unwrap();
        let removed = storage.clear(&alice, None).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(storage.read(&alice, "profile").await.unwrap(), None);
        assert_eq!(storage.read(&bob, "profile").await.unwrap().as_deref(), Some("bob data"));
    }

    #[tokio::test]
    async fn clear_with_a_category_removes_only_that_category() {
        let storage = InMemoryStorage::new();
        let alice = MemorySpace::new("agent-1", "alice");
        storage.write(&alice, "profile", "alice data").await.unwrap();
        storage.write(&alice, "event", "alice events").await.unwrap();
        let removed = storage.clear(&alice, Some("profile")).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(storage.read(&alice, "profile").await.unwrap(), None);
        assert_eq!(storage.read(&alice, "event").await.unwrap().as_deref(), Some("alice events"));
    }
}
