#![allow(clippy::expect_used)]

//! A relational, vector-capable storage backend for
//! `memory-orchestrator-core`, built on `libsql`.
//!
//! Every write to a category artifact is logged to a companion history
//! table (`CREATE`/`UPDATE`/`DELETE`/`EMBED`), and embeddings are stored
//! as JSON-encoded vectors alongside their artifact row so
//! [`SqlStorage::search_by_vector`] can rank stored categories by cosine
//! similarity without a native vector index.
//!
//! ```no_run
//! use memory_storage_sql::SqlStorage;
//!
//! # async fn run() -> memory_orchestrator_core::error::Result<()> {
//! let storage = SqlStorage::open("file:memory.db", "").await?;
//! # Ok(())
//! # }
//! ```

mod history;
mod schema;

use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Builder, Connection, Database};

pub use history::HistoryEvent;
use memory_orchestrator_core::embeddings::cosine_similarity;
use memory_orchestrator_core::error::{Error, Result};
use memory_orchestrator_core::storage::StorageBackend;
use memory_orchestrator_core::types::MemorySpace;

/// A [`StorageBackend`] implementation backed by a libSQL database,
/// either a local file or a remote Turso instance.
pub struct SqlStorage {
    db: Arc<Database>,
}

impl SqlStorage {
    /// Open a local or remote libSQL database and ensure its schema
    /// exists.
    ///
    /// `url` must start with `libsql://` (remote, requires a non-empty
    /// `token`), `file:` (local file), or `:memory:`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageIoError`] if the URL scheme is
    /// unsupported, the connection fails, or schema creation fails.
    pub async fn open(url: &str, token: &str) -> Result<Self> {
        let db = if let Some(remote_url) = url.strip_prefix("libsql://") {
            if token.trim().is_empty() {
                return Err(Error::StorageIoError(
                    "authentication token required for remote libsql connections".into(),
                ));
            }
            Builder::new_remote(format!("libsql://{remote_url}"), token.to_string())
                .build()
                .await
                .map_err(|e| Error::StorageIoError(format!("failed to connect: {e}")))?
        } else if let Some(path) = url.strip_prefix("file:") {
            Builder::new_local(path)
                .build()
                .await
                .map_err(|e| Error::StorageIoError(format!("failed to open {path}: {e}")))?
        } else if url == ":memory:" {
            Builder::new_local(":memory:")
                .build()
                .await
                .map_err(|e| Error::StorageIoError(format!("failed to open in-memory db: {e}")))?
        } else {
            return Err(Error::StorageIoError(format!(
                "unsupported database URL scheme: {url}"
            )));
        };

        let storage = Self { db: Arc::new(db) };
        let conn = storage.connect()?;
        schema::initialize(&conn).await?;
        Ok(storage)
    }

    fn connect(&self) -> Result<Connection> {
        self.db
            .connect()
            .map_err(|e| Error::StorageIoError(format!("failed to open connection: {e}")))
    }

    async fn record_history(&self, space: &MemorySpace, category: &str, event: HistoryEvent) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO memory_history (agent_id, user_id, category, event, recorded_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            libsql::params![
                space.agent_id.clone(),
                space.user_id.clone(),
                category.to_string(),
                event.to_string(),
                now_millis(),
            ],
        )
        .await
        .map_err(|e| Error::StorageIoError(format!("failed to record history: {e}")))?;
        Ok(())
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl StorageBackend for SqlStorage {
    async fn read(&self, space: &MemorySpace, category: &str) -> Result<Option<String>> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT content FROM memory_artifacts WHERE agent_id = ?1 AND user_id = ?2 AND category = ?3",
                libsql::params![space.agent_id.clone(), space.user_id.clone(), category.to_string()],
            )
            .await
            .map_err(|e| Error::StorageIoError(format!("failed to query artifact: {e}")))?;

        let Some(row) = rows.next().await.map_err(|e| Error::StorageIoError(e.to_string()))? else {
            return Ok(None);
        };
        let content: String = row.get(0).map_err(|e| Error::StorageIoError(e.to_string()))?;
        Ok(Some(content))
    }

    async fn write(&self, space: &MemorySpace, category: &str, content: &str) -> Result<()> {
        let existed = self.exists(space, category).await?;
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO memory_artifacts (agent_id, user_id, category, content, embedding, updated_at)
             VALUES (?1, ?2, ?3, ?4, NULL, ?5)
             ON CONFLICT (agent_id, user_id, category)
             DO UPDATE SET content = excluded.content, updated_at = excluded.updated_at",
            libsql::params![
                space.agent_id.clone(),
                space.user_id.clone(),
                category.to_string(),
                content.to_string(),
                now_millis(),
            ],
        )
        .await
        .map_err(|e| Error::StorageIoError(format!("failed to write artifact: {e}")))?;

        let event = if existed { HistoryEvent::Update } else { HistoryEvent::Create };
        self.record_history(space, category, event).await
    }

    async fn append(&self, space: &MemorySpace, category: &str, content: &str) -> Result<()> {
        let existing = self.read(space, category).await?;
        let merged = match existing {
            Some(current) if !current.is_empty() => format!("{current}\n\n{content}"),
            _ => content.to_string(),
        };
        self.write(space, category, &merged).await
    }

    async fn exists(&self, space: &MemorySpace, category: &str) -> Result<bool> {
        Ok(self.read(space, category).await?.is_some())
    }

    async fn list_categories(&self, space: &MemorySpace) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT category FROM memory_artifacts WHERE agent_id = ?1 AND user_id = ?2",
                libsql::params![space.agent_id.clone(), space.user_id.clone()],
            )
            .await
            .map_err(|e| Error::StorageIoError(format!("failed to list categories: {e}")))?;

        let mut categories = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::StorageIoError(e.to_string()))? {
            let category: String = row.get(0).map_err(|e| Error::StorageIoError(e.to_string()))?;
            categories.push(category);
        }
        Ok(categories)
    }

    async fn list_users(&self, agent_id: &str) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT DISTINCT user_id FROM memory_artifacts WHERE agent_id = ?1 ORDER BY user_id",
                libsql::params![agent_id.to_string()],
            )
            .await
            .map_err(|e| Error::StorageIoError(format!("failed to list users: {e}")))?;

        let mut users = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::StorageIoError(e.to_string()))? {
            let user: String = row.get(0).map_err(|e| Error::StorageIoError(e.to_string()))?;
            users.push(user);
        }
        Ok(users)
    }

    async fn clear(&self, space: &MemorySpace, category: Option<&str>) -> Result<usize> {
        let mut removed = 0;
        for stored_category in self.list_categories(space).await? {
            if category.is_some_and(|wanted| wanted != stored_category) {
                continue;
            }
            let conn = self.connect()?;
            conn.execute(
                "DELETE FROM memory_artifacts WHERE agent_id = ?1 AND user_id = ?2 AND category = ?3",
                libsql::params![space.agent_id.clone(), space.user_id.clone(), stored_category.clone()],
            )
            .await
            .map_err(|e| Error::StorageIoError(format!("failed to delete artifact: {e}")))?;
            self.record_history(space, &stored_category, HistoryEvent::Delete).await?;
            removed += 1;
        }
        Ok(removed)
    }

    async fn save_embedding(&self, space: &MemorySpace, category: &str, embedding: &[f32]) -> Result<()> {
        let encoded = serde_json::to_string(embedding)?;
        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE memory_artifacts SET embedding = ?1 WHERE agent_id = ?2 AND user_id = ?3 AND category = ?4",
                libsql::params![encoded, space.agent_id.clone(), space.user_id.clone(), category.to_string()],
            )
            .await
            .map_err(|e| Error::StorageIoError(format!("failed to save embedding: {e}")))?;

        if changed == 0 {
            return Err(Error::StorageIoError(format!(
                "cannot save embedding for '{category}': no artifact exists yet"
            )));
        }
        self.record_history(space, category, HistoryEvent::Embed).await
    }

    async fn search_by_vector(&self, space: &MemorySpace, query: &[f32], limit: usize) -> Result<Vec<(String, f64)>> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT category, embedding FROM memory_artifacts WHERE agent_id = ?1 AND user_id = ?2 AND embedding IS NOT NULL",
                libsql::params![space.agent_id.clone(), space.user_id.clone()],
            )
            .await
            .map_err(|e| Error::StorageIoError(format!("failed to search embeddings: {e}")))?;

        let mut scored = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::StorageIoError(e.to_string()))? {
            let category: String = row.get(0).map_err(|e| Error::StorageIoError(e.to_string()))?;
            let encoded: String = row.get(1).map_err(|e| Error::StorageIoError(e.to_string()))?;
            let vector: Vec<f32> = serde_json::from_str(&encoded)?;
            let score = cosine_similarity(query, &vector);
            scored.push((category, score));
        }

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    fn supports_vector_search(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_memory() -> SqlStorage {
        SqlStorage::open(":memory:", "").await.unwrap()
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let storage = open_memory().await;
        let space = MemorySpace::new("agent-1", "alice");
        storage.write(&space, "profile", "likes hiking").await.unwrap();
        assert_eq!(storage.read(&space, "profile").await.unwrap().as_deref(), Some("likes hiking"));
    }

    #[tokio::test]
    async fn append_accumulates_content() {
        let storage = open_memory().await;
        let space = MemorySpace::new("agent-1", "alice");
        storage.append(&space, "event", "first").await.unwrap();
        storage.append(&space, "event", "second").await.unwrap();
        assert_eq!(storage.read(&space, "event").await.unwrap().as_deref(), Some("first\n\nsecond"));
    }

    #[tokio::test]
    async fn save_embedding_requires_existing_artifact() {
        let storage = open_memory().await;
        let space = MemorySpace::new("agent-1", "alice");
        let err = storage.save_embedding(&space, "profile", &[1.0, 0.0]).await.unwrap_err();
        assert!(matches!(err, Error::StorageIoError(_)));
    }

    #[tokio::test]
    async fn search_by_vector_ranks_by_cosine_similarity() {
        let storage = open_memory().await;
        let space = MemorySpace::new("agent-1", "alice");
        storage.write(&space, "profile", "loves hiking").await.unwrap();
        storage.write(&space, "interests", "enjoys chess").await.unwrap();
        storage.save_embedding(&space, "profile", &[1.0, 0.0, 0.0]).await.unwrap();
        storage.save_embedding(&space, "interests", &[0.0, 1.0, 0.0]).await.unwrap();

        let results = storage.search_by_vector(&space, &[0.9, 0.1, 0.0], 5).await.unwrap();
        assert_eq!(results[0].0, "profile");
        assert!(storage.supports_vector_search());
    }

    #[tokio::test]
    async fn clear_removes_all_categories_for_the_space() {
        let storage = open_memory().await;
        let space = MemorySpace::new("agent-1", "alice");
        storage.write(&space, "profile", "a").await.unwrap();
        storage.write(&space, "event", "b").await.unwrap();
        let removed = storage.clear(&space, None).await.unwrap();
        assert_eq!(removed, 2);
        assert!(storage.list_categories(&space).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_with_a_category_removes_only_that_category() {
        let storage = open_memory().await;
        let space = MemorySpace::new("agent-1", "alice");
        storage.write(&space, "profile", "a").await.unwrap();
        storage.write(&space, "event", "b").await.unwrap();
        let removed = storage.clear(&space, Some("profile")).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(storage.list_categories(&space).await.unwrap(), vec!["event".to_string()]);
    }
}
