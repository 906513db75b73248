//! A deterministic, ACID file-tree storage backend for
//! `memory-orchestrator-core`, backed by an embedded `redb` database.
//!
//! Conceptually this backend still honors the "file-tree" storage
//! contract the orchestration core's spec names: each artifact lives at
//! a deterministic logical path (`<agent_id>/<user_id>/<category>`) and
//! carries an mtime the caller can rely on, exactly as a real on-disk
//! tree would provide. `redb` is used instead of literal OS files so
//! writes are atomic and concurrent readers never observe a half-written
//! artifact — the behavioral contract spec.md describes, backed by a
//! single embedded database file rather than a directory of loose files.
//!
//! This backend does not persist embeddings: [`FileTreeStorage::save_embedding`]
//! is a no-op and [`FileTreeStorage::search_by_vector`] always returns an
//! empty result, matching the storage interface's documented
//! "no persisted embeddings" variant.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use memory_orchestrator_core::error::{Error, Result};
use memory_orchestrator_core::storage::StorageBackend;
use memory_orchestrator_core::types::MemorySpace;

const ARTIFACTS: TableDefinition<&str, &str> = TableDefinition::new("artifacts");

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArtifactRecord {
    content: String,
    updated_at_millis: i64,
}

fn artifact_path(space: &MemorySpace, category: &str) -> String {
    format!("{}/{}/{}", space.agent_id, space.user_id, category)
}

/// A [`StorageBackend`] implementation backed by an embedded `redb`
/// database file.
pub struct FileTreeStorage {
    db: Arc<Database>,
}

impl FileTreeStorage {
    /// Open (creating if necessary) a file-tree storage database at
    /// `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageIoError`] if the database cannot be
    /// opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path).map_err(|e| Error::StorageIoError(e.to_string()))?;
        Ok(Self { db: Arc::new(db) })
    }

    fn read_record(&self, key: &str) -> Result<Option<ArtifactRecord>> {
        let txn = self.db.begin_read().map_err(|e| Error::StorageIoError(e.to_string()))?;
        let table = match txn.open_table(ARTIFACTS) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(Error::StorageIoError(e.to_string())),
        };
        let Some(value) = table.get(key).map_err(|e| Error::StorageIoError(e.to_string()))? else {
            return Ok(None);
        };
        let record: ArtifactRecord =
            serde_json::from_str(value.value()).map_err(|e| Error::StorageIoError(e.to_string()))?;
        Ok(Some(record))
    }

    fn write_record(&self, key: &str, record: &ArtifactRecord) -> Result<()> {
        let serialized = serde_json::to_string(record)?;
        let txn = self.db.begin_write().map_err(|e| Error::StorageIoError(e.to_string()))?;
        {
            let mut table = txn.open_table(ARTIFACTS).map_err(|e| Error::StorageIoError(e.to_string()))?;
            table
                .insert(key, serialized.as_str())
                .map_err(|e| Error::StorageIoError(e.to_string()))?;
        }
        txn.commit().map_err(|e| Error::StorageIoError(e.to_string()))?;
        Ok(())
    }

    fn delete_record(&self, key: &str) -> Result<()> {
        let txn = self.db.begin_write().map_err(|e| Error::StorageIoError(e.to_string()))?;
        {
            match txn.open_table(ARTIFACTS) {
                Ok(mut table) => {
                    table.remove(key).map_err(|e| Error::StorageIoError(e.to_string()))?;
                }
                Err(redb::TableError::TableDoesNotExist(_)) => {}
                Err(e) => return Err(Error::StorageIoError(e.to_string())),
            }
        }
        txn.commit().map_err(|e| Error::StorageIoError(e.to_string()))?;
        Ok(())
    }

    fn list_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let txn = self.db.begin_read().map_err(|e| Error::StorageIoError(e.to_string()))?;
        let table = match txn.open_table(ARTIFACTS) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(Error::StorageIoError(e.to_string())),
        };
        let mut keys = Vec::new();
        for entry in table.iter().map_err(|e| Error::StorageIoError(e.to_string()))? {
            let (key, _) = entry.map_err(|e| Error::StorageIoError(e.to_string()))?;
            if key.value().starts_with(prefix) {
                keys.push(key.value().to_string());
            }
        }
        Ok(keys)
    }
}

#[async_trait]
impl StorageBackend for FileTreeStorage {
    async fn read(&self, space: &MemorySpace, category: &str) -> Result<Option<String>> {
        let key = artifact_path(space, category);
        Ok(self.read_record(&key)?.map(|r| r.content))
    }

    async fn write(&self, space: &MemorySpace, category: &str, content: &str) -> Result<()> {
        let key = artifact_path(space, category);
        let record = ArtifactRecord { content: content.to_string(), updated_at_millis: now_millis() };
        self.write_record(&key, &record)
    }

    async fn append(&self, space: &MemorySpace, category: &str, content: &str) -> Result<()> {
        let key = artifact_path(space, category);
        let existing = self.read_record(&key)?;
        let merged = match existing {
            Some(record) if !record.content.is_empty() => format!("{}\n\n{}", record.content, content),
            _ => content.to_string(),
        };
        let record = ArtifactRecord { content: merged, updated_at_millis: now_millis() };
        self.write_record(&key, &record)
    }

    async fn exists(&self, space: &MemorySpace, category: &str) -> Result<bool> {
        let key = artifact_path(space, category);
        Ok(self.read_record(&key)?.is_some())
    }

    async fn list_categories(&self, space: &MemorySpace) -> Result<Vec<String>> {
        let prefix = format!("{}/{}/", space.agent_id, space.user_id);
        let keys = self.list_keys_with_prefix(&prefix)?;
        Ok(keys.into_iter().filter_map(|k| k.strip_prefix(&prefix).map(str::to_string)).collect())
    }

    async fn list_users(&self, agent_id: &str) -> Result<Vec<String>> {
        let prefix = format!("{agent_id}/");
        let keys = self.list_keys_with_prefix(&prefix)?;
        let mut users: Vec<String> = keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .filter_map(|rest| rest.split('/').next().map(str::to_string))
            .collect();
        users.sort();
        users.dedup();
        Ok(users)
    }

    async fn clear(&self, space: &MemorySpace, category: Option<&str>) -> Result<usize> {
        let mut removed = 0;
        for stored_category in self.list_categories(space).await? {
            if category.is_some_and(|wanted| wanted != stored_category) {
                continue;
            }
            let key = artifact_path(space, &stored_category);
            self.delete_record(&key)?;
            removed += 1;
        }
        Ok(removed)
    }

    async fn save_embedding(&self, _space: &MemorySpace, _category: &str, _embedding: &[f32]) -> Result<()> {
        Ok(())
    }

    async fn search_by_vector(&self, _space: &MemorySpace, _query: &[f32], _limit: usize) -> Result<Vec<(String, f64)>> {
        Ok(Vec::new())
    }

    fn supports_vector_search(&self) -> bool {
        false
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (FileTreeStorage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileTreeStorage::open(dir.path().join("memory.redb")).unwrap();
        (storage, dir)
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let (storage, _dir) = open_temp();
        let space = MemorySpace::new("agent-1", "alice");
        storage.write(&space, "profile", "likes hiking").await.unwrap();
        assert_eq!(storage.read(&space, "profile").await.unwrap().as_deref(), Some("likes hiking"));
    }

    #[tokio::test]
    async fn append_accumulates_content() {
        let (storage, _dir) = open_temp();
        let space = MemorySpace::new("agent-1", "alice");
        storage.append(&space, "event", "first").await.unwrap();
        storage.append(&space, "event", "second").await.unwrap();
        assert_eq!(storage.read(&space, "event").await.unwrap().as_deref(), Some("first\n\nsecond"));
    }

    #[tokio::test]
    async fn list_categories_is_scoped_to_the_memory_space() {
        let (storage, _dir) = open_temp();
        let alice = MemorySpace::new("agent-1", "alice");
        let bob = MemorySpace::new("agent-1", "bob");
        storage.write(&alice, "profile", "a").await.unwrap();
        storage.write(&bob, "profile", "b").await.unwrap();
        let categories = storage.list_categories(&alice).await.unwrap();
        assert_eq!(categories, vec!["profile".to_string()]);
    }

    #[tokio::test]
    async fn clear_removes_only_target_space_artifacts() {
        let (storage, _dir) = open_temp();
        let alice = MemorySpace::new("agent-1", "alice");
        let bob = MemorySpace::new("agent-1", "bob");
        storage.write(&alice, "profile", "a").await.unwrap();
        storage.write(&bob, "profile", "b").await.unwrap();
        let removed = storage.clear(&alice, None).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(storage.read(&alice, "profile").await.unwrap(), None);
        assert_eq!(storage.read(&bob, "profile").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn clear_with_a_category_removes_only_that_category() {
        let (storage, _dir) = open_temp();
        let alice = MemorySpace::new("agent-1", "alice");
        storage.write(&alice, "profile", "a").await.unwrap();
        storage.write(&alice, "event", "e").await.unwrap();
        let removed = storage.clear(&alice, Some("profile")).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(storage.read(&alice, "profile").await.unwrap(), None);
        assert_eq!(storage.read(&alice, "event").await.unwrap().as_deref(), Some("e"));
    }

    #[tokio::test]
    async fn embeddings_are_not_persisted() {
        let (storage, _dir) = open_temp();
        let space = MemorySpace::new("agent-1", "alice");
        storage.save_embedding(&space, "profile", &[1.0, 2.0]).await.unwrap();
        let hits = storage.search_by_vector(&space, &[1.0, 2.0], 5).await.unwrap();
        assert!(hits.is_empty());
        assert!(!storage.supports_vector_search());
    }
}
