//! Schema creation for the relational+vector storage backend.

use libsql::Connection;

use memory_orchestrator_core::error::{Error, Result};

const CREATE_ARTIFACTS: &str = r"
    CREATE TABLE IF NOT EXISTS memory_artifacts (
        agent_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        category TEXT NOT NULL,
        content TEXT NOT NULL,
        embedding TEXT,
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (agent_id, user_id, category)
    )
";

const CREATE_HISTORY: &str = r"
    CREATE TABLE IF NOT EXISTS memory_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        agent_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        category TEXT NOT NULL,
        event TEXT NOT NULL,
        recorded_at INTEGER NOT NULL
    )
";

const CREATE_HISTORY_INDEX: &str = r"
    CREATE INDEX IF NOT EXISTS memory_history_space_idx
    ON memory_history (agent_id, user_id, category)
";

/// Create the `memory_artifacts` and `memory_history` tables if they do
/// not already exist.
///
/// # Errors
///
/// Returns [`Error::StorageIoError`] if the schema statements fail.
pub async fn initialize(conn: &Connection) -> Result<()> {
    conn.execute(CREATE_ARTIFACTS, ())
        .await
        .map_err(|e| Error::StorageIoError(format!("failed to create memory_artifacts: {e}")))?;
    conn.execute(CREATE_HISTORY, ())
        .await
        .map_err(|e| Error::StorageIoError(format!("failed to create memory_history: {e}")))?;
    conn.execute(CREATE_HISTORY_INDEX, ())
        .await
        .map_err(|e| Error::StorageIoError(format!("failed to create memory_history index: {e}")))?;
    Ok(())
}
