//! Error taxonomy for the memory orchestration core.

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the category registry, storage backends, embedding
/// client, and the orchestration/recall/response agents built on top of
/// them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A prompt template store was asked for a category name it has no
    /// template file for.
    #[error("no prompt template registered for category '{0}'")]
    TemplateNotFound(String),

    /// A category was registered with an invalid configuration (e.g. an
    /// empty filename, or a dependency on itself).
    #[error("invalid category configuration for '{0}': {1}")]
    CategoryConfigError(String, String),

    /// A caller referenced a category name that was never registered.
    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    /// The category dependency graph contains a cycle.
    #[error("dependency cycle detected among categories: {0:?}")]
    CycleDetected(Vec<String>),

    /// A storage backend's read/write/list primitive failed at the I/O
    /// layer (disk, network, or database driver).
    #[error("storage I/O failed: {0}")]
    StorageIoError(String),

    /// A category agent generated content but storage rejected the write.
    #[error("failed to persist category artifact for '{category}': {reason}")]
    StoragePersistFailed {
        /// Category whose artifact failed to persist.
        category: String,
        /// Underlying storage error message.
        reason: String,
    },

    /// Embedding generation for an artifact failed. Per the base agent
    /// contract this is swallowed and logged rather than propagated.
    #[error("embedding generation failed: {0}")]
    EmbeddingFailed(String),

    /// The LLM backing a category agent or the response agent returned an
    /// error.
    #[error("LLM call failed: {0}")]
    LlmCallFailed(String),

    /// The LLM call did not complete before the caller-supplied deadline.
    #[error("LLM call timed out")]
    LlmTimeout,

    /// A category agent's full `process()` contract failed (prompt
    /// composition, generation, or output parsing).
    #[error("agent '{agent}' failed to generate content: {reason}")]
    AgentGenerationFailed {
        /// Name of the failing category agent.
        agent: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// A category's declared dependency artifact could not be read during
    /// ingestion, so the category was skipped for this run.
    #[error("dependency '{dependency}' unavailable for category '{category}'")]
    DependencyUnavailable {
        /// Category whose ingestion step was skipped.
        category: String,
        /// The missing dependency category.
        dependency: String,
    },

    /// A long-running recall or response operation observed a cooperative
    /// cancellation signal and unwound before returning a result.
    #[error("operation cancelled by caller signal")]
    CancelledBySignal,

    /// An invariant the implementation relies on internally was violated.
    /// Seeing this surfaced indicates a bug rather than a caller error.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),

    /// JSON (de)serialization failure at a library boundary (tool-call
    /// arguments, sufficiency verdicts, ingestion reports).
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Filesystem I/O failure not already wrapped as [`Error::StorageIoError`].
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a caller can reasonably retry the operation that produced
    /// this error without changing its inputs.
    ///
    /// Configuration, schema, and cycle errors are not recoverable by
    /// retrying; transient I/O, embedding, and LLM failures are.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::TemplateNotFound(_)
            | Error::CategoryConfigError(_, _)
            | Error::UnknownCategory(_)
            | Error::CycleDetected(_)
            | Error::InternalInvariant(_)
            | Error::Serialization(_) => false,
            Error::StorageIoError(_)
            | Error::StoragePersistFailed { .. }
            | Error::EmbeddingFailed(_)
            | Error::LlmCallFailed(_)
            | Error::LlmTimeout
            | Error::AgentGenerationFailed { .. }
            | Error::DependencyUnavailable { .. }
            | Error::CancelledBySignal
            | Error::Io(_) => true,
        }
    }

    /// Whether this error should abort an entire ingestion run rather than
    /// only the category currently being processed.
    #[must_use]
    pub fn is_fatal_to_ingestion(&self) -> bool {
        matches!(
            self,
            Error::CycleDetected(_) | Error::InternalInvariant(_) | Error::CancelledBySignal
        )
    }
}
