//! Core data model: memory spaces, categories, artifacts, and the shapes
//! that cross the recall/response boundary.

use serde::{Deserialize, Serialize};

/// Identifies a single agent's memory for a single end user. All storage
/// and recall operations are scoped to one `MemorySpace`; no category
/// artifact is ever shared across spaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemorySpace {
    /// Owning agent identifier.
    pub agent_id: String,
    /// End user identifier within that agent.
    pub user_id: String,
}

impl MemorySpace {
    /// Construct a memory space from an agent and user id.
    #[must_use]
    pub fn new(agent_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            user_id: user_id.into(),
        }
    }
}

/// Whether a category agent overwrites its stored artifact on every
/// ingestion or appends newly generated content to what is already there.
///
/// Resolved from the original implementation: `activity` and `profile`
/// use [`WritePolicy::Replace`]; `event`, `reminder`, `interests`,
/// `study`, and `important_event` use [`WritePolicy::Append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WritePolicy {
    /// The agent's freshly generated content replaces the stored artifact.
    Replace,
    /// The agent's freshly generated content is appended after the stored
    /// artifact, separated by a blank line.
    Append,
}

/// Static configuration for one memory category: its storage filename,
/// human description, dependency set, scheduling priority, and write
/// policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Stable category name used as a registry key (`"activity"`,
    /// `"profile"`, ...).
    pub name: String,
    /// Filename the category's artifact is stored under (e.g.
    /// `"profile.md"`).
    pub filename: String,
    /// Short human-readable description surfaced in prompts and tooling.
    pub description: String,
    /// Names of categories whose artifacts must be ingested first and
    /// are made available to this category's prompt.
    pub dependencies: Vec<String>,
    /// Higher values run earlier among categories with no outstanding
    /// dependencies.
    pub priority: i32,
    /// Name of the prompt template this category's agent renders.
    pub prompt_template_name: String,
    /// Overwrite vs. append semantics for this category's stored
    /// artifact.
    pub write_policy: WritePolicy,
}

/// A category's persisted content plus the bookkeeping storage backends
/// report alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryArtifact {
    /// Category this artifact belongs to.
    pub category: String,
    /// Current textual content.
    pub content: String,
    /// Last-modified timestamp, in UTC.
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// One turn of conversational input handed to the activity agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationInput {
    /// `"user"` or `"assistant"`.
    pub role: String,
    /// Turn content.
    pub content: String,
}

/// A cached embedding vector keyed by the text it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingCacheEntry {
    /// The embedded vector.
    pub vector: Vec<f32>,
    /// Name of the model that produced the vector, recorded so a model
    /// change can be detected and the cache invalidated.
    pub model_name: String,
}

/// Which of the three multi-modal search signals matched a
/// [`RetrievalResult`], and how strongly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RelevanceTier {
    /// Combined score at or above [`crate::constants::search::RELEVANCE_HIGH`].
    High,
    /// Combined score at or above [`crate::constants::search::RELEVANCE_MEDIUM`].
    Medium,
    /// Combined score below the medium tier but above the cutoff.
    Low,
}

/// One of the three scoring signals [`crate::recall::RecallAgent::search`]
/// combines. A caller may restrict a search to a subset, in which case the
/// disabled signals contribute nothing to the combined score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchMethod {
    /// Embedding cosine similarity.
    Semantic,
    /// BM25 lexical scoring.
    Bm25,
    /// Substring/Jaccard word-overlap scoring.
    String,
}

/// The full set of search methods, in a stable order.
#[must_use]
pub fn all_search_methods() -> Vec<SearchMethod> {
    vec![SearchMethod::Semantic, SearchMethod::Bm25, SearchMethod::String]
}

/// One line-level match returned by [`crate::recall::RecallAgent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Category the matching line came from.
    pub category: String,
    /// User the matching line's memory space belongs to.
    pub source_user: String,
    /// Zero-based index of `line` within its category artifact.
    pub line_index: usize,
    /// The matching line's full text.
    pub line: String,
    /// `line`, truncated to [`crate::constants::search::SNIPPET_MAX_CHARS`]
    /// with an ellipsis suffix for display, when it exceeds that length.
    pub snippet: String,
    /// Combined relevance score in `[0, 1]`.
    pub score: f64,
    /// Semantic (cosine similarity) component of the score.
    pub semantic_score: f64,
    /// BM25 component of the score.
    pub bm25_score: f64,
    /// Substring/Jaccard string-overlap component of the score.
    pub string_score: f64,
    /// Whether the query matched `line` verbatim (case-insensitive
    /// substring), triggering the exact-match boost.
    pub exact_match: bool,
    /// Which search methods contributed to `score` for this result.
    pub methods_used: Vec<SearchMethod>,
    /// Coarse relevance bucket derived from `score`.
    pub tier: RelevanceTier,
}

/// One step of a response agent's grounded-answer loop, recorded for
/// observability and for the dedup rules in
/// [`crate::response::ResponseAgent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaTrace {
    /// Zero-based iteration number.
    pub iteration: usize,
    /// The query considered at this step (the original question, or a
    /// refined follow-up query when a prior iteration was insufficient).
    pub question: String,
    /// Retrieved context accumulated through this step, deduplicated,
    /// verbatim.
    pub retrieved_context: Vec<RetrievalResult>,
    /// Whether the sufficiency judge considered `retrieved_context`
    /// grounded and complete enough to answer from.
    pub sufficient: bool,
    /// What the sufficiency judge reported as missing, when `sufficient`
    /// is `false`. Empty when sufficient.
    pub missing_info: String,
}
