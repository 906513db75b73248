//! Named magic numbers used across the orchestration, recall, and response
//! agents, centralized so tuning them does not require hunting through
//! the implementation.

/// BM25 and multi-modal search scoring constants.
pub mod search {
    /// BM25 term-frequency saturation parameter.
    pub const BM25_K1: f64 = 1.2;
    /// BM25 length-normalization parameter.
    pub const BM25_B: f64 = 0.75;

    /// Weight given to semantic (embedding cosine) similarity in the
    /// combined relevance score.
    pub const WEIGHT_SEMANTIC: f64 = 0.5;
    /// Weight given to BM25 score in the combined relevance score.
    pub const WEIGHT_BM25: f64 = 0.3;
    /// Weight given to substring/Jaccard string-overlap score in the
    /// combined relevance score.
    pub const WEIGHT_STRING: f64 = 0.2;

    /// Additive boost applied when the query appears verbatim
    /// (case-insensitive substring) in a candidate line, capped so the
    /// combined score never exceeds `1.0`.
    pub const EXACT_MATCH_BOOST_CAP: f64 = 0.2;

    /// Lower bound of the "high" relevance tier.
    pub const RELEVANCE_HIGH: f64 = 0.7;
    /// Lower bound of the "medium" relevance tier.
    pub const RELEVANCE_MEDIUM: f64 = 0.4;

    /// Default minimum semantic similarity below which a candidate is
    /// dropped, unless the caller supplies an explicit override.
    pub const DEFAULT_SEMANTIC_CUTOFF: f64 = 0.1;

    /// Weight applied to the Jaccard word-overlap component of the
    /// "string" search signal before it is combined.
    pub const JACCARD_SCALE: f64 = 0.8;

    /// Maximum character length of a [`crate::types::RetrievalResult`]
    /// display snippet before it is truncated with an ellipsis.
    pub const SNIPPET_MAX_CHARS: usize = 160;
}

/// Default values used by [`crate::config::MemoryCoreConfig`].
pub mod defaults {
    /// Default bounded embedding cache capacity (entries).
    pub const DEFAULT_EMBEDDING_CACHE_SIZE: usize = 1000;

    /// Default maximum number of results a recall query returns.
    pub const DEFAULT_RECALL_LIMIT: usize = 10;

    /// Default ceiling on response-agent tool-call/direct-mode iterations
    /// before the agent is forced to answer with what it has.
    pub const DEFAULT_MAX_ITERATIONS: usize = 5;

    /// Default embedding vector dimensionality assumed by the mock
    /// embedding provider and similarity tests.
    pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
}
