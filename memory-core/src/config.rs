//! Runtime configuration for the memory orchestration core.

use crate::constants::defaults;

/// Tunable parameters for the embedding cache, recall agent, and response
/// agent.
///
/// # Examples
///
/// ```
/// use memory_orchestrator_core::config::MemoryCoreConfig;
///
/// let config = MemoryCoreConfig {
///     embedding_cache_size: 2000,
///     default_recall_limit: 20,
///     max_response_iterations: 8,
///     semantic_cutoff: 0.15,
/// };
/// assert_eq!(config.embedding_cache_size, 2000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryCoreConfig {
    /// Maximum number of entries held in the embedding cache before the
    /// least-recently-used entry is evicted.
    pub embedding_cache_size: usize,
    /// Default number of results `RecallAgent::search` returns when the
    /// caller does not specify a limit.
    pub default_recall_limit: usize,
    /// Maximum number of tool-call / direct-mode iterations the response
    /// agent will run before it must answer with what it has gathered.
    pub max_response_iterations: usize,
    /// Minimum semantic similarity a candidate must clear to be considered
    /// at all, absent an explicit per-call override.
    pub semantic_cutoff: f64,
}

impl Default for MemoryCoreConfig {
    fn default() -> Self {
        Self {
            embedding_cache_size: defaults::DEFAULT_EMBEDDING_CACHE_SIZE,
            default_recall_limit: defaults::DEFAULT_RECALL_LIMIT,
            max_response_iterations: defaults::DEFAULT_MAX_ITERATIONS,
            semantic_cutoff: crate::constants::search::DEFAULT_SEMANTIC_CUTOFF,
        }
    }
}

impl MemoryCoreConfig {
    /// Build a configuration from `MEMORY_CORE_*` environment variables,
    /// falling back to [`MemoryCoreConfig::default`] for anything unset or
    /// unparseable. Invalid values are logged and ignored rather than
    /// treated as a hard failure, matching the rest of the crate's
    /// "never abort ingestion over a config typo" posture.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("MEMORY_CORE_EMBEDDING_CACHE_SIZE") {
            match raw.parse::<usize>() {
                Ok(size) if size > 0 => config.embedding_cache_size = size,
                _ => tracing::warn!(
                    value = %raw,
                    "invalid MEMORY_CORE_EMBEDDING_CACHE_SIZE, keeping default"
                ),
            }
        }

        if let Ok(raw) = std::env::var("MEMORY_CORE_DEFAULT_RECALL_LIMIT") {
            match raw.parse::<usize>() {
                Ok(limit) if limit > 0 => config.default_recall_limit = limit,
                _ => tracing::warn!(
                    value = %raw,
                    "invalid MEMORY_CORE_DEFAULT_RECALL_LIMIT, keeping default"
                ),
            }
        }

        if let Ok(raw) = std::env::var("MEMORY_CORE_MAX_RESPONSE_ITERATIONS") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => config.max_response_iterations = n,
                _ => tracing::warn!(
                    value = %raw,
                    "invalid MEMORY_CORE_MAX_RESPONSE_ITERATIONS, keeping default"
                ),
            }
        }

        if let Ok(raw) = std::env::var("MEMORY_CORE_SEMANTIC_CUTOFF") {
            match raw.parse::<f64>() {
                Ok(cutoff) => config.semantic_cutoff = cutoff.clamp(0.0, 1.0),
                Err(_) => tracing::warn!(
                    value = %raw,
                    "invalid MEMORY_CORE_SEMANTIC_CUTOFF, keeping default"
                ),
            }
        }

        config
    }
}
