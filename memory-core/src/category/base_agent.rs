//! The base category-agent contract: a single generic `process` routine
//! driven by a per-category [`CategoryAgentSpec`] rather than one
//! subclass per category.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::embeddings::{EmbeddingCache, EmbeddingProvider};
use crate::error::{Error, Result};
use crate::llm::{ChatMessage, LlmClient};
use crate::prompts::PromptTemplateStore;
use crate::storage::StorageBackend;
use crate::types::{Category, MemorySpace, WritePolicy};

/// Composition-over-inheritance interface a memory category plugs into
/// the base agent's `process` routine with. A category is fully
/// described by its static metadata plus how it turns inputs into a
/// prompt and how it turns a raw LLM completion into the content that
/// gets persisted — nothing else varies between categories.
pub trait CategoryAgentSpec: Send + Sync {
    /// Static configuration for this category.
    fn category_metadata(&self) -> &Category;

    /// Build the prompt variables this category's template needs, beyond
    /// the common `character_name` / `session_date` / `current_memory`
    /// variables the base agent always supplies.
    fn compose_prompt(
        &self,
        input_content: &str,
        dependency_content: &HashMap<String, String>,
    ) -> HashMap<String, String>;

    /// Turn the LLM's raw completion into the content that is persisted.
    /// The default implementation trims surrounding whitespace; a
    /// category agent with a structured output contract overrides this
    /// to parse and validate that structure.
    fn parse_output(&self, raw_llm_output: &str) -> Result<String> {
        Ok(raw_llm_output.trim().to_string())
    }
}

/// Outcome of one [`process`] call: the content that was generated and
/// persisted, or a note that persistence failed after a successful
/// generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Category name this outcome belongs to.
    pub category: String,
    /// The generated (and persisted) content.
    pub content: String,
    /// Whether embedding generation succeeded. A `false` here never
    /// fails the overall outcome — per the base agent contract, embedding
    /// failures are logged and swallowed.
    pub embedded: bool,
}

/// Run one category agent's full contract against a single memory space:
///
/// 1. Read the category's current stored artifact.
/// 2. Compose the prompt from the spec's category-specific variables plus
///    common ones (`character_name`, `session_date`, `current_memory`).
/// 3. Call the LLM to generate new content.
/// 4. Parse the output and persist it per the category's [`WritePolicy`].
/// 5. Best-effort generate and persist an embedding; failures here are
///    logged and swallowed rather than propagated.
///
/// # Errors
///
/// Returns [`Error::AgentGenerationFailed`] if prompt composition or LLM
/// generation fails, and [`Error::StoragePersistFailed`] if the generated
/// content cannot be written.
#[allow(clippy::too_many_arguments)]
pub async fn process(
    spec: &dyn CategoryAgentSpec,
    space: &MemorySpace,
    character_name: &str,
    session_date: &str,
    input_content: &str,
    dependency_content: &HashMap<String, String>,
    templates: &PromptTemplateStore,
    llm: &dyn LlmClient,
    storage: &dyn StorageBackend,
    embeddings: Option<(&dyn EmbeddingProvider, &EmbeddingCache)>,
) -> Result<ProcessOutcome> {
    let category = spec.category_metadata();
    let agent_name = format!("{}_agent", category.name);

    let current_memory = storage
        .read(space, &category.name)
        .await
        .map_err(|e| Error::AgentGenerationFailed {
            agent: agent_name.clone(),
            reason: format!("failed to read current memory: {e}"),
        })?
        .unwrap_or_default();

    let mut variables = spec.compose_prompt(input_content, dependency_content);
    variables.insert("character_name".to_string(), character_name.to_string());
    variables.insert("session_date".to_string(), session_date.to_string());
    variables.insert("current_memory".to_string(), current_memory.clone());
    variables.insert("input_content".to_string(), input_content.to_string());

    let prompt = templates
        .render(&category.prompt_template_name, &variables)
        .map_err(|e| Error::AgentGenerationFailed {
            agent: agent_name.clone(),
            reason: format!("prompt composition failed: {e}"),
        })?;

    let raw_output = llm
        .generate(&[ChatMessage::user(prompt)])
        .await
        .map_err(|e| Error::AgentGenerationFailed {
            agent: agent_name.clone(),
            reason: format!("LLM generation failed: {e}"),
        })?;

    let content = spec.parse_output(&raw_output).map_err(|e| Error::AgentGenerationFailed {
        agent: agent_name.clone(),
        reason: format!("output parsing failed: {e}"),
    })?;

    let persist_result = match category.write_policy {
        WritePolicy::Replace => storage.write(space, &category.name, &content).await,
        WritePolicy::Append => storage.append(space, &category.name, &content).await,
    };
    persist_result.map_err(|e| Error::StoragePersistFailed {
        category: category.name.clone(),
        reason: e.to_string(),
    })?;

    let embedded = if let Some((provider, cache)) = embeddings {
        match cache.get_or_compute(&content, provider).await {
            Ok(vector) => match storage.save_embedding(space, &category.name, &vector).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(agent = %agent_name, error = %e, "failed to persist embedding, continuing without it");
                    false
                }
            },
            Err(e) => {
                warn!(agent = %agent_name, error = %e, "embedding generation failed, continuing without it");
                false
            }
        }
    } else {
        false
    };

    info!(agent = %agent_name, user_id = %space.user_id, "successfully processed category");

    Ok(ProcessOutcome { category: category.name.clone(), content, embedded })
}
