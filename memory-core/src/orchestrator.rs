//! The memory orchestration agent: runs every registered category agent
//! in dependency order for one ingestion call.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::category::{process, CategoryAgentSpec, CategoryRegistry, ProcessOutcome};
use crate::embeddings::{EmbeddingCache, EmbeddingProvider};
use crate::error::{Error, Result};
use crate::llm::LlmClient;
use crate::prompts::PromptTemplateStore;
use crate::storage::StorageBackend;
use crate::types::{Category, ConversationInput, MemorySpace};

/// Outcome of one [`MemoryOrchestrationAgent::ingest`] call: which
/// categories were successfully processed, and which were skipped
/// (because a dependency was unavailable) or failed outright.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionReport {
    /// Categories processed successfully, in execution order.
    pub processed: Vec<ProcessOutcome>,
    /// Categories skipped because a declared dependency had no content,
    /// paired with the dependency that was missing.
    pub skipped: Vec<(String, String)>,
    /// Categories whose agent ran but failed, paired with an error
    /// message. A failure here does not abort the run; later categories
    /// that do not depend on the failed one still execute.
    pub failed: Vec<(String, String)>,
}

fn render_conversation(conversation: &[ConversationInput]) -> String {
    conversation
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Orchestrates the full set of registered category agents for a single
/// memory space's ingestion run.
pub struct MemoryOrchestrationAgent {
    registry: CategoryRegistry,
    templates: PromptTemplateStore,
    specs: HashMap<String, Box<dyn CategoryAgentSpec>>,
}

impl Default for MemoryOrchestrationAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryOrchestrationAgent {
    /// Build an orchestrator with no categories registered yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: CategoryRegistry::new(),
            templates: PromptTemplateStore::new(),
            specs: HashMap::new(),
        }
    }

    /// Register a category agent: its static metadata, prompt template,
    /// and prompt-composition/output-parsing behavior.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CategoryConfigError`] if `category`'s
    /// configuration is invalid (see [`CategoryRegistry::register`]).
    pub fn register_agent(
        &mut self,
        category: Category,
        template: impl Into<String>,
        spec: Box<dyn CategoryAgentSpec>,
    ) -> Result<()> {
        self.templates.register(category.prompt_template_name.clone(), template);
        let name = category.name.clone();
        self.registry.register(category)?;
        self.specs.insert(name, spec);
        Ok(())
    }

    /// Access the registered categories' prompt template store, so a
    /// caller can inspect or override templates directly.
    #[must_use]
    pub fn templates(&self) -> &PromptTemplateStore {
        &self.templates
    }

    /// Access the category registry.
    #[must_use]
    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    /// Run every registered category agent for `space` in dependency
    /// order, feeding `conversation` to the `activity` category and each
    /// other category's already-produced or previously-stored dependency
    /// content.
    ///
    /// A category whose dependency has no content (neither freshly
    /// generated this run nor previously stored) is skipped rather than
    /// failing the run; a category whose agent errors is recorded in
    /// [`IngestionReport::failed`] and does not block unrelated
    /// categories from running.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CycleDetected`] if the registered categories'
    /// dependency graph is invalid.
    #[allow(clippy::too_many_arguments)]
    pub async fn ingest(
        &self,
        space: &MemorySpace,
        character_name: &str,
        session_date: &str,
        conversation: &[ConversationInput],
        llm: &dyn LlmClient,
        storage: &dyn StorageBackend,
        embeddings: Option<(&dyn EmbeddingProvider, &EmbeddingCache)>,
    ) -> Result<IngestionReport> {
        let order = self.registry.dependency_order()?;
        let raw_conversation = render_conversation(conversation);

        let mut report = IngestionReport::default();
        let mut produced: HashMap<String, String> = HashMap::new();

        for category in order {
            let Some(spec) = self.specs.get(category.name.as_str()) else {
                warn!(category = %category.name, "category registered without an agent spec, skipping");
                continue;
            };

            let mut dependency_content = HashMap::new();
            let mut missing_dependency = None;
            for dep in &category.dependencies {
                let content = match produced.get(dep) {
                    Some(content) => Some(content.clone()),
                    None => storage.read(space, dep).await?,
                };
                match content {
                    Some(content) => {
                        dependency_content.insert(dep.clone(), content);
                    }
                    None => {
                        missing_dependency = Some(dep.clone());
                        break;
                    }
                }
            }

            if let Some(dependency) = missing_dependency {
                warn!(category = %category.name, dependency = %dependency, "dependency unavailable, skipping category");
                report.skipped.push((category.name.clone(), dependency));
                continue;
            }

            let input_content = if category.name == "activity" { raw_conversation.as_str() } else { "" };

            match process(
                spec.as_ref(),
                space,
                character_name,
                session_date,
                input_content,
                &dependency_content,
                &self.templates,
                llm,
                storage,
                embeddings,
            )
            .await
            {
                Ok(outcome) => {
                    produced.insert(category.name.clone(), outcome.content.clone());
                    report.processed.push(outcome);
                }
                Err(e) => {
                    warn!(category = %category.name, error = %e, "category agent failed, continuing with remaining categories");
                    report.failed.push((category.name.clone(), e.to_string()));
                }
            }
        }

        info!(
            agent_id = %space.agent_id,
            user_id = %space.user_id,
            processed = report.processed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "ingestion run complete"
        );

        Ok(report)
    }
}

/// Convenience to fail fast on an explicitly-requested unknown category,
/// distinct from the lenient dependency-skip path `ingest` uses.
pub fn require_registered(report: &IngestionReport, category: &str) -> Result<()> {
    if report.processed.iter().any(|o| o.category == category) {
        Ok(())
    } else {
        Err(Error::UnknownCategory(category.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{standard_categories, ActivityDerivedSpec, ActivitySpec};
    use crate::llm::MockLlmClient;
    use crate::storage::in_memory::InMemoryStorage;

    fn build_orchestrator() -> MemoryOrchestrationAgent {
        let mut orchestrator = MemoryOrchestrationAgent::new();
        for category in standard_categories() {
            let spec: Box<dyn CategoryAgentSpec> = if category.name == "activity" {
                Box::new(ActivitySpec(category.clone()))
            } else {
                Box::new(ActivityDerivedSpec(category.clone()))
            };
            let template = if category.name == "activity" {
                "Summarize: {input_content}".to_string()
            } else {
                "Derive {character_name}'s {activity}".to_string()
            };
            orchestrator.register_agent(category, template, spec).unwrap();
        }
        orchestrator
    }

    #[tokio::test]
    async fn activity_runs_first_and_unblocks_dependents() {
        let orchestrator = build_orchestrator();
        let storage = InMemoryStorage::new();
        let llm = MockLlmClient::with_text("Alice hiked Yosemite on 2026-07-01.");
        let space = MemorySpace::new("agent-1", "alice");
        let conversation = vec![ConversationInput { role: "user".into(), content: "I hiked Yosemite yesterday".into() }];

        let report = orchestrator
            .ingest(&space, "Alice", "2026-07-01", &conversation, &llm, &storage, None)
            .await
            .unwrap();

        assert_eq!(report.processed.len(), 7);
        assert!(report.skipped.is_empty());
        assert_eq!(report.processed[0].category, "activity");
    }

    #[tokio::test]
    async fn dependency_unavailable_skips_only_the_dependent_category() {
        let mut orchestrator = MemoryOrchestrationAgent::new();
        // Register only `profile`, whose dependency `activity` was never
        // registered as a runnable agent, so dependency content can
        // never be produced.
        let profile = Category {
            name: "profile".into(),
            dependencies: vec!["activity".into()],
            ..standard_categories().into_iter().find(|c| c.name == "profile").unwrap()
        };
        orchestrator
            .register_agent(profile.clone(), "template {activity}", Box::new(ActivityDerivedSpec(profile)))
            .unwrap();
        // `activity` is registered in the dependency graph but given no
        // agent spec, so it can never produce content for `profile`.
        let activity_meta = standard_categories().into_iter().find(|c| c.name == "activity").unwrap();
        orchestrator.registry().register(activity_meta).unwrap();

        let storage = InMemoryStorage::new();
        let llm = MockLlmClient::with_text("irrelevant");
        let space = MemorySpace::new("agent-1", "alice");

        let report = orchestrator.ingest(&space, "Alice", "2026-07-01", &[], &llm, &storage, None).await.unwrap();
        assert!(report.processed.is_empty());
        assert_eq!(report.skipped, vec![("profile".to_string(), "activity".to_string())]);
    }
}
