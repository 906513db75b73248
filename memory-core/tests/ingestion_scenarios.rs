//! End-to-end ingestion scenarios exercising the full orchestrator,
//! category registry, and storage backend together.

use memory_orchestrator_core::category::{standard_categories, ActivityDerivedSpec, ActivitySpec, CategoryAgentSpec};
use memory_orchestrator_core::llm::MockLlmClient;
use memory_orchestrator_core::orchestrator::MemoryOrchestrationAgent;
use memory_orchestrator_core::storage::in_memory::InMemoryStorage;
use memory_orchestrator_core::storage::StorageBackend;
use memory_orchestrator_core::types::{Category, ConversationInput, MemorySpace};

fn build_orchestrator() -> MemoryOrchestrationAgent {
    let mut orchestrator = MemoryOrchestrationAgent::new();
    for category in standard_categories() {
        let spec: Box<dyn CategoryAgentSpec> = if category.name == "activity" {
            Box::new(ActivitySpec(category.clone()))
        } else {
            Box::new(ActivityDerivedSpec(category.clone()))
        };
        let template = if category.name == "activity" {
            "Summarize this conversation for {character_name} on {session_date}: {input_content}".to_string()
        } else {
            "{character_name}'s {name} as of {session_date}, given activity: {activity}"
                .replace("{name}", &category.name)
        };
        orchestrator.register_agent(category, template, spec).unwrap();
    }
    orchestrator
}

#[tokio::test]
async fn fresh_ingestion_from_a_two_turn_conversation() {
    let orchestrator = build_orchestrator();
    let storage = InMemoryStorage::new();
    let llm = MockLlmClient::with_text(
        "Alex, a product manager, is learning Rust and discussed its memory safety guarantees.",
    );
    let space = MemorySpace::new("agent-1", "alex");
    let conversation = vec![
        ConversationInput { role: "user".into(), content: "I'm Alex, a product manager learning Rust".into() },
        ConversationInput {
            role: "assistant".into(),
            content: "Nice! Rust has great memory safety guarantees.".into(),
        },
    ];

    let report = orchestrator
        .ingest(&space, "Alex", "2026-08-01", &conversation, &llm, &storage, None)
        .await
        .unwrap();

    assert_eq!(report.processed.len(), 7);
    assert!(report.skipped.is_empty());
    assert!(report.failed.is_empty());

    let activity = storage.read(&space, "activity").await.unwrap().unwrap();
    assert!(activity.contains("Alex"));
    assert!(activity.contains("Rust"));

    for category in ["profile", "event", "reminder", "interests", "study", "important_event"] {
        assert!(storage.exists(&space, category).await.unwrap(), "{category} should exist after ingestion");
    }
}

#[tokio::test]
async fn dependency_isolation_lets_unrelated_categories_survive_a_failure() {
    let mut orchestrator = MemoryOrchestrationAgent::new();
    for category in standard_categories() {
        let spec: Box<dyn CategoryAgentSpec> = if category.name == "activity" {
            Box::new(ActivitySpec(category.clone()))
        } else {
            Box::new(ActivityDerivedSpec(category.clone()))
        };
        let template = format!("category={}: {{activity}}", category.name);
        orchestrator.register_agent(category, template, spec).unwrap();
    }
    // Register a custom category depending only on activity, with a
    // priority between profile (5) and event (4).
    let health = Category {
        name: "health".into(),
        filename: "health.md".into(),
        description: "health notes".into(),
        dependencies: vec!["activity".into()],
        priority: 6,
        prompt_template_name: "health".into(),
        write_policy: memory_orchestrator_core::types::WritePolicy::Append,
    };
    orchestrator
        .register_agent(health.clone(), "health: {activity}".to_string(), Box::new(ActivityDerivedSpec(health)))
        .unwrap();

    struct FailProfileLlm;
    #[async_trait::async_trait]
    impl memory_orchestrator_core::llm::LlmClient for FailProfileLlm {
        async fn generate(
            &self,
            messages: &[memory_orchestrator_core::llm::ChatMessage],
        ) -> memory_orchestrator_core::error::Result<String> {
            if messages.iter().any(|m| m.content.contains("category=profile")) {
                return Err(memory_orchestrator_core::error::Error::LlmCallFailed("injected failure".into()));
            }
            Ok("ok".to_string())
        }

        async fn generate_with_tools(
            &self,
            _messages: &[memory_orchestrator_core::llm::ChatMessage],
            _tools: &[memory_orchestrator_core::llm::ToolSchema],
        ) -> memory_orchestrator_core::error::Result<memory_orchestrator_core::llm::LlmResponse> {
            unimplemented!("not exercised in this scenario")
        }
    }

    let storage = InMemoryStorage::new();
    let llm = FailProfileLlm;
    let space = MemorySpace::new("agent-1", "alex");
    let conversation = vec![ConversationInput { role: "user".into(), content: "hi".into() }];

    let report = orchestrator.ingest(&space, "Alex", "2026-08-01", &conversation, &llm, &storage, None).await.unwrap();

    let order: Vec<&str> = report.processed.iter().map(|o| o.category.as_str()).collect();
    assert!(order.iter().position(|c| *c == "activity").unwrap() < order.iter().position(|c| *c == "health").unwrap());
    assert!(order.contains(&"health"));
    assert!(order.contains(&"event"));
    assert_eq!(report.failed.iter().map(|(c, _)| c.as_str()).collect::<Vec<_>>(), vec!["profile"]);
}
