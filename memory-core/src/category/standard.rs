//! The seven standard memory categories and their prompt/output behavior.

use std::collections::HashMap;

use crate::category::base_agent::CategoryAgentSpec;
use crate::prompts::PromptTemplateStore;
use crate::types::{Category, WritePolicy};

fn category(
    name: &str,
    description: &str,
    dependencies: &[&str],
    priority: i32,
    write_policy: WritePolicy,
) -> Category {
    Category {
        name: name.to_string(),
        filename: format!("{name}.md"),
        description: description.to_string(),
        dependencies: dependencies.iter().map(|s| s.to_string()).collect(),
        priority,
        prompt_template_name: name.to_string(),
        write_policy,
    }
}

/// The seven standard categories, in the priority/dependency shape
/// confirmed against the original implementation: `activity` is the only
/// category with no dependencies and runs first; every other standard
/// category depends on `activity`.
#[must_use]
pub fn standard_categories() -> Vec<Category> {
    vec![
        category("activity", "raw-conversation-derived activity summary for this session", &[], 10, WritePolicy::Replace),
        category("profile", "stable facts about the user (preferences, traits, background)", &["activity"], 5, WritePolicy::Replace),
        category("event", "dated events the user participated in or mentioned", &["activity"], 4, WritePolicy::Append),
        category("reminder", "things the user asked to be reminded about", &["activity"], 3, WritePolicy::Append),
        category("interests", "topics and activities the user has shown interest in", &["activity"], 2, WritePolicy::Append),
        category("study", "learning goals and study progress the user has mentioned", &["activity"], 1, WritePolicy::Append),
        category("important_event", "events flagged as significant (deadlines, milestones, life events)", &["activity"], 2, WritePolicy::Append),
    ]
}

/// Register the default prompt templates for the seven standard
/// categories. Unknown placeholders degrade to an empty string rather
/// than failing, so a caller may freely register a narrower or wider set
/// of variables in a custom deployment.
pub fn register_default_templates(store: &PromptTemplateStore) {
    store.register(
        "activity",
        "Summarize the following conversation into a concise activity log entry for \
         {character_name} on {session_date}. Existing activity log:\n{current_memory}\n\n\
         Conversation:\n{input_content}\n\nReturn only the new activity summary.",
    );
    store.register(
        "profile",
        "Update the stable profile for {character_name} given today's activity summary. \
         Existing profile:\n{current_memory}\n\nToday's activity:\n{activity}\n\n\
         Return the complete updated profile.",
    );
    store.register(
        "event",
        "Extract any dated events {character_name} participated in or mentioned, from \
         today's activity summary. Existing events:\n{current_memory}\n\nToday's activity:\n\
         {activity}\n\nReturn only newly observed events, one per line, each starting with \
         the date.",
    );
    store.register(
        "reminder",
        "Extract anything {character_name} asked to be reminded about, from today's \
         activity summary. Existing reminders:\n{current_memory}\n\nToday's activity:\n\
         {activity}\n\nReturn only newly observed reminders, one per line.",
    );
    store.register(
        "interests",
        "Extract topics or activities {character_name} showed interest in, from today's \
         activity summary. Existing interests:\n{current_memory}\n\nToday's activity:\n\
         {activity}\n\nReturn only newly observed interests, one per line.",
    );
    store.register(
        "study",
        "Extract learning goals or study progress {character_name} mentioned, from today's \
         activity summary. Existing study notes:\n{current_memory}\n\nToday's activity:\n\
         {activity}\n\nReturn only newly observed study notes, one per line.",
    );
    store.register(
        "important_event",
        "Extract significant events (deadlines, milestones, life events) {character_name} \
         mentioned, from today's activity summary. Existing important events:\n\
         {current_memory}\n\nToday's activity:\n{activity}\n\nReturn only newly observed \
         important events, one per line.",
    );
}

/// [`CategoryAgentSpec`] for the `activity` category: the only category
/// whose `compose_prompt` consumes raw conversation rather than another
/// category's artifact.
pub struct ActivitySpec(pub Category);

impl CategoryAgentSpec for ActivitySpec {
    fn category_metadata(&self) -> &Category {
        &self.0
    }

    fn compose_prompt(&self, _input_content: &str, _dependency_content: &HashMap<String, String>) -> HashMap<String, String> {
        HashMap::new()
    }
}

/// [`CategoryAgentSpec`] shared by every category that depends only on
/// `activity`: `profile`, `event`, `reminder`, `interests`, `study`, and
/// `important_event` all compose their prompt the same way, differing
/// only in their category metadata and prompt template.
pub struct ActivityDerivedSpec(pub Category);

impl CategoryAgentSpec for ActivityDerivedSpec {
    fn category_metadata(&self) -> &Category {
        &self.0
    }

    fn compose_prompt(&self, _input_content: &str, dependency_content: &HashMap<String, String>) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert(
            "activity".to_string(),
            dependency_content.get("activity").cloned().unwrap_or_default(),
        );
        vars
    }
}
