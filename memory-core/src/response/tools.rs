//! The four stable tools the response agent exposes in tool-calling
//! mode.

use serde_json::json;

use crate::llm::ToolSchema;

/// Build the `answer_question` tool schema: asks a question, optionally
/// scoped to a set of users.
#[must_use]
pub fn answer_question_tool() -> ToolSchema {
    ToolSchema {
        name: "answer_question".to_string(),
        description: "Answer a question using retrieved memory context.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "question": { "type": "string" },
                "users": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["question"]
        }),
    }
}

/// Build the `get_user_profile` tool schema: fetches one user's stored
/// profile artifact.
#[must_use]
pub fn get_user_profile_tool() -> ToolSchema {
    ToolSchema {
        name: "get_user_profile".to_string(),
        description: "Fetch the stored profile for a specific user.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "user_id": { "type": "string" }
            },
            "required": ["user_id"]
        }),
    }
}

/// Build the `search_user_events` tool schema: searches a user's event
/// history for lines relevant to a query.
#[must_use]
pub fn search_user_events_tool() -> ToolSchema {
    ToolSchema {
        name: "search_user_events".to_string(),
        description: "Search a user's recorded events for lines relevant to a query.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "user_id": { "type": "string" },
                "query": { "type": "string" },
                "limit": { "type": "integer" }
            },
            "required": ["user_id", "query"]
        }),
    }
}

/// Build the `list_users` tool schema: lists every user id with stored
/// memory under an agent.
#[must_use]
pub fn list_users_tool() -> ToolSchema {
    ToolSchema {
        name: "list_users".to_string(),
        description: "List every user id with stored memory under an agent.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "agent_id": { "type": "string" }
            },
            "required": ["agent_id"]
        }),
    }
}

/// All four stable tool schemas, in a stable order.
#[must_use]
pub fn all_tools() -> Vec<ToolSchema> {
    vec![
        answer_question_tool(),
        get_user_profile_tool(),
        search_user_events_tool(),
        list_users_tool(),
    ]
}
