//! The LLM client boundary. Only the trait and a deterministic mock ship
//! from this crate; concrete provider integrations are out of scope.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// One message in a chat-style LLM request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// `"system"`, `"user"`, or `"assistant"`.
    pub role: String,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// Build a user-role message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    /// Build a system-role message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }
}

/// A tool the LLM may choose to invoke instead of answering directly.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSchema {
    /// Stable tool identifier (e.g. `"answer_question"`).
    pub name: String,
    /// Human-readable description shown to the model.
    pub description: String,
    /// JSON Schema object describing the tool's arguments.
    pub parameters: Value,
}

/// A tool invocation the LLM chose to make instead of, or in addition to,
/// a direct textual reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Name of the invoked tool, matching a [`ToolSchema::name`].
    pub name: String,
    /// Arguments the model supplied, matching the tool's parameter
    /// schema.
    pub arguments: Value,
}

/// The result of one chat completion call: either free text, or one or
/// more tool calls the caller must execute and feed back.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmResponse {
    /// A direct textual answer.
    Text(String),
    /// One or more tool invocations.
    ToolCalls(Vec<ToolCall>),
}

/// The LLM boundary category agents and the response agent call through.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a direct textual completion for `messages`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::LlmCallFailed`] or
    /// [`crate::error::Error::LlmTimeout`].
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Generate a completion that may invoke one of `tools` instead of
    /// answering directly.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::LlmCallFailed`] or
    /// [`crate::error::Error::LlmTimeout`].
    async fn generate_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<LlmResponse>;
}

/// A deterministic mock implementation useful for tests: `generate`
/// returns a fixed canned response (or echoes the last user message if
/// none was configured), and `generate_with_tools` never calls a tool
/// unless told to.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    canned_text: Option<String>,
    canned_tool_calls: Option<Vec<ToolCall>>,
}

impl MockLlmClient {
    /// Build a mock that always returns `text` from `generate`.
    #[must_use]
    pub fn with_text(text: impl Into<String>) -> Self {
        Self { canned_text: Some(text.into()), canned_tool_calls: None }
    }

    /// Build a mock that always invokes `calls` from
    /// `generate_with_tools`.
    #[must_use]
    pub fn with_tool_calls(calls: Vec<ToolCall>) -> Self {
        Self { canned_text: None, canned_tool_calls: Some(calls) }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        if let Some(text) = &self.canned_text {
            return Ok(text.clone());
        }
        Ok(messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default())
    }

    async fn generate_with_tools(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolSchema],
    ) -> Result<LlmResponse> {
        if let Some(calls) = &self.canned_tool_calls {
            return Ok(LlmResponse::ToolCalls(calls.clone()));
        }
        Ok(LlmResponse::Text(self.generate(messages).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_echoes_last_user_message_by_default() {
        let mock = MockLlmClient::default();
        let messages = vec![ChatMessage::system("be terse"), ChatMessage::user("hello there")];
        let reply = mock.generate(&messages).await.unwrap();
        assert_eq!(reply, "hello there");
    }

    #[tokio::test]
    async fn mock_returns_canned_text() {
        let mock = MockLlmClient::with_text("canned");
        let reply = mock.generate(&[]).await.unwrap();
        assert_eq!(reply, "canned");
    }

    #[tokio::test]
    async fn mock_with_tool_calls_returns_them() {
        let call = ToolCall { name: "answer_question".into(), arguments: serde_json::json!({"question": "hi"}) };
        let mock = MockLlmClient::with_tool_calls(vec![call.clone()]);
        let response = mock.generate_with_tools(&[], &[]).await.unwrap();
        assert_eq!(response, LlmResponse::ToolCalls(vec![call]));
    }
}
