//! The response agent: iterative, grounded question answering over a
//! memory space, either by directly looping recall+generate or by
//! handing the LLM a fixed set of tools to call.

mod dedup;
mod sufficiency;
mod tools;

pub use dedup::{dedup_by_user_and_content, dedup_retrieval_results, Attributed};
pub use sufficiency::{parse_verdict, SufficiencyVerdict};
pub use tools::{all_tools, answer_question_tool, get_user_profile_tool, list_users_tool, search_user_events_tool};

use crate::llm::{ChatMessage, LlmClient, LlmResponse};
use crate::recall::{CancellationSignal, RecallAgent};
use crate::storage::StorageBackend;
use crate::types::{MemorySpace, QaTrace, RetrievalResult};

/// Final result of an [`ResponseAgent::answer_direct`] run: the
/// synthesized answer and the full trace of retrieval iterations that
/// produced the context it was drawn from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseOutcome {
    /// The final answer, synthesized once from the accumulated context
    /// after the iterative loop ends.
    pub answer: String,
    /// Every iteration's (possibly refined) query, accumulated
    /// deduplicated context, and sufficiency verdict, in order.
    pub trace: Vec<QaTrace>,
}

/// One tool invocation observed while answering in
/// [`ResponseAgent::answer_with_tools`] mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRecord {
    /// Zero-based iteration number.
    pub iteration: usize,
    /// Name of the tool the model called.
    pub tool_name: String,
    /// Arguments the model supplied.
    pub arguments: serde_json::Value,
    /// The tool's textual observation, fed back to the model.
    pub observation: String,
    /// Retrieval results the tool call produced, if any.
    pub retrieved_context: Vec<RetrievalResult>,
}

/// Final result of an [`ResponseAgent::answer_with_tools`] run.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    /// The model's final textual answer.
    pub answer: String,
    /// Every tool call observed before the model answered, in order.
    pub calls: Vec<ToolCallRecord>,
}

fn compose_context_block(context: &[RetrievalResult]) -> String {
    if context.is_empty() {
        "No relevant memory found.".to_string()
    } else {
        context
            .iter()
            .map(|r| format!("[{} / {}] {}", r.source_user, r.category, r.line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Compose the prompt asking the judge whether `context` is, by itself,
/// sufficient to answer `question` — no draft answer is generated first.
fn compose_judge_prompt(question: &str, context: &[RetrievalResult]) -> String {
    format!(
        "You are judging whether the retrieved context below is sufficient to answer \
         the question without further searching. Respond with JSON of the shape \
         {{\"sufficient\": bool, \"missing_info\": string, \"confidence\": number between 0 and 1}}.\n\n\
         Question: {question}\n\nContext:\n{}",
        compose_context_block(context)
    )
}

/// Compose the single, final-answer synthesis prompt run once after the
/// iterative loop ends, asking the model to reason inside `<thinking>`
/// before committing to a `<result>`.
fn compose_synthesis_prompt(question: &str, context: &[RetrievalResult]) -> String {
    format!(
        "Answer the question using only the context below. Reason about which context \
         items are relevant inside <thinking></thinking> tags, then give the final \
         answer inside <result></result> tags. If the context does not fully answer \
         the question, say what is missing inside <result>.\n\nContext:\n{}\n\nQuestion: {question}",
        compose_context_block(context)
    )
}

fn extract_tag(raw: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = raw.find(&open)? + open.len();
    let end = start + raw[start..].find(&close)?;
    Some(raw[start..end].trim().to_string())
}

/// Split a synthesis response into its `<thinking>` (discarded after
/// logging) and `<result>` (returned to the caller). Falls back to the
/// whole trimmed response when the model did not use the delimiters.
fn extract_thinking_and_result(raw: &str) -> (Option<String>, String) {
    let thinking = extract_tag(raw, "thinking");
    let result = extract_tag(raw, "result").unwrap_or_else(|| raw.trim().to_string());
    (thinking, result)
}

/// Refine the original question with what the judge reported missing, to
/// drive the next retrieval iteration.
fn propose_followup_query(question: &str, missing_info: &str) -> String {
    if missing_info.is_empty() {
        question.to_string()
    } else {
        format!("{question} ({missing_info})")
    }
}

/// Runs the iterative "direct" and tool-calling response modes against a
/// memory space.
pub struct ResponseAgent<'a> {
    recall: RecallAgent<'a>,
    llm: &'a dyn LlmClient,
    judge: &'a dyn LlmClient,
}

impl<'a> ResponseAgent<'a> {
    /// Build a response agent. `judge` may be the same client as `llm`
    /// (a single model judging its own retrieved context) or a distinct,
    /// typically cheaper, model dedicated to sufficiency checks.
    #[must_use]
    pub fn new(recall: RecallAgent<'a>, llm: &'a dyn LlmClient, judge: &'a dyn LlmClient) -> Self {
        Self { recall, llm, judge }
    }

    /// Answer `question` by iteratively retrieving context — across
    /// `space` alone, or across one candidate space per entry in `users`
    /// when supplied — judging whether the accumulated, deduplicated
    /// context (not a generated draft answer) is sufficient, and
    /// refining the query with what the judge reports missing when it is
    /// not. Stops at the first sufficient verdict or after
    /// `max_iterations`, whichever comes first, then performs one final
    /// answer synthesis over everything retrieved.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::CancelledBySignal`] if `cancel` is
    /// set mid-loop, and propagates recall/LLM errors.
    pub async fn answer_direct(
        &self,
        space: &MemorySpace,
        question: &str,
        users: Option<&[String]>,
        max_iterations: usize,
        semantic_cutoff: f64,
        cancel: &CancellationSignal,
    ) -> crate::error::Result<ResponseOutcome> {
        let mut trace = Vec::new();
        let mut accumulated: Vec<RetrievalResult> = Vec::new();
        let mut current_question = question.to_string();

        for iteration in 0..max_iterations.max(1) {
            if cancel.is_cancelled() {
                return Err(crate::error::Error::CancelledBySignal);
            }

            let candidate_spaces: Vec<MemorySpace> = match users {
                Some(user_ids) if !user_ids.is_empty() => {
                    user_ids.iter().map(|user_id| MemorySpace::new(space.agent_id.clone(), user_id.clone())).collect()
                }
                _ => vec![space.clone()],
            };

            let mut fresh = Vec::new();
            for candidate_space in &candidate_spaces {
                let results = self.recall.search(candidate_space, &current_question, None, None, 10, semantic_cutoff, cancel).await?;
                fresh.extend(results);
            }
            accumulated.extend(fresh);
            accumulated = dedup_retrieval_results(accumulated);

            let judge_prompt = compose_judge_prompt(&current_question, &accumulated);
            let judge_raw = self.judge.generate(&[ChatMessage::user(judge_prompt)]).await?;
            let verdict = parse_verdict(&judge_raw);

            trace.push(QaTrace {
                iteration,
                question: current_question.clone(),
                retrieved_context: accumulated.clone(),
                sufficient: verdict.sufficient,
                missing_info: verdict.missing_info.clone(),
            });

            if verdict.sufficient {
                break;
            }

            current_question = propose_followup_query(question, &verdict.missing_info);
        }

        let synthesis_prompt = compose_synthesis_prompt(question, &accumulated);
        let raw = self.llm.generate(&[ChatMessage::user(synthesis_prompt)]).await?;
        let (_thinking, answer) = extract_thinking_and_result(&raw);

        Ok(ResponseOutcome { answer, trace })
    }

    /// Answer `question` by offering the LLM the four stable tools and
    /// executing whatever it calls, feeding results back until it
    /// returns a direct textual answer or `max_iterations` is reached.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::CancelledBySignal`] if `cancel` is
    /// set mid-loop, and propagates recall/storage/LLM errors.
    pub async fn answer_with_tools(
        &self,
        space: &MemorySpace,
        storage: &dyn StorageBackend,
        question: &str,
        max_iterations: usize,
        semantic_cutoff: f64,
        cancel: &CancellationSignal,
    ) -> crate::error::Result<ToolOutcome> {
        let schemas = all_tools();
        let mut messages = vec![ChatMessage::user(question.to_string())];
        let mut calls_seen = Vec::new();

        for iteration in 0..max_iterations.max(1) {
            if cancel.is_cancelled() {
                return Err(crate::error::Error::CancelledBySignal);
            }

            match self.llm.generate_with_tools(&messages, &schemas).await? {
                LlmResponse::Text(answer) => {
                    return Ok(ToolOutcome { answer, calls: calls_seen });
                }
                LlmResponse::ToolCalls(calls) => {
                    for call in calls {
                        let (context, observation) = self.execute_tool(space, storage, &call, semantic_cutoff, cancel).await?;
                        calls_seen.push(ToolCallRecord {
                            iteration,
                            tool_name: call.name.clone(),
                            arguments: call.arguments.clone(),
                            observation: observation.clone(),
                            retrieved_context: context,
                        });
                        messages.push(ChatMessage::system(format!("tool {} returned: {observation}", call.name)));
                    }
                }
            }
        }

        let fallback = calls_seen.last().map(|c| c.observation.clone()).unwrap_or_default();
        Ok(ToolOutcome { answer: fallback, calls: calls_seen })
    }

    async fn execute_tool(
        &self,
        space: &MemorySpace,
        storage: &dyn StorageBackend,
        call: &crate::llm::ToolCall,
        semantic_cutoff: f64,
        cancel: &CancellationSignal,
    ) -> crate::error::Result<(Vec<RetrievalResult>, String)> {
        match call.name.as_str() {
            "get_user_profile" => {
                let user_id = call.arguments["user_id"].as_str().unwrap_or_default();
                let target = MemorySpace::new(&space.agent_id, user_id);
                let content = storage.read(&target, "profile").await?.unwrap_or_default();
                Ok((Vec::new(), content))
            }
            "search_user_events" => {
                let user_id = call.arguments["user_id"].as_str().unwrap_or_default();
                let query = call.arguments["query"].as_str().unwrap_or_default();
                let limit = call.arguments["limit"].as_u64().unwrap_or(5) as usize;
                let target = MemorySpace::new(&space.agent_id, user_id);
                let results = self.recall.search(&target, query, None, None, limit, semantic_cutoff, cancel).await?;
                let text = results.iter().map(|r| r.line.clone()).collect::<Vec<_>>().join("\n");
                Ok((results, text))
            }
            "list_users" => {
                let agent_id = call.arguments["agent_id"].as_str().unwrap_or(&space.agent_id);
                let users = storage.list_users(agent_id).await?;
                Ok((Vec::new(), users.join(", ")))
            }
            "answer_question" => {
                let question = call.arguments["question"].as_str().unwrap_or_default();
                let results = self.recall.search(space, question, None, None, 10, semantic_cutoff, cancel).await?;
                let text = results.iter().map(|r| r.line.clone()).collect::<Vec<_>>().join("\n");
                Ok((results, text))
            }
            other => Ok((Vec::new(), format!("unknown tool: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{EmbeddingCache, MockEmbeddingProvider};
    use crate::llm::{MockLlmClient, ToolCall};
    use crate::storage::in_memory::InMemoryStorage;

    async fn seeded() -> InMemoryStorage {
        let storage = InMemoryStorage::new();
        let space = MemorySpace::new("agent-1", "alice");
        storage
            .write(&space, "event", "2026-07-01: Alice hiked in Yosemite\n2026-07-15: Alice visited Seattle")
            .await
            .unwrap();
        storage
    }

    #[tokio::test]
    async fn direct_mode_returns_sufficient_answer_on_first_iteration() {
        let storage = seeded().await;
        let provider = MockEmbeddingProvider::default();
        let cache = EmbeddingCache::new(50);
        let recall = RecallAgent::new(&storage, &provider, &cache);
        let answer_llm = MockLlmClient::with_text("<thinking>Yosemite on 2026-07-01.</thinking><result>Alice hiked Yosemite on 2026-07-01.</result>");
        let judge = MockLlmClient::with_text(r#"{"sufficient": true, "missing_info": "", "confidence": 0.95}"#);
        let agent = ResponseAgent::new(recall, &answer_llm, &judge);
        let space = MemorySpace::new("agent-1", "alice");
        let cancel = CancellationSignal::new();

        let outcome = agent.answer_direct(&space, "Where did Alice hike?", None, 3, 0.0, &cancel).await.unwrap();
        assert_eq!(outcome.trace.len(), 1);
        assert!(outcome.trace[0].sufficient);
        assert_eq!(outcome.answer, "Alice hiked Yosemite on 2026-07-01.");
    }

    #[tokio::test]
    async fn direct_mode_stops_at_max_iterations_when_never_sufficient() {
        let storage = seeded().await;
        let provider = MockEmbeddingProvider::default();
        let cache = EmbeddingCache::new(50);
        let recall = RecallAgent::new(&storage, &provider, &cache);
        let answer_llm = MockLlmClient::with_text("<result>partial answer</result>");
        let judge = MockLlmClient::with_text(r#"{"sufficient": false, "missing_info": "exact date", "confidence": 0.2}"#);
        let agent = ResponseAgent::new(recall, &answer_llm, &judge);
        let space = MemorySpace::new("agent-1", "alice");
        let cancel = CancellationSignal::new();

        let outcome = agent.answer_direct(&space, "Where did Alice go?", None, 2, 0.0, &cancel).await.unwrap();
        assert_eq!(outcome.trace.len(), 2);
        assert!(outcome.trace.iter().all(|t| !t.sufficient));
        assert_eq!(outcome.trace[1].question, "Where did Alice go? (exact date)");
    }

    #[tokio::test]
    async fn direct_mode_searches_each_candidate_user_and_dedups_across_them() {
        let storage = seeded().await;
        let space = MemorySpace::new("agent-1", "alice");
        let bob_space = MemorySpace::new("agent-1", "bob");
        storage.write(&bob_space, "event", "2026-07-01: Alice hiked in Yosemite").await.unwrap();

        let provider = MockEmbeddingProvider::default();
        let cache = EmbeddingCache::new(50);
        let recall = RecallAgent::new(&storage, &provider, &cache);
        let answer_llm = MockLlmClient::with_text("<result>answer</result>");
        let judge = MockLlmClient::with_text(r#"{"sufficient": true, "missing_info": "", "confidence": 0.9}"#);
        let agent = ResponseAgent::new(recall, &answer_llm, &judge);
        let cancel = CancellationSignal::new();

        let users = vec!["alice".to_string(), "bob".to_string()];
        let outcome = agent.answer_direct(&space, "Yosemite", Some(&users), 1, 0.0, &cancel).await.unwrap();
        let sources: std::collections::HashSet<&str> =
            outcome.trace[0].retrieved_context.iter().map(|r| r.source_user.as_str()).collect();
        assert!(sources.contains("alice"));
        assert!(sources.contains("bob"));
    }

    #[tokio::test]
    async fn tool_mode_executes_search_then_returns_text_answer() {
        let storage = seeded().await;
        let provider = MockEmbeddingProvider::default();
        let cache = EmbeddingCache::new(50);
        let recall = RecallAgent::new(&storage, &provider, &cache);

        let search_call = ToolCall {
            name: "search_user_events".to_string(),
            arguments: serde_json::json!({"user_id": "alice", "query": "Yosemite"}),
        };
        let tool_llm = MockLlmClient::with_tool_calls(vec![search_call]);
        let judge = MockLlmClient::with_text("unused");
        let agent = ResponseAgent::new(recall, &tool_llm, &judge);
        let space = MemorySpace::new("agent-1", "alice");
        let cancel = CancellationSignal::new();

        // The mock always returns the same tool call, so after one
        // iteration we stop at max_iterations and surface the
        // observation trail.
        let outcome = agent
            .answer_with_tools(&space, &storage, "Where did Alice hike?", 1, 0.0, &cancel)
            .await
            .unwrap();
        assert_eq!(outcome.calls.len(), 1);
        assert!(outcome.answer.contains("Yosemite"));
    }
}
