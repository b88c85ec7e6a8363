//! Tool-calling orchestrator
//!
//! One request walks a fixed state machine:
//!
//! ```text
//! Route -> BuildAgent -> ModelTurn <-> ToolExec
//!                            |
//!                            +-> Done | Failed
//! ```
//!
//! Turns produced while a request runs are kept aside and appended to the
//! conversation thread only when the request reaches `Done`, so a failed
//! request leaves memory exactly as it found it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};

use healix_store::{EvidenceStore, RecordStore, UserProfile};

use crate::context::UserContext;
use crate::persona::{PersonaError, render_persona};
use crate::providers::{ChatMessage, ChatResponseBlock, LlmProvider, ToolDefinition};
use crate::router::route;
use crate::specialty::Specialty;
use crate::text::{prefix_chars, truncate_at_boundary};
use crate::threads::{ConversationThread, ThreadKey, ThreadStore};
use crate::tools::knowledge::is_knowledge_tool;
use crate::tools::{ToolContext, ToolExecutor, ToolRegistry, build_toolset};

/// Answer returned whenever a request cannot complete
pub const FALLBACK_RESPONSE: &str =
    "I'm processing your request through the AI system. Please try again.";

/// Characters of each knowledge search result kept as a source
pub const SOURCE_PREVIEW_CHARS: usize = 300;

const TRUNCATION_MARKER: &str = "\n[Output truncated]";

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Tool rounds allowed per request before answering with what is known
    pub max_tool_rounds: usize,
    /// Bytes of a single tool result passed back to the model
    pub max_tool_output: usize,
    pub model_timeout: Duration,
    /// Caller-supplied turns used to seed an empty thread
    pub history_window: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 5,
            max_tool_output: 16_000,
            model_timeout: Duration::from_secs(120),
            history_window: 6,
        }
    }
}

/// A prior turn supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: String,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
    #[serde(default)]
    pub requested_specialty: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub specialty: Specialty,
    /// Leading text of every knowledge search result, in call order
    pub sources: Vec<String>,
    /// Tools invoked, first-call order, no repeats
    pub tools_used: Vec<String>,
}

impl ChatReply {
    fn fallback(specialty: Specialty) -> Self {
        Self {
            response: FALLBACK_RESPONSE.to_string(),
            specialty,
            sources: Vec::new(),
            tools_used: Vec::new(),
        }
    }
}

/// Why a request ended in the `Failed` state
#[derive(Debug, Error)]
pub enum TurnFailure {
    #[error(transparent)]
    Persona(#[from] PersonaError),
    #[error("model did not answer within {0:?}")]
    ModelTimeout(Duration),
    #[error("model request failed: {0}")]
    Model(String),
    #[error("malformed model response: {0}")]
    MalformedResponse(&'static str),
}

struct ToolCall {
    id: String,
    name: String,
    input: Value,
}

/// A specialized agent bound to one request
struct AgentTurn {
    specialty: Specialty,
    thread: OwnedMutexGuard<ConversationThread>,
    system: String,
    tools: ToolRegistry,
    definitions: Vec<ToolDefinition>,
    /// Turns of this request, committed on `Done`
    pending: Vec<ChatMessage>,
    rounds: usize,
    tools_used: Vec<String>,
    sources: Vec<String>,
    last_text: Option<String>,
}

impl AgentTurn {
    fn conversation(&self) -> Vec<ChatMessage> {
        let mut messages = self.thread.messages().to_vec();
        messages.extend(self.pending.iter().cloned());
        messages
    }

    fn commit(mut self, response: String) -> ChatReply {
        let turns = std::mem::take(&mut self.pending);
        self.thread.append(turns);
        ChatReply {
            response,
            specialty: self.specialty,
            sources: self.sources,
            tools_used: self.tools_used,
        }
    }
}

enum TurnState {
    Route,
    BuildAgent(Specialty),
    ModelTurn(AgentTurn),
    ToolExec(AgentTurn, Vec<ToolCall>),
    Done(AgentTurn, String),
    Failed(Specialty, TurnFailure),
}

/// Drives requests from routing to a final answer
#[derive(Clone)]
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn RecordStore>,
    evidence: Arc<EvidenceStore>,
    threads: Arc<ThreadStore>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn RecordStore>,
        evidence: Arc<EvidenceStore>,
    ) -> Self {
        Self {
            provider,
            store,
            evidence,
            threads: Arc::new(ThreadStore::default()),
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_threads(mut self, threads: Arc<ThreadStore>) -> Self {
        self.threads = threads;
        self
    }

    pub fn threads(&self) -> &Arc<ThreadStore> {
        &self.threads
    }

    /// Answer one message. Never fails: problems yield [`FALLBACK_RESPONSE`].
    ///
    /// The request runs in its own task, so dropping the returned future does
    /// not cancel tool calls already under way.
    pub async fn handle(&self, request: ChatRequest) -> ChatReply {
        let this = self.clone();
        let fallback = route(&request.message, request.requested_specialty.as_deref());
        match tokio::spawn(async move { this.run(request).await }).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Request task ended abnormally: {}", e);
                ChatReply::fallback(fallback)
            }
        }
    }

    async fn run(&self, request: ChatRequest) -> ChatReply {
        let mut state = TurnState::Route;
        loop {
            state = match state {
                TurnState::Route => {
                    let specialty =
                        route(&request.message, request.requested_specialty.as_deref());
                    info!("Request from {} routed to {}", request.user_id, specialty);
                    TurnState::BuildAgent(specialty)
                }
                TurnState::BuildAgent(specialty) => match self.build_agent(specialty, &request).await {
                    Ok(agent) => TurnState::ModelTurn(agent),
                    Err(e) => TurnState::Failed(specialty, e),
                },
                TurnState::ModelTurn(mut agent) => match self.model_turn(&mut agent).await {
                    Ok(calls) if calls.is_empty() => {
                        let text = agent.last_text.clone().unwrap_or_default();
                        TurnState::Done(agent, text)
                    }
                    Ok(calls) if agent.rounds >= self.config.max_tool_rounds => {
                        warn!(
                            "{} agent hit the tool round limit ({}), dropping {} pending calls",
                            agent.specialty,
                            self.config.max_tool_rounds,
                            calls.len()
                        );
                        let text = agent
                            .last_text
                            .clone()
                            .unwrap_or_else(|| FALLBACK_RESPONSE.to_string());
                        agent.pending.push(ChatMessage::assistant(text.clone()));
                        TurnState::Done(agent, text)
                    }
                    Ok(calls) => TurnState::ToolExec(agent, calls),
                    Err(e) => TurnState::Failed(agent.specialty, e),
                },
                TurnState::ToolExec(mut agent, calls) => {
                    self.execute_tools(&mut agent, calls).await;
                    TurnState::ModelTurn(agent)
                }
                TurnState::Done(agent, text) => {
                    debug!(
                        "{} turn done after {} tool rounds, tools: {:?}",
                        agent.specialty, agent.rounds, agent.tools_used
                    );
                    return agent.commit(text);
                }
                TurnState::Failed(specialty, failure) => {
                    warn!("{} turn failed: {}", specialty, failure);
                    return ChatReply::fallback(specialty);
                }
            };
        }
    }

    async fn build_agent(
        &self,
        specialty: Specialty,
        request: &ChatRequest,
    ) -> Result<AgentTurn, TurnFailure> {
        let user = Arc::new(UserContext::new(&request.user_id, request.profile.clone()));
        let system = render_persona(specialty, &user)?;

        let ctx = ToolContext {
            user: user.clone(),
            store: self.store.clone(),
            evidence: self.evidence.clone(),
        };
        let tools = build_toolset(specialty, &ctx);
        let definitions = tools.list_tools();

        let key = ThreadKey::new(specialty, &request.user_id);
        let thread = self.threads.acquire(&key).await;

        let mut pending = Vec::new();
        if thread.is_empty() {
            pending.extend(seed_history(&request.history, self.config.history_window));
        }
        pending.push(ChatMessage::user(request.message.clone()));
        debug!(
            "Built {} agent: {} tools, {} remembered turns, {} new",
            specialty,
            definitions.len(),
            thread.len(),
            pending.len()
        );

        Ok(AgentTurn {
            specialty,
            thread,
            system,
            tools,
            definitions,
            pending,
            rounds: 0,
            tools_used: Vec::new(),
            sources: Vec::new(),
            last_text: None,
        })
    }

    /// One model exchange; returns the tool calls it asked for
    async fn model_turn(&self, agent: &mut AgentTurn) -> Result<Vec<ToolCall>, TurnFailure> {
        let messages = agent.conversation();
        let response = tokio::time::timeout(
            self.config.model_timeout,
            self.provider.chat(&messages, &agent.definitions, &agent.system),
        )
        .await
        .map_err(|_| TurnFailure::ModelTimeout(self.config.model_timeout))?
        .map_err(|e| TurnFailure::Model(format!("{:#}", e)))?;

        let text = response.text();
        if !text.trim().is_empty() {
            agent.last_text = Some(text.clone());
        }

        let calls: Vec<ToolCall> = response
            .blocks
            .iter()
            .filter_map(|b| match b {
                ChatResponseBlock::ToolCall { id, name, input } => Some(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                ChatResponseBlock::Text { .. } => None,
            })
            .collect();

        if calls.is_empty() {
            if text.trim().is_empty() {
                return Err(TurnFailure::MalformedResponse("no text and no tool calls"));
            }
            agent.pending.push(ChatMessage::assistant(text));
        } else if agent.rounds < self.config.max_tool_rounds {
            agent.pending.push(response.to_message());
        }
        Ok(calls)
    }

    async fn execute_tools(&self, agent: &mut AgentTurn, calls: Vec<ToolCall>) {
        agent.rounds += 1;
        for call in calls {
            info!("Executing tool: {}", call.name);
            if !agent.tools_used.contains(&call.name) {
                agent.tools_used.push(call.name.clone());
            }

            let output = match agent.tools.execute(&call.name, call.input).await {
                Ok(output) => {
                    if is_knowledge_tool(&call.name) {
                        agent.sources.push(prefix_chars(&output, SOURCE_PREVIEW_CHARS));
                    }
                    output
                }
                Err(e) => format!("Error: {:#}", e),
            };
            let output = clip_tool_output(output, self.config.max_tool_output);
            agent.pending.push(ChatMessage::tool_result(call.id, output));
        }
    }
}

/// Last `window` caller turns; anything not from the user counts as assistant
fn seed_history(history: &[HistoryTurn], window: usize) -> Vec<ChatMessage> {
    let skip = history.len().saturating_sub(window);
    history[skip..]
        .iter()
        .map(|turn| {
            if turn.role.eq_ignore_ascii_case("user") {
                ChatMessage::user(turn.content.clone())
            } else {
                ChatMessage::assistant(turn.content.clone())
            }
        })
        .collect()
}

fn clip_tool_output(mut output: String, max_bytes: usize) -> String {
    if truncate_at_boundary(&mut output, max_bytes) {
        output.push_str(TRUNCATION_MARKER);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ChatMessageContent, ChatResponse, ChatRole, ChatUsage, StopReason};
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use chrono::Utc;
    use healix_store::{Collection, RecordDb};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    enum Scripted {
        Text(&'static str),
        Calls(Vec<(&'static str, Value)>),
        Fail(&'static str),
        Stall(Duration),
    }

    /// Replays a fixed script and records what it was sent
    #[derive(Default)]
    struct ScriptedProvider {
        script: Mutex<VecDeque<Scripted>>,
        /// Repeated once the script runs out
        repeat: Option<Vec<(&'static str, Value)>>,
        seen: Mutex<Vec<(String, Vec<ChatMessage>, Vec<String>)>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }

        fn request(&self, i: usize) -> (String, Vec<ChatMessage>, Vec<String>) {
            self.seen.lock().unwrap()[i].clone()
        }
    }

    fn calls_response(calls: Vec<(&'static str, Value)>, offset: usize) -> ChatResponse {
        ChatResponse {
            blocks: calls
                .into_iter()
                .enumerate()
                .map(|(i, (name, input))| ChatResponseBlock::ToolCall {
                    id: format!("call_{}", offset + i),
                    name: name.to_string(),
                    input,
                })
                .collect(),
            stop_reason: StopReason::ToolUse,
            usage: ChatUsage::default(),
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "test"
        }

        async fn chat(
            &self,
            messages: &[ChatMessage],
            tools: &[ToolDefinition],
            system: &str,
        ) -> Result<ChatResponse> {
            let n = {
                let mut seen = self.seen.lock().unwrap();
                seen.push((
                    system.to_string(),
                    messages.to_vec(),
                    tools.iter().map(|t| t.name.clone()).collect(),
                ));
                seen.len()
            };
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Scripted::Text(t)) => Ok(ChatResponse {
                    blocks: vec![ChatResponseBlock::Text {
                        text: t.to_string(),
                    }],
                    stop_reason: StopReason::EndTurn,
                    usage: ChatUsage::default(),
                }),
                Some(Scripted::Calls(calls)) => Ok(calls_response(calls, n * 10)),
                Some(Scripted::Fail(msg)) => Err(anyhow!(msg)),
                Some(Scripted::Stall(d)) => {
                    tokio::time::sleep(d).await;
                    Err(anyhow!("stalled"))
                }
                None => match &self.repeat {
                    Some(calls) => Ok(calls_response(calls.clone(), n * 10)),
                    None => Err(anyhow!("script exhausted")),
                },
            }
        }
    }

    struct Harness {
        orchestrator: Orchestrator,
        provider: Arc<ScriptedProvider>,
        db: Arc<RecordDb>,
        _temp: TempDir,
    }

    fn harness(provider: ScriptedProvider, config: OrchestratorConfig) -> Harness {
        let temp = TempDir::new().unwrap();
        let db = Arc::new(RecordDb::new(temp.path().join("records.db")).unwrap());
        let evidence = Arc::new(EvidenceStore::new(temp.path().join("evidence")));
        let provider = Arc::new(provider);
        let orchestrator =
            Orchestrator::new(provider.clone(), db.clone(), evidence).with_config(config);
        Harness {
            orchestrator,
            provider,
            db,
            _temp: temp,
        }
    }

    fn request(user: &str, message: &str) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            user_id: user.to_string(),
            profile: UserProfile {
                name: Some("Omar".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    async fn thread_len(h: &Harness, specialty: Specialty, user: &str) -> usize {
        h.orchestrator
            .threads()
            .acquire(&ThreadKey::new(specialty, user))
            .await
            .len()
    }

    fn tool_outputs(messages: &[ChatMessage]) -> Vec<String> {
        messages
            .iter()
            .filter(|m| m.role == ChatRole::Tool)
            .map(|m| m.text())
            .collect()
    }

    #[tokio::test]
    async fn test_tool_round_then_answer() {
        let provider = ScriptedProvider::new(vec![
            Scripted::Calls(vec![("lookup_vitals", json!({"query": "heart rate"}))]),
            Scripted::Text("Your heart rate is 64 bpm, which is normal."),
        ]);
        let h = harness(provider, OrchestratorConfig::default());
        h.db.insert(Collection::Vitals, "u1", Utc::now(), json!({"heart_rate": 64}))
            .await
            .unwrap();

        let reply = h.orchestrator.handle(request("u1", "what is my heart rate?")).await;
        assert_eq!(reply.specialty, Specialty::Clinical);
        assert_eq!(reply.response, "Your heart rate is 64 bpm, which is normal.");
        assert_eq!(reply.tools_used, vec!["lookup_vitals"]);
        assert!(reply.sources.is_empty());

        let (system, messages, tools) = h.provider.request(1);
        assert!(system.contains("Clinical Health Agent"));
        assert!(system.ends_with("User Profile: Name: Omar"));
        assert_eq!(tools.len(), 4);
        assert!(tool_outputs(&messages)[0].contains("Heart Rate: 64 bpm"));

        // user, assistant tool call, tool result, final answer
        assert_eq!(thread_len(&h, Specialty::Clinical, "u1").await, 4);
    }

    #[tokio::test]
    async fn test_no_data_still_answers() {
        let provider = ScriptedProvider::new(vec![
            Scripted::Calls(vec![("get_nutrition_plan", json!({"query": "plan"}))]),
            Scripted::Text("You don't have a plan yet; here is a starting point."),
        ]);
        let h = harness(provider, OrchestratorConfig::default());

        let reply = h
            .orchestrator
            .handle(request("u1", "what should I eat for breakfast"))
            .await;
        assert_eq!(reply.specialty, Specialty::Nutrition);
        assert!(reply.response.starts_with("You don't have a plan yet"));
        let (_, messages, _) = h.provider.request(1);
        assert!(tool_outputs(&messages)[0].starts_with("No nutrition plan found for this user yet."));
    }

    #[tokio::test]
    async fn test_knowledge_results_become_sources() {
        let provider = ScriptedProvider::new(vec![
            Scripted::Calls(vec![
                ("search_risk_knowledge", json!({"query": "cardiovascular risk"})),
                ("search_risk_knowledge", json!({"query": "sleep"})),
            ]),
            Scripted::Text("Here is what the evidence says."),
        ]);
        let h = harness(provider, OrchestratorConfig::default());

        let mut req = request("u1", "tell me something");
        req.requested_specialty = Some("risk".to_string());
        let reply = h.orchestrator.handle(req).await;

        assert_eq!(reply.specialty, Specialty::Risk);
        assert_eq!(reply.tools_used, vec!["search_risk_knowledge"]);
        assert_eq!(reply.sources.len(), 2);
        for source in &reply.sources {
            assert!(source.chars().count() <= SOURCE_PREVIEW_CHARS);
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_to_model() {
        let provider = ScriptedProvider::new(vec![
            Scripted::Calls(vec![("launch_rocket", json!({}))]),
            Scripted::Text("Sorry, I can't do that."),
        ]);
        let h = harness(provider, OrchestratorConfig::default());

        let reply = h.orchestrator.handle(request("u1", "hello")).await;
        assert_eq!(reply.response, "Sorry, I can't do that.");
        let (_, messages, _) = h.provider.request(1);
        assert_eq!(tool_outputs(&messages), vec!["Error: Unknown tool: launch_rocket"]);
    }

    #[tokio::test]
    async fn test_tool_loop_is_bounded() {
        let provider = ScriptedProvider {
            repeat: Some(vec![("calculate_safe_load_index", json!({"conditions": "knee"}))]),
            ..Default::default()
        };
        let config = OrchestratorConfig {
            max_tool_rounds: 3,
            ..Default::default()
        };
        let h = harness(provider, config);

        let reply = h.orchestrator.handle(request("u1", "squat workout")).await;
        assert_eq!(reply.specialty, Specialty::Exercise);
        assert_eq!(reply.response, FALLBACK_RESPONSE);
        assert_eq!(reply.tools_used, vec!["calculate_safe_load_index"]);
        // three rounds plus the request that hit the limit
        assert_eq!(h.provider.calls(), 4);

        // user + 3 x (call, result) + closing assistant text; no dangling call
        let key = ThreadKey::new(Specialty::Exercise, "u1");
        let thread = h.orchestrator.threads().acquire(&key).await;
        assert_eq!(thread.len(), 8);
        let last = thread.messages().last().unwrap();
        assert_eq!(last.role, ChatRole::Assistant);
        assert!(matches!(last.content, ChatMessageContent::Text(_)));
    }

    #[tokio::test]
    async fn test_model_failure_leaves_thread_untouched() {
        let provider = ScriptedProvider::new(vec![
            Scripted::Calls(vec![("lookup_vitals", json!({}))]),
            Scripted::Fail("status 400: bad request"),
        ]);
        let h = harness(provider, OrchestratorConfig::default());

        let reply = h.orchestrator.handle(request("u1", "my blood pressure")).await;
        assert_eq!(reply.response, FALLBACK_RESPONSE);
        assert_eq!(reply.specialty, Specialty::Clinical);
        assert!(reply.tools_used.is_empty());
        assert_eq!(thread_len(&h, Specialty::Clinical, "u1").await, 0);
    }

    #[tokio::test]
    async fn test_model_timeout_fails_turn() {
        let provider = ScriptedProvider::new(vec![Scripted::Stall(Duration::from_secs(5))]);
        let config = OrchestratorConfig {
            model_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let h = harness(provider, config);

        let reply = h.orchestrator.handle(request("u1", "hello")).await;
        assert_eq!(reply.response, FALLBACK_RESPONSE);
        assert_eq!(thread_len(&h, Specialty::Clinical, "u1").await, 0);
    }

    #[tokio::test]
    async fn test_empty_reply_is_malformed() {
        let provider = ScriptedProvider::new(vec![Scripted::Text("   ")]);
        let h = harness(provider, OrchestratorConfig::default());
        let reply = h.orchestrator.handle(request("u1", "hello")).await;
        assert_eq!(reply.response, FALLBACK_RESPONSE);
    }

    #[tokio::test]
    async fn test_history_seeds_only_empty_thread() {
        let provider = ScriptedProvider::new(vec![Scripted::Text("first"), Scripted::Text("second")]);
        let h = harness(provider, OrchestratorConfig::default());

        let history: Vec<HistoryTurn> = (0..8)
            .map(|i| HistoryTurn {
                role: if i % 2 == 0 { "user" } else { "ai" }.to_string(),
                content: format!("h{}", i),
            })
            .collect();

        let mut req = request("u1", "hello");
        req.history = history.clone();
        req.requested_specialty = Some("clinical".to_string());
        h.orchestrator.handle(req).await;

        let (_, messages, _) = h.provider.request(0);
        assert_eq!(messages.len(), 7);
        assert_eq!(messages[0].text(), "h2");
        assert_eq!(messages[1].role, ChatRole::Assistant);
        assert_eq!(messages[6].text(), "hello");

        // "again" contains the nutrition term "gain"; pin the specialty
        let mut req = request("u1", "again");
        req.history = history;
        req.requested_specialty = Some("clinical".to_string());
        h.orchestrator.handle(req).await;
        let (_, messages, _) = h.provider.request(1);
        // 6 seeded + hello + first + again
        assert_eq!(messages.len(), 9);
        assert_eq!(messages[7].text(), "first");
        assert_eq!(thread_len(&h, Specialty::Clinical, "u1").await, 10);
    }

    #[tokio::test]
    async fn test_threads_are_per_user() {
        let provider = ScriptedProvider::new(vec![Scripted::Text("a"), Scripted::Text("b")]);
        let h = harness(provider, OrchestratorConfig::default());

        h.orchestrator.handle(request("alice", "my pulse")).await;
        h.orchestrator.handle(request("bob", "my pulse")).await;

        let (_, bob_messages, _) = h.provider.request(1);
        assert_eq!(bob_messages.len(), 1);
        assert_eq!(thread_len(&h, Specialty::Clinical, "alice").await, 2);
        assert_eq!(thread_len(&h, Specialty::Clinical, "bob").await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_same_user_serialize() {
        let provider = ScriptedProvider::new(vec![Scripted::Text("one"), Scripted::Text("two")]);
        let h = harness(provider, OrchestratorConfig::default());

        let (a, b) = tokio::join!(
            h.orchestrator.handle(request("u1", "heart one")),
            h.orchestrator.handle(request("u1", "heart two"))
        );
        assert_ne!(a.response, b.response);

        // the second request saw the first one's committed turns
        let (_, second, _) = h.provider.request(1);
        assert_eq!(second.len(), 3);
        assert_eq!(thread_len(&h, Specialty::Clinical, "u1").await, 4);
    }

    #[test]
    fn test_clip_tool_output() {
        assert_eq!(clip_tool_output("short".to_string(), 10), "short");
        let clipped = clip_tool_output("x".repeat(20), 10);
        assert_eq!(clipped, format!("{}{}", "x".repeat(10), TRUNCATION_MARKER));
    }

    #[test]
    fn test_seed_history_window() {
        let history = vec![
            HistoryTurn {
                role: "user".to_string(),
                content: "a".to_string(),
            },
            HistoryTurn {
                role: "system".to_string(),
                content: "b".to_string(),
            },
        ];
        let seeded = seed_history(&history, 6);
        assert_eq!(seeded.len(), 2);
        assert_eq!(seeded[1].role, ChatRole::Assistant);
        assert_eq!(seed_history(&history, 1)[0].text(), "b");
        assert!(seed_history(&history, 0).is_empty());
    }
}
