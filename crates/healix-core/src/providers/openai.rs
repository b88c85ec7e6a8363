//! OpenAI-compatible chat completions provider (Ollama, vLLM, llama.cpp server)

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::types::{
    ChatBlock, ChatMessage, ChatMessageContent, ChatResponse, ChatResponseBlock, ChatRole,
    ChatUsage, LlmProvider, StopReason, ToolDefinition,
};

/// Sampling settings sent with every request
#[derive(Debug, Clone, Copy)]
pub struct Sampling {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

pub struct OpenAiCompatProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    sampling: Sampling,
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .field("sampling", &self.sampling)
            .finish()
    }
}

impl OpenAiCompatProvider {
    /// `api_key` is sent as a bearer token when non-empty; local Ollama needs none
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        sampling: Sampling,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            sampling,
        })
    }

    fn to_wire_messages(messages: &[ChatMessage], system: &str) -> Vec<WireMessage> {
        let mut result = vec![WireMessage::text("system", system)];

        for msg in messages {
            match (&msg.role, &msg.content) {
                (ChatRole::System, _) => {}
                (ChatRole::Assistant, ChatMessageContent::Blocks(blocks)) => {
                    let mut text_parts = Vec::new();
                    let mut tool_calls = Vec::new();

                    for block in blocks {
                        match block {
                            ChatBlock::Text { text } => text_parts.push(text.clone()),
                            ChatBlock::ToolCall { id, name, input } => {
                                tool_calls.push(WireToolCall {
                                    id: id.clone(),
                                    r#type: "function".to_string(),
                                    function: WireFunction {
                                        name: name.clone(),
                                        arguments: input.to_string(),
                                    },
                                });
                            }
                            ChatBlock::ToolResult { .. } => {}
                        }
                    }

                    result.push(WireMessage {
                        role: "assistant".to_string(),
                        content: (!text_parts.is_empty()).then(|| text_parts.join("\n")),
                        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                        tool_call_id: None,
                    });
                }
                (role, ChatMessageContent::Blocks(blocks)) => {
                    let mut text_parts = Vec::new();
                    for block in blocks {
                        match block {
                            ChatBlock::Text { text } => text_parts.push(text.clone()),
                            ChatBlock::ToolResult {
                                tool_call_id,
                                content,
                            } => result.push(WireMessage {
                                role: "tool".to_string(),
                                content: Some(content.clone()),
                                tool_calls: None,
                                tool_call_id: Some(tool_call_id.clone()),
                            }),
                            ChatBlock::ToolCall { .. } => {}
                        }
                    }
                    if !text_parts.is_empty() {
                        result.push(WireMessage::text(&role.to_string(), &text_parts.join("\n")));
                    }
                }
                (role, ChatMessageContent::Text(text)) => {
                    result.push(WireMessage::text(&role.to_string(), text));
                }
            }
        }

        result
    }

    fn to_wire_tools(tools: &[ToolDefinition]) -> Vec<WireToolDef> {
        tools
            .iter()
            .map(|t| WireToolDef {
                r#type: "function".to_string(),
                function: WireToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.input_schema.clone(),
                },
            })
            .collect()
    }

    fn from_wire_response(resp: WireResponse) -> Result<ChatResponse> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Chat completion response had no choices"))?;

        let mut blocks = Vec::new();

        if let Some(content) = choice.message.content.filter(|c| !c.is_empty()) {
            blocks.push(ChatResponseBlock::Text { text: content });
        }

        for (i, tc) in choice.message.tool_calls.unwrap_or_default().into_iter().enumerate() {
            // Some servers send arguments as an object instead of a JSON string
            let input = match tc.function.arguments {
                Value::String(s) if s.trim().is_empty() => Value::Object(Default::default()),
                Value::String(s) => serde_json::from_str(&s).with_context(|| {
                    format!("Malformed arguments for tool call {}", tc.function.name)
                })?,
                other => other,
            };
            let id = tc
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("call_{}", i));
            blocks.push(ChatResponseBlock::ToolCall {
                id,
                name: tc.function.name,
                input,
            });
        }

        let has_calls = blocks
            .iter()
            .any(|b| matches!(b, ChatResponseBlock::ToolCall { .. }));
        let stop_reason = match choice.finish_reason.as_deref() {
            Some("tool_calls") => StopReason::ToolUse,
            _ if has_calls => StopReason::ToolUse,
            Some("stop") => StopReason::EndTurn,
            Some("length") => StopReason::MaxTokens,
            _ => StopReason::Unknown,
        };

        let usage = resp.usage.map_or(ChatUsage::default(), |u| ChatUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        Ok(ChatResponse {
            blocks,
            stop_reason,
            usage,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn provider_name(&self) -> &str {
        "openai-compat"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        system: &str,
    ) -> Result<ChatResponse> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let wire_messages = Self::to_wire_messages(messages, system);

        let mut body = serde_json::json!({
            "model": self.model,
            "temperature": self.sampling.temperature,
            "max_tokens": self.sampling.max_tokens,
            "messages": wire_messages,
        });
        if !tools.is_empty() {
            body["tools"] = serde_json::to_value(Self::to_wire_tools(tools))?;
        }

        debug!(
            "Chat request: model={}, messages={}, tools={}",
            self.model,
            wire_messages.len(),
            tools.len()
        );

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send chat request to {}", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Chat request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let wire: WireResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        debug!(
            "Chat response: choices={}, finish_reason={:?}",
            wire.choices.len(),
            wire.choices.first().map(|c| &c.finish_reason)
        );

        Self::from_wire_response(wire)
    }
}

// ── Wire types ──

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn text(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    r#type: String,
    function: WireFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Clone, Serialize)]
struct WireToolDef {
    r#type: String,
    function: WireToolFunction,
}

#[derive(Debug, Clone, Serialize)]
struct WireToolFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireChoiceMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireResponseToolCall>>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireResponseToolCall {
    id: Option<String>,
    function: WireResponseFunction,
}

#[derive(Debug, Clone, Deserialize)]
struct WireResponseFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_messages_simple() {
        let msgs = vec![ChatMessage::user("hello")];
        let result = OpenAiCompatProvider::to_wire_messages(&msgs, "You are helpful.");
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].role, "system");
        assert_eq!(result[0].content.as_deref(), Some("You are helpful."));
        assert_eq!(result[1].role, "user");
    }

    #[test]
    fn test_wire_messages_with_tool_round() {
        let msgs = vec![
            ChatMessage::user("what is my heart rate"),
            ChatMessage {
                role: ChatRole::Assistant,
                content: ChatMessageContent::Blocks(vec![ChatBlock::ToolCall {
                    id: "call_1".to_string(),
                    name: "lookup_vitals".to_string(),
                    input: json!({"query": "heart rate"}),
                }]),
            },
            ChatMessage::tool_result("call_1", "Heart Rate: 72 bpm"),
        ];
        let result = OpenAiCompatProvider::to_wire_messages(&msgs, "sys");
        assert_eq!(result.len(), 4);
        assert_eq!(result[2].role, "assistant");
        assert!(result[2].content.is_none());
        let calls = result[2].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.arguments, r#"{"query":"heart rate"}"#);
        assert_eq!(result[3].role, "tool");
        assert_eq!(result[3].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_response_with_string_arguments() {
        let wire: WireResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": "",
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "get_vital_trends", "arguments": "{\"period\":\"7d\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        }))
        .unwrap();
        let resp = OpenAiCompatProvider::from_wire_response(wire).unwrap();
        assert_eq!(resp.stop_reason, StopReason::ToolUse);
        assert_eq!(resp.blocks.len(), 1);
        match &resp.blocks[0] {
            ChatResponseBlock::ToolCall { id, name, input } => {
                assert_eq!(id, "call_9");
                assert_eq!(name, "get_vital_trends");
                assert_eq!(input["period"], "7d");
            }
            _ => panic!("expected tool call"),
        }
        assert_eq!(resp.usage.input_tokens, 10);
    }

    #[test]
    fn test_response_with_object_arguments_and_missing_id() {
        // Ollama reports "stop" even when it returns tool calls
        let wire: WireResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "tool_calls": [{"function": {"name": "lookup_vitals", "arguments": {"query": "x"}}}]
                },
                "finish_reason": "stop"
            }]
        }))
        .unwrap();
        let resp = OpenAiCompatProvider::from_wire_response(wire).unwrap();
        assert_eq!(resp.stop_reason, StopReason::ToolUse);
        assert!(matches!(
            &resp.blocks[0],
            ChatResponseBlock::ToolCall { id, input, .. } if id == "call_0" && input["query"] == "x"
        ));
    }

    #[test]
    fn test_malformed_arguments_are_an_error() {
        let wire: WireResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {"tool_calls": [{"id": "c", "function": {"name": "t", "arguments": "{oops"}}]},
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();
        assert!(OpenAiCompatProvider::from_wire_response(wire).is_err());
    }

    #[test]
    fn test_empty_choices_is_an_error() {
        let wire: WireResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(OpenAiCompatProvider::from_wire_response(wire).is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let p = OpenAiCompatProvider::new(
            "http://localhost:11434/",
            "llama3.1",
            Some("sk-secret".to_string()),
            Sampling::default(),
            Duration::from_secs(5),
        )
        .unwrap();
        let dbg = format!("{:?}", p);
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("http://localhost:11434\""));
    }
}
