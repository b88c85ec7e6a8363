//! Provider-agnostic chat types and the [`LlmProvider`] contract

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool exposed to the model in function-calling format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// One turn in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: ChatMessageContent,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: ChatMessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: ChatMessageContent::Text(text.into()),
        }
    }

    /// Result of one tool call, fed back to the model
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: ChatMessageContent::Blocks(vec![ChatBlock::ToolResult {
                tool_call_id: tool_call_id.into(),
                content: content.into(),
            }]),
        }
    }

    /// Plain text of the message, ignoring tool call blocks
    pub fn text(&self) -> String {
        match &self.content {
            ChatMessageContent::Text(t) => t.clone(),
            ChatMessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ChatBlock::Text { text } => Some(text.as_str()),
                    ChatBlock::ToolResult { content, .. } => Some(content.as_str()),
                    ChatBlock::ToolCall { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
    Tool,
}

/// Either plain text or structured blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatMessageContent {
    Text(String),
    Blocks(Vec<ChatBlock>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChatBlock {
    Text { text: String },
    ToolCall { id: String, name: String, input: Value },
    ToolResult { tool_call_id: String, content: String },
}

/// Model reply for one request
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub blocks: Vec<ChatResponseBlock>,
    pub stop_reason: StopReason,
    pub usage: ChatUsage,
}

impl ChatResponse {
    /// Concatenated text blocks
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                ChatResponseBlock::Text { text } => Some(text.as_str()),
                ChatResponseBlock::ToolCall { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_tool_calls(&self) -> bool {
        self.blocks
            .iter()
            .any(|b| matches!(b, ChatResponseBlock::ToolCall { .. }))
    }

    /// The reply as an assistant turn for the thread
    pub fn to_message(&self) -> ChatMessage {
        let blocks = self
            .blocks
            .iter()
            .map(|b| match b {
                ChatResponseBlock::Text { text } => ChatBlock::Text { text: text.clone() },
                ChatResponseBlock::ToolCall { id, name, input } => ChatBlock::ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                },
            })
            .collect();
        ChatMessage {
            role: ChatRole::Assistant,
            content: ChatMessageContent::Blocks(blocks),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ChatResponseBlock {
    Text { text: String },
    ToolCall { id: String, name: String, input: Value },
}

/// Why the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    Unknown,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChatUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A chat model reachable through a fixed request/response contract
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g. "ollama")
    fn provider_name(&self) -> &str;

    /// Model identifier (e.g. "llama3.1:8b")
    fn model(&self) -> &str;

    /// Send the conversation with the callable tools and system instruction
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        system: &str,
    ) -> Result<ChatResponse>;
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

impl StopReason {
    pub fn is_tool_use(&self) -> bool {
        matches!(self, Self::ToolUse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_role_display() {
        assert_eq!(ChatRole::User.to_string(), "user");
        assert_eq!(ChatRole::Tool.to_string(), "tool");
    }

    #[test]
    fn test_tool_result_message() {
        let msg = ChatMessage::tool_result("call_1", "Heart Rate: 72 bpm");
        assert_eq!(msg.role, ChatRole::Tool);
        assert_eq!(msg.text(), "Heart Rate: 72 bpm");
    }

    #[test]
    fn test_response_text_skips_tool_calls() {
        let resp = ChatResponse {
            blocks: vec![
                ChatResponseBlock::Text {
                    text: "Checking".to_string(),
                },
                ChatResponseBlock::ToolCall {
                    id: "c1".to_string(),
                    name: "lookup_vitals".to_string(),
                    input: serde_json::json!({}),
                },
            ],
            stop_reason: StopReason::ToolUse,
            usage: ChatUsage::default(),
        };
        assert_eq!(resp.text(), "Checking");
        assert!(resp.has_tool_calls());
        let msg = resp.to_message();
        assert_eq!(msg.role, ChatRole::Assistant);
        assert!(matches!(
            &msg.content,
            ChatMessageContent::Blocks(b) if b.len() == 2
        ));
    }
}
