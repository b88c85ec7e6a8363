//! LLM provider layer
//!
//! The orchestrator talks to an [`LlmProvider`]. The shipped implementation
//! targets OpenAI-compatible chat completion endpoints (Ollama by default),
//! wrapped in [`RetryingProvider`] for transient failures.

pub mod openai;
pub mod retry;
pub mod types;

pub use openai::{OpenAiCompatProvider, Sampling};
pub use retry::RetryingProvider;
pub use types::{
    ChatBlock, ChatMessage, ChatMessageContent, ChatResponse, ChatResponseBlock, ChatRole,
    ChatUsage, LlmProvider, StopReason, ToolDefinition,
};
