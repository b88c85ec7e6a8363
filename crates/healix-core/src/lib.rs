//! Healix agent core
//!
//! Routes a message to a specialty, builds that specialty's agent (persona,
//! tools, remembered thread) and drives the tool-calling loop against an
//! OpenAI-compatible model until it answers.

pub mod context;
pub mod orchestrator;
pub mod persona;
pub mod providers;
pub mod router;
pub mod scoring;
pub mod specialty;
pub mod text;
pub mod threads;
pub mod tools;

pub use context::UserContext;
pub use orchestrator::{
    ChatReply, ChatRequest, FALLBACK_RESPONSE, HistoryTurn, Orchestrator, OrchestratorConfig,
    TurnFailure,
};
pub use persona::{PersonaError, PersonaTemplate, render_persona};
pub use providers::{LlmProvider, OpenAiCompatProvider, RetryingProvider, Sampling};
pub use router::{route, route_scored};
pub use scoring::{RiskAssessment, SafeLoadIndex, assess_risk, safe_load_index};
pub use specialty::Specialty;
pub use threads::{ConversationThread, ThreadKey, ThreadStore};
pub use tools::{ToolContext, ToolExecutor, ToolHandler, ToolRegistry, build_toolset};
