//! Tool registry and the per-specialty tool sets
//!
//! Every tool is scoped to one user at construction and returns text for the
//! model. Store failures are reported as text starting with `Error`; only
//! argument problems surface as `Err`, which the orchestrator feeds back as
//! an `Error: ...` tool message.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use healix_store::{EvidenceStore, RecordStore};

use crate::context::UserContext;
use crate::providers::ToolDefinition;
use crate::specialty::Specialty;

pub mod clinical;
pub mod exercise;
pub mod knowledge;
pub mod nutrition;
pub mod risk;

#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, tool_name: &str, input: Value) -> Result<String>;
    fn list_tools(&self) -> Vec<ToolDefinition>;
}

/// A single callable tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;
    async fn execute(&self, input: Value) -> Result<String>;
}

/// Tools keyed by name, listed in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn ToolHandler>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; a later handler with the same name replaces it
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let name = handler.name().to_string();
        debug!("Registering tool: {}", name);
        match self.by_name.get(&name) {
            Some(&idx) => self.tools[idx] = handler,
            None => {
                self.by_name.insert(name, self.tools.len());
                self.tools.push(handler);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.by_name.get(name).map(|&idx| self.tools[idx].clone())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute(&self, tool_name: &str, input: Value) -> Result<String> {
        debug!("Executing tool: {} with input: {}", tool_name, input);

        let handler = self
            .get(tool_name)
            .ok_or_else(|| anyhow!("Unknown tool: {}", tool_name))?;

        match handler.execute(input).await {
            Ok(result) => {
                debug!("Tool {} returned {} bytes", tool_name, result.len());
                Ok(result)
            }
            Err(e) => {
                warn!("Tool {} failed: {:#}", tool_name, e);
                Err(e)
            }
        }
    }

    fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|handler| ToolDefinition {
                name: handler.name().to_string(),
                description: handler.description().to_string(),
                input_schema: handler.input_schema(),
            })
            .collect()
    }
}

/// JSON schema for an object with the given properties
pub fn json_schema(properties: Value, required: Vec<&str>) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Schema for the single free-text `query` argument most tools take
pub(crate) fn query_schema(description: &str) -> Value {
    json_schema(
        serde_json::json!({
            "query": {
                "type": "string",
                "description": description
            }
        }),
        vec!["query"],
    )
}

/// Optional string argument. Numbers are accepted and rendered as text.
pub(crate) fn str_arg(input: &Value, key: &str) -> Result<Option<String>> {
    match input.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(anyhow!(
            "Invalid '{}' parameter: expected a string, got {}",
            key,
            other
        )),
    }
}

pub const DEFAULT_HISTORY_DAYS: i64 = 7;

/// Day count from a `days` argument: a digit string, else the default
pub(crate) fn days_arg(input: &Value) -> Result<i64> {
    let days = str_arg(input, "days")?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(DEFAULT_HISTORY_DAYS);
    Ok(days)
}

/// Start of a window reaching `span` back from now; the beginning of time
/// when the span does not fit
pub(crate) fn window_start(span: Option<TimeDelta>) -> DateTime<Utc> {
    span.and_then(|d| Utc::now().checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Values of one field across records; missing or zero readings are skipped
pub(crate) fn readings<T>(items: &[T], field: impl Fn(&T) -> Option<f64>) -> Vec<f64> {
    items
        .iter()
        .filter_map(field)
        .filter(|v| *v != 0.0)
        .collect()
}

/// What the tools of one request can reach
#[derive(Clone)]
pub struct ToolContext {
    pub user: Arc<UserContext>,
    pub store: Arc<dyn RecordStore>,
    pub evidence: Arc<EvidenceStore>,
}

/// Build the tool set bound to `specialty`
pub fn build_toolset(specialty: Specialty, ctx: &ToolContext) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let tools: Vec<Arc<dyn ToolHandler>> = match specialty {
        Specialty::Clinical => vec![
            Arc::new(clinical::LookupVitalsTool::new(ctx.clone())),
            Arc::new(clinical::VitalTrendsTool::new(ctx.clone())),
            Arc::new(clinical::HealthAlertsTool::new(ctx.clone())),
        ],
        Specialty::Nutrition => vec![
            Arc::new(nutrition::NutritionPlanTool::new(ctx.clone())),
            Arc::new(nutrition::NutritionHistoryTool::new(ctx.clone())),
        ],
        Specialty::Exercise => vec![
            Arc::new(exercise::ExercisePlanTool::new(ctx.clone())),
            Arc::new(exercise::ExerciseHistoryTool::new(ctx.clone())),
            Arc::new(exercise::SafeLoadIndexTool),
        ],
        Specialty::Risk => vec![
            Arc::new(risk::RiskFactorsTool::new(ctx.clone())),
            Arc::new(risk::PredictionScenariosTool::new(ctx.clone())),
            Arc::new(risk::MedicationComplianceTool::new(ctx.clone())),
        ],
    };
    for tool in tools {
        registry.register(tool);
    }
    registry.register(Arc::new(knowledge::KnowledgeSearchTool::new(
        specialty.domain(),
        ctx.evidence.clone(),
    )));
    registry
}
