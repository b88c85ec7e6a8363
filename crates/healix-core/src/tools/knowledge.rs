//! Evidence search, one tool per domain

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use healix_store::{Domain, EvidenceStore};

use super::{ToolHandler, query_schema, str_arg};

pub struct KnowledgeSearchTool {
    domain: Domain,
    name: String,
    evidence: Arc<EvidenceStore>,
}

impl KnowledgeSearchTool {
    pub fn new(domain: Domain, evidence: Arc<EvidenceStore>) -> Self {
        Self {
            domain,
            name: tool_name(domain),
            evidence,
        }
    }
}

/// `search_<domain>_knowledge`
pub fn tool_name(domain: Domain) -> String {
    format!("search_{}_knowledge", domain.as_str())
}

/// Whether a tool name is one of the evidence search tools
pub fn is_knowledge_tool(name: &str) -> bool {
    Domain::ALL.iter().any(|d| tool_name(*d) == name)
}

#[async_trait]
impl ToolHandler for KnowledgeSearchTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        match self.domain {
            Domain::Clinical => {
                "Search the medical knowledge base for clinical information about heart \
                 rate, blood pressure, SpO2, HRV, stress, diseases and treatment guidelines. \
                 Use this to provide evidence-based advice."
            }
            Domain::Nutrition => {
                "Search the nutrition knowledge base for macros, meal planning, supplements, \
                 hydration, the DASH diet and dietary guidelines."
            }
            Domain::Exercise => {
                "Search the exercise knowledge base for workout plans, training splits, form \
                 guidance, warm-up protocols, progressive overload and safe training practice."
            }
            Domain::Risk => {
                "Search the risk analysis knowledge base for risk factor models, health \
                 deterioration patterns, behavioral insights and population health trends."
            }
        }
    }

    fn input_schema(&self) -> Value {
        query_schema("Search query, in English or Arabic")
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let query = str_arg(&input, "query")?.ok_or_else(|| anyhow!("Missing 'query' parameter"))?;
        debug!("Searching {} evidence for: {}", self.domain, query);
        Ok(self.evidence.search_text(self.domain, &query).await)
    }
}
