use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use healix_core::OrchestratorConfig;
use healix_core::providers::Sampling;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealixConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorSection,
    #[serde(default)]
    pub threads: ThreadsConfig,
}

/// OpenAI-compatible chat endpoint
#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &mask_secret(&self.api_key))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .finish()
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            model: default_chat_model(),
            api_key: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl ModelConfig {
    pub fn sampling(&self) -> Sampling {
        Sampling {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn api_key(&self) -> Option<String> {
        let key = self.api_key.trim();
        (!key.is_empty()).then(|| key.to_string())
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_chat_model() -> String {
    "glm-4.7-flash:q4_K_M".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

/// Semantic half of evidence retrieval. Disabled means keyword-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_embed_model")]
    pub model: String,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_ollama_url(),
            model: default_embed_model(),
            timeout_secs: default_embed_timeout_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_embed_model() -> String {
    "qwen3-embedding:8b".to_string()
}

fn default_embed_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_index_dir")]
    pub index_dir: String,
    #[serde(default = "default_max_concurrent_queries")]
    pub max_concurrent_queries: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            index_dir: default_index_dir(),
            max_concurrent_queries: default_max_concurrent_queries(),
        }
    }
}

fn default_db_path() -> String {
    "~/.healix/healix.db".to_string()
}

fn default_index_dir() -> String {
    "~/.healix/evidence".to_string()
}

fn default_max_concurrent_queries() -> usize {
    4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorSection {
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
    #[serde(default = "default_max_tool_output")]
    pub max_tool_output: usize,
    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            max_tool_output: default_max_tool_output(),
            model_timeout_secs: default_model_timeout_secs(),
            history_window: default_history_window(),
        }
    }
}

impl OrchestratorSection {
    pub fn to_runtime(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_tool_rounds: self.max_tool_rounds,
            max_tool_output: self.max_tool_output,
            model_timeout: Duration::from_secs(self.model_timeout_secs),
            history_window: self.history_window,
        }
    }
}

fn default_max_tool_rounds() -> usize {
    5
}

fn default_max_tool_output() -> usize {
    16_000
}

fn default_model_timeout_secs() -> u64 {
    120
}

fn default_history_window() -> usize {
    6
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadsConfig {
    #[serde(default = "default_thread_capacity")]
    pub capacity: usize,
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
}

impl Default for ThreadsConfig {
    fn default() -> Self {
        Self {
            capacity: default_thread_capacity(),
            idle_ttl_secs: default_idle_ttl_secs(),
        }
    }
}

fn default_thread_capacity() -> usize {
    healix_core::threads::DEFAULT_CAPACITY
}

fn default_idle_ttl_secs() -> u64 {
    healix_core::threads::DEFAULT_IDLE_TTL.as_secs()
}

/// Show the first 3 and last 4 chars of keys longer than 7 chars, otherwise "***"
fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".healix")
}

/// Expand a leading `~/` to the home directory
pub fn expand_path(s: &str) -> PathBuf {
    match (s.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(s),
    }
}

impl HealixConfig {
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = custom_path
            .clone()
            .unwrap_or_else(|| config_dir().join("config.toml"));
        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = std::fs::metadata(path) {
                let mode = metadata.permissions().mode();
                if mode & 0o077 != 0 {
                    return Err(anyhow::anyhow!(
                        "Config file {:?} has overly permissive permissions ({:o}). \
                         It may contain an API key. Fix with: chmod 600 {:?}",
                        path,
                        mode & 0o777,
                        path
                    ));
                }
            }
        }

        let content = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `healix init` first.",
                path.display()
            )
        })?;

        let expanded = expand_env_vars(&content);
        let config: Self = toml::from_str(&expanded)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;

        if !config.model.api_key.is_empty() && !content.contains("${HEALIX_API_KEY}") {
            warn!(
                "Model API key is hardcoded in config file. Prefer: api_key = \"${{HEALIX_API_KEY}}\""
            );
        }

        Ok(config)
    }
}

/// Environment variables that may be expanded in config files
const ALLOWED_ENV_VARS: &[&str] = &[
    "HEALIX_MODEL_URL",
    "HEALIX_EMBED_URL",
    "HEALIX_API_KEY",
    "HEALIX_HOME",
];

fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while let Some(start) = result[pos..].find("${") {
        let abs_start = pos + start;
        let Some(end) = result[abs_start..].find('}') else {
            break;
        };
        let var_name = &result[abs_start + 2..abs_start + end];

        if !ALLOWED_ENV_VARS.contains(&var_name) {
            warn!(
                "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                var_name
            );
            pos = abs_start + end + 1;
            continue;
        }

        let value = std::env::var(var_name).unwrap_or_default();
        result = format!(
            "{}{}{}",
            &result[..abs_start],
            value,
            &result[abs_start + end + 1..]
        );
        pos = abs_start + value.len();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        }
        path
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = write_config(&temp, "");
        let config = HealixConfig::load(&Some(path)).unwrap();

        assert_eq!(config.model.base_url, "http://localhost:11434");
        assert_eq!(config.model.max_retries, 2);
        assert!(config.model.api_key().is_none());
        assert!(config.embeddings.enabled);
        assert_eq!(config.store.max_concurrent_queries, 4);
        assert_eq!(config.orchestrator.max_tool_rounds, 5);
        assert_eq!(config.threads.capacity, 1024);
        assert_eq!(config.threads.idle_ttl_secs, 3600);
    }

    #[test]
    fn test_partial_sections() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            &temp,
            r#"
[model]
model = "llama3.1:8b"
temperature = 0.2

[embeddings]
enabled = false

[orchestrator]
model_timeout_secs = 30
"#,
        );
        let config = HealixConfig::load(&Some(path)).unwrap();
        assert_eq!(config.model.model, "llama3.1:8b");
        assert_eq!(config.model.sampling().temperature, 0.2);
        assert_eq!(config.model.max_tokens, 2048);
        assert!(!config.embeddings.enabled);

        let runtime = config.orchestrator.to_runtime();
        assert_eq!(runtime.model_timeout, Duration::from_secs(30));
        assert_eq!(runtime.history_window, 6);
    }

    #[test]
    fn test_shipped_default_config_parses() {
        let config: HealixConfig =
            toml::from_str(include_str!("../../../config/default.toml")).unwrap();
        assert_eq!(config.store.db_path, "~/.healix/healix.db");
        assert_eq!(config.orchestrator.max_tool_output, 16_000);
    }

    #[test]
    fn test_missing_file_points_at_init() {
        let temp = TempDir::new().unwrap();
        let err = HealixConfig::load(&Some(temp.path().join("nope.toml"))).unwrap_err();
        assert!(format!("{:#}", err).contains("healix init"));
    }

    #[test]
    fn test_malformed_file() {
        let temp = TempDir::new().unwrap();
        let path = write_config(&temp, "[model\nbase_url = 3");
        assert!(HealixConfig::load(&Some(path)).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_rejects_world_readable_file() {
        use std::os::unix::fs::PermissionsExt;
        let temp = TempDir::new().unwrap();
        let path = write_config(&temp, "");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        let err = HealixConfig::load(&Some(path)).unwrap_err();
        assert!(err.to_string().contains("chmod 600"));
    }

    #[test]
    fn test_unlisted_env_var_left_alone() {
        let input = "api_key = \"${AWS_SECRET_ACCESS_KEY}\"";
        assert_eq!(expand_env_vars(input), input);
        assert_eq!(expand_env_vars("no vars here"), "no vars here");
        assert_eq!(expand_env_vars("dangling ${HEALIX_HOME"), "dangling ${HEALIX_HOME");
    }

    #[test]
    fn test_allowlisted_env_var_expands() {
        // SAFETY: no other test reads or writes HEALIX_EMBED_URL
        unsafe { std::env::set_var("HEALIX_EMBED_URL", "http://gpu-box:11434") };
        assert_eq!(
            expand_env_vars("base_url = \"${HEALIX_EMBED_URL}\" # ${OTHER}"),
            "base_url = \"http://gpu-box:11434\" # ${OTHER}"
        );
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(empty)");
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("sk-1234567890abcd"), "sk-...abcd");

        let model = ModelConfig {
            api_key: "sk-1234567890abcd".to_string(),
            ..Default::default()
        };
        let debug = format!("{:?}", model);
        assert!(debug.contains("sk-...abcd"));
        assert!(!debug.contains("1234567890"));
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(expand_path("/var/lib/healix.db"), PathBuf::from("/var/lib/healix.db"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/.healix/x"), home.join(".healix/x"));
        }
    }
}
