//! Bounded retry with exponential backoff around a single provider

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{ChatMessage, ChatResponse, LlmProvider, ToolDefinition};

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Retries retryable failures of the inner provider. Non-retryable errors
/// (bad request, malformed response) are returned immediately.
pub struct RetryingProvider {
    inner: Arc<dyn LlmProvider>,
    /// Extra attempts after the first
    max_retries: u32,
    base_delay: Duration,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn LlmProvider>) -> Self {
        Self {
            inner,
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        system: &str,
    ) -> Result<ChatResponse> {
        let attempts = self.max_retries + 1;
        let mut last_error = None;

        for attempt in 0..attempts {
            match self.inner.chat(messages, tools, system).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    let retryable = is_retryable_error(&format!("{:#}", e));
                    warn!(
                        "Provider {} ({}) failed (attempt {}/{}, retryable={}): {:#}",
                        self.inner.provider_name(),
                        self.inner.model(),
                        attempt + 1,
                        attempts,
                        retryable,
                        e
                    );
                    last_error = Some(e);

                    if !retryable {
                        break;
                    }
                    if attempt + 1 < attempts {
                        let delay = self.base_delay * 2u32.saturating_pow(attempt);
                        debug!("Backing off for {:?} before retry", delay);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("Chat request failed")))
    }
}

/// Rate limits, server errors and transport timeouts.
///
/// An HTTP status in the message decides on its own (429 and 5xx retry), so
/// numbers quoted in a response body are never mistaken for one.
pub fn is_retryable_error(err: &str) -> bool {
    const PATTERNS: [&str; 9] = [
        "rate limit",
        "rate_limit",
        "overloaded",
        "timeout",
        "timed out",
        "connection reset",
        "connection refused",
        "temporarily unavailable",
        "service unavailable",
    ];
    let lower = err.to_lowercase();
    if let Some(code) = status_code(&lower) {
        return code == 429 || (500..600).contains(&code);
    }
    PATTERNS.iter().any(|p| lower.contains(p))
}

/// First three-digit code following `status ` or `http `
fn status_code(lower: &str) -> Option<u16> {
    ["status ", "http "].iter().find_map(|prefix| {
        lower.match_indices(prefix).find_map(|(i, _)| {
            let start = i + prefix.len();
            let code: u16 = lower.get(start..start + 3)?.parse().ok()?;
            let rest = lower.get(start + 3..)?;
            rest.chars()
                .next()
                .is_none_or(|c| !c.is_ascii_digit())
                .then_some(code)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::types::{ChatResponseBlock, ChatUsage, StopReason};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with `error` for the first `failures` calls, then succeeds
    struct FlakyProvider {
        failures: u32,
        error: &'static str,
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        fn provider_name(&self) -> &str {
            "flaky"
        }
        fn model(&self) -> &str {
            "test"
        }
        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _tools: &[ToolDefinition],
            _system: &str,
        ) -> Result<ChatResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(anyhow!(self.error));
            }
            Ok(ChatResponse {
                blocks: vec![ChatResponseBlock::Text {
                    text: "ok".to_string(),
                }],
                stop_reason: StopReason::EndTurn,
                usage: ChatUsage::default(),
            })
        }
    }

    fn flaky(failures: u32, error: &'static str) -> Arc<FlakyProvider> {
        Arc::new(FlakyProvider {
            failures,
            error,
            calls: AtomicU32::new(0),
        })
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let inner = flaky(2, "status 503 Service Unavailable");
        let provider = RetryingProvider::new(inner.clone()).with_base_delay(Duration::from_millis(1));
        let resp = provider.chat(&[], &[], "sys").await.unwrap();
        assert_eq!(resp.text(), "ok");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let inner = flaky(10, "rate limit exceeded");
        let provider = RetryingProvider::new(inner.clone())
            .with_max_retries(1)
            .with_base_delay(Duration::from_millis(1));
        assert!(provider.chat(&[], &[], "sys").await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_fast() {
        let inner = flaky(10, "status 400: invalid model");
        let provider = RetryingProvider::new(inner.clone()).with_base_delay(Duration::from_millis(1));
        assert!(provider.chat(&[], &[], "sys").await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(is_retryable_error("HTTP 429 Too Many Requests"));
        assert!(is_retryable_error(
            "Chat request failed with status 502 Bad Gateway: upstream"
        ));
        assert!(is_retryable_error("operation timed out"));
        assert!(is_retryable_error("Connection refused (os error 111)"));
        assert!(!is_retryable_error("invalid api key"));
    }

    #[test]
    fn test_status_code_outranks_body_text() {
        assert!(!is_retryable_error(
            "Chat request failed with status 400 Bad Request: prompt is 1500 tokens over 4290"
        ));
        assert!(!is_retryable_error(
            "Chat request failed with status 422 Unprocessable Entity: timeout must be positive"
        ));
        assert!(is_retryable_error(
            "Chat request failed with status 503 Service Unavailable: model loading"
        ));
        assert!(!is_retryable_error("status 4000 items"));
    }

    #[tokio::test]
    async fn test_client_error_with_numeric_body_is_not_retried() {
        let inner = flaky(10, "Chat request failed with status 400 Bad Request: max 1500 tokens");
        let provider = RetryingProvider::new(inner.clone()).with_base_delay(Duration::from_millis(1));
        assert!(provider.chat(&[], &[], "sys").await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }
}
