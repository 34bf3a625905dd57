//! Backend trait and normalized request/response types.
//!
//! A [`Backend`] turns one [`LlmRequest`] (system prompt + JSON user payload)
//! into raw text. Transport-level retry lives in [`with_backoff`]; it only
//! ever retries faults of the wire (429, 5xx, connection errors, timeouts),
//! never the content of a reply.
//!
//! ```text
//! GenerationAdapter ──► BackendGenerator ──► with_backoff ──► Backend::complete()
//!                                                                │
//!                                                    ┌───────────┴──────────┐
//!                                               OpenAiBackend           MockBackend
//!                                           /v1/chat/completions     scripted replies
//! ```

pub mod backoff;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;

pub use backoff::BackoffConfig;
pub use mock::{MockBackend, MockReply};
#[cfg(feature = "openai")]
pub use openai::OpenAiBackend;

use crate::config::LlmConfig;
use crate::error::{AgentError, Result};
use crate::exec_ctx::ExecCtx;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// Type alias for the callback invoked before each transport retry.
///
/// Arguments: `(attempt_number, delay_before_retry, reason_for_retry)`.
pub type RetryCallback<'a> = Option<&'a mut (dyn FnMut(u32, Duration, &str) + Send)>;

/// A normalized, provider-agnostic generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    /// Model identifier (e.g. `"gpt-4.1-mini"`).
    pub model: String,

    /// The fixed system instruction for this step.
    pub system_prompt: String,

    /// The user message: a serialized JSON payload.
    pub user_payload: String,

    /// Temperature, token limit, JSON mode.
    pub config: LlmConfig,
}

/// A normalized LLM response.
#[derive(Debug)]
pub struct LlmResponse {
    /// The generated text content, untrimmed.
    pub text: String,

    /// HTTP status code (for diagnostics/logging).
    pub status: u16,

    /// Provider-specific metadata (token usage, model, response id).
    pub metadata: Option<serde_json::Value>,
}

/// Abstraction over text-generation providers.
///
/// This trait is object-safe and designed to be used as `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Execute a single non-streaming completion.
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Check whether an error is a transient transport fault worth retrying.
///
/// Retryable conditions:
/// - [`AgentError::HttpError`] with a status in `config.retryable_statuses`
/// - [`AgentError::Request`] (connection/transport errors)
/// - [`AgentError::Timeout`]
pub fn is_retryable(error: &AgentError, config: &BackoffConfig) -> bool {
    match error {
        AgentError::HttpError { status, .. } => config.retryable_statuses.contains(status),
        AgentError::Request(_) | AgentError::Timeout(_) => true,
        _ => false,
    }
}

/// Execute a backend call with a per-call deadline and transport retry.
///
/// Each attempt is bounded by `ctx.timeout`. Between attempts the delay
/// comes from `ctx.backoff` (or the provider's `Retry-After`), and the
/// cancellation flag is checked before and after every sleep.
///
/// Returns the first successful response, or the last error once the
/// retry budget is spent or a non-retryable error occurs.
pub async fn with_backoff(
    ctx: &ExecCtx,
    request: &LlmRequest,
    mut on_retry: RetryCallback<'_>,
) -> Result<LlmResponse> {
    let config = &ctx.backoff;
    let mut last_error: Option<AgentError> = None;

    for attempt in 0..=config.max_retries {
        ctx.check_cancelled()?;

        if attempt > 0 {
            let delay = match &last_error {
                Some(AgentError::HttpError {
                    retry_after: Some(ra),
                    ..
                }) if config.respect_retry_after => (*ra).min(config.max_delay),
                _ => config.delay_for_attempt(attempt - 1),
            };

            let reason = last_error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default();

            if let Some(ref mut cb) = on_retry {
                cb(attempt, delay, &reason);
            }

            tokio::time::sleep(delay).await;
            ctx.check_cancelled()?;
        }

        let call = ctx.backend.complete(&ctx.client, &ctx.base_url, request);
        let outcome = match tokio::time::timeout(ctx.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::Timeout(ctx.timeout)),
        };

        match outcome {
            Ok(response) => return Ok(response),
            Err(e) => {
                if attempt < config.max_retries && is_retryable(&e, config) {
                    last_error = Some(e);
                    continue;
                }
                return Err(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| AgentError::Other("backoff loop exited unexpectedly".into())))
}

/// Whether a cancellation flag has been raised.
pub(crate) fn flag_raised(flag: Option<&std::sync::atomic::AtomicBool>) -> bool {
    flag.is_some_and(|f| f.load(Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn request() -> LlmRequest {
        LlmRequest {
            model: "test".into(),
            system_prompt: "sys".into(),
            user_payload: "{}".into(),
            config: LlmConfig::default(),
        }
    }

    fn fast_backoff(max_retries: u32) -> BackoffConfig {
        BackoffConfig {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            ..BackoffConfig::standard()
        }
    }

    #[test]
    fn test_is_retryable_statuses() {
        let config = BackoffConfig::standard();
        for (status, expected) in [(429, true), (503, true), (400, false), (401, false)] {
            let err = AgentError::HttpError {
                status,
                body: String::new(),
                retry_after: None,
            };
            assert_eq!(is_retryable(&err, &config), expected, "status {}", status);
        }
    }

    #[test]
    fn test_is_retryable_other_errors() {
        let config = BackoffConfig::standard();
        assert!(is_retryable(&AgentError::Timeout(Duration::from_secs(1)), &config));
        assert!(!is_retryable(&AgentError::Cancelled, &config));
        assert!(!is_retryable(&AgentError::Other("x".into()), &config));
    }

    #[tokio::test]
    async fn test_backoff_recovers_from_transient_status() {
        let mock = Arc::new(MockBackend::scripted(vec![
            MockReply::Status(503),
            MockReply::Status(429),
            MockReply::Text("ok".into()),
        ]));
        let ctx = ExecCtx::builder("http://unused")
            .backend(mock.clone())
            .backoff(fast_backoff(3))
            .build()
            .unwrap();

        let mut retries = Vec::new();
        let mut on_retry = |attempt: u32, _delay: Duration, reason: &str| {
            retries.push((attempt, reason.to_string()));
        };
        let resp = with_backoff(&ctx, &request(), Some(&mut on_retry)).await.unwrap();

        assert_eq!(resp.text, "ok");
        assert_eq!(mock.calls(), 3);
        assert_eq!(retries.len(), 2);
        assert!(retries[0].1.contains("503"));
    }

    #[tokio::test]
    async fn test_backoff_does_not_retry_client_errors() {
        let mock = Arc::new(MockBackend::scripted(vec![
            MockReply::Status(400),
            MockReply::Text("never".into()),
        ]));
        let ctx = ExecCtx::builder("http://unused")
            .backend(mock.clone())
            .backoff(fast_backoff(3))
            .build()
            .unwrap();

        let err = with_backoff(&ctx, &request(), None).await.unwrap_err();
        assert!(matches!(err, AgentError::HttpError { status: 400, .. }));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_backoff_gives_up_after_budget() {
        let mock = Arc::new(MockBackend::scripted(vec![MockReply::Status(500)]));
        let ctx = ExecCtx::builder("http://unused")
            .backend(mock.clone())
            .backoff(fast_backoff(2))
            .build()
            .unwrap();

        let err = with_backoff(&ctx, &request(), None).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_backoff_times_out_slow_backend() {
        let mock = Arc::new(
            MockBackend::fixed("late").with_latency(Duration::from_millis(200)),
        );
        let ctx = ExecCtx::builder("http://unused")
            .backend(mock)
            .backoff(BackoffConfig::none())
            .timeout(Duration::from_millis(10))
            .build()
            .unwrap();

        let err = with_backoff(&ctx, &request(), None).await.unwrap_err();
        assert!(matches!(err, AgentError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_backoff_respects_cancellation() {
        let cancel = Arc::new(AtomicBool::new(true));
        let mock = Arc::new(MockBackend::fixed("x"));
        let ctx = ExecCtx::builder("http://unused")
            .backend(mock.clone())
            .cancellation(Some(cancel))
            .build()
            .unwrap();

        let result = with_backoff(&ctx, &request(), None).await;
        assert!(matches!(result.unwrap_err(), AgentError::Cancelled));
        assert_eq!(mock.calls(), 0);
    }
}
