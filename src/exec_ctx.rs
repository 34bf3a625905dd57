//! Execution context for generator calls.
//!
//! [`ExecCtx`] carries the HTTP client, backend, endpoint, transport retry
//! policy, per-call timeout, cancellation handle, and optional event
//! handler. Build it once and share it across every run.

use crate::backend::{self, Backend, BackoffConfig};
#[cfg(feature = "openai")]
use crate::backend::OpenAiBackend;
use crate::error::{AgentError, Result};
use crate::events::EventHandler;
use reqwest::Client;
use std::sync::{atomic::AtomicBool, Arc};
use std::time::Duration;

/// Default deadline for a single generator call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Shared execution context for generator calls.
///
/// # Example
///
/// ```
/// use extraction_agent::{ExecCtx, MockBackend};
/// use std::sync::Arc;
///
/// let ctx = ExecCtx::builder("http://unused")
///     .backend(Arc::new(MockBackend::fixed("{}")))
///     .build()
///     .unwrap();
/// assert_eq!(ctx.backend.name(), "mock");
/// ```
pub struct ExecCtx {
    /// HTTP client (cheap to clone, uses `Arc` internally).
    pub client: Client,
    /// Provider base URL (e.g. `https://api.openai.com`).
    pub base_url: String,
    /// Generation backend.
    pub backend: Arc<dyn Backend>,
    /// Transport retry configuration.
    pub backoff: BackoffConfig,
    /// Deadline for each individual backend call.
    pub timeout: Duration,
    /// Optional cancellation flag, checked before every call and retry.
    pub cancellation: Option<Arc<AtomicBool>>,
    /// Optional event handler for transport retry notifications.
    pub event_handler: Option<Arc<dyn EventHandler>>,
}

impl ExecCtx {
    pub fn builder(base_url: impl Into<String>) -> ExecCtxBuilder {
        ExecCtxBuilder {
            client: None,
            base_url: base_url.into(),
            backend: None,
            backoff: None,
            timeout: None,
            cancellation: None,
            event_handler: None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        backend::flag_raised(self.cancellation.as_deref())
    }

    /// Return an error if cancellation has been requested.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        Ok(())
    }
}

impl std::fmt::Debug for ExecCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecCtx")
            .field("base_url", &self.base_url)
            .field("backend", &self.backend.name())
            .field("backoff", &self.backoff)
            .field("timeout", &self.timeout)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("has_event_handler", &self.event_handler.is_some())
            .finish()
    }
}

/// Builder for [`ExecCtx`].
pub struct ExecCtxBuilder {
    client: Option<Client>,
    base_url: String,
    backend: Option<Arc<dyn Backend>>,
    backoff: Option<BackoffConfig>,
    timeout: Option<Duration>,
    cancellation: Option<Arc<AtomicBool>>,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl ExecCtxBuilder {
    /// Set the HTTP client. If not set, one is built with the configured timeout.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use the OpenAI-compatible backend with API key authentication.
    #[cfg(feature = "openai")]
    pub fn openai_with_key(mut self, api_key: impl Into<String>) -> Self {
        self.backend = Some(Arc::new(OpenAiBackend::new().with_api_key(api_key)));
        self
    }

    /// Set the transport retry configuration. Default: [`BackoffConfig::standard()`].
    pub fn backoff(mut self, config: BackoffConfig) -> Self {
        self.backoff = Some(config);
        self
    }

    /// Set the per-call timeout. Default: 60 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancellation(mut self, cancel: Option<Arc<AtomicBool>>) -> Self {
        self.cancellation = cancel;
        self
    }

    pub fn event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Build the execution context.
    ///
    /// Without an explicit backend this falls back to an unauthenticated
    /// [`OpenAiBackend`] (feature `openai`), or fails.
    pub fn build(self) -> Result<ExecCtx> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = match self.client {
            Some(client) => client,
            None => Client::builder().timeout(timeout).build()?,
        };
        let backend = match self.backend {
            Some(backend) => backend,
            None => default_backend()?,
        };
        Ok(ExecCtx {
            client,
            base_url: normalize_base_url(&self.base_url),
            backend,
            backoff: self.backoff.unwrap_or_default(),
            timeout,
            cancellation: self.cancellation,
            event_handler: self.event_handler,
        })
    }
}

#[cfg(feature = "openai")]
fn default_backend() -> Result<Arc<dyn Backend>> {
    Ok(Arc::new(OpenAiBackend::new()))
}

#[cfg(not(feature = "openai"))]
fn default_backend() -> Result<Arc<dyn Backend>> {
    Err(AgentError::InvalidConfig(
        "no backend configured; call ExecCtxBuilder::backend".into(),
    ))
}

/// Strip known provider path suffixes so the backend can append its own.
/// e.g. `"https://api.openai.com/v1"` -> `"https://api.openai.com"`
fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    for suffix in &["/v1/chat/completions", "/v1/chat", "/v1"] {
        if let Some(stripped) = trimmed.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    trimmed.to_string()
}
