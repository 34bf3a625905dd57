//! Generation adapter: the boundary to the external text generator.
//!
//! [`Generator`] is the single injected capability, one method mapping
//! `(system_prompt, user_payload)` to raw text. [`BackendGenerator`] is the
//! production implementation over an [`ExecCtx`]; the offline harness
//! supplies [`ReplayGenerator`](crate::harness::ReplayGenerator).
//!
//! [`GenerationAdapter`] binds the two fixed prompts onto a generator. It
//! performs no parsing and no validation; transport errors propagate
//! unchanged as a hard failure of the current step.

use crate::backend::{self, LlmRequest};
use crate::config::{AgentConfig, LlmConfig};
use crate::error::Result;
use crate::events::{emit, Event};
use crate::exec_ctx::ExecCtx;
use crate::prompts::{correct_payload, extract_payload, CORRECT_SYSTEM, EXTRACT_SYSTEM};
use async_trait::async_trait;
use serde_json::Value;
#[cfg(feature = "openai")]
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// The external text generator, seen as an opaque function.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, system_prompt: &str, user_payload: &Value) -> Result<String>;
}

/// A [`Generator`] that calls a [`Backend`](crate::backend::Backend) with
/// timeout and transport-level retry.
#[derive(Debug)]
pub struct BackendGenerator {
    ctx: Arc<ExecCtx>,
    model: String,
    config: LlmConfig,
}

impl BackendGenerator {
    pub fn new(ctx: Arc<ExecCtx>, model: impl Into<String>) -> Self {
        Self {
            ctx,
            model: model.into(),
            config: LlmConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LlmConfig) -> Self {
        self.config = config;
        self
    }

    /// Build an OpenAI-backed generator from loaded configuration.
    ///
    /// Pass the same flag given to
    /// [`RetryController::with_cancellation`](crate::RetryController::with_cancellation)
    /// so a cancel also interrupts transport retries in flight.
    #[cfg(feature = "openai")]
    pub fn openai(
        config: &AgentConfig,
        api_key: impl Into<String>,
        cancellation: Option<Arc<AtomicBool>>,
    ) -> Result<Self> {
        config.validate()?;
        let ctx = ExecCtx::builder(config.base_url.clone())
            .openai_with_key(api_key)
            .backoff(config.backoff())
            .timeout(config.timeout())
            .cancellation(cancellation)
            .build()?;
        Ok(Self::new(Arc::new(ctx), config.model.clone()).with_config(config.llm.clone()))
    }

    /// Build over an existing context, taking model and sampling settings
    /// from configuration.
    pub fn from_config(ctx: Arc<ExecCtx>, config: &AgentConfig) -> Self {
        Self::new(ctx, config.model.clone()).with_config(config.llm.clone())
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Generator for BackendGenerator {
    async fn generate(&self, system_prompt: &str, user_payload: &Value) -> Result<String> {
        let request = LlmRequest {
            model: self.model.clone(),
            system_prompt: system_prompt.to_string(),
            user_payload: serde_json::to_string(user_payload)?,
            config: self.config.clone(),
        };

        let event_handler = self.ctx.event_handler.clone();
        let mut on_retry = |attempt: u32, delay: Duration, reason: &str| {
            warn!(attempt, delay_ms = delay.as_millis() as u64, %reason, "transport retry");
            emit(
                &event_handler,
                Event::TransportRetry {
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                    reason: reason.to_string(),
                },
            );
        };

        let response = backend::with_backoff(&self.ctx, &request, Some(&mut on_retry)).await?;
        debug!(
            backend = self.ctx.backend.name(),
            status = response.status,
            chars = response.text.len(),
            "generator replied"
        );
        Ok(response.text)
    }
}

/// The two boundary operations of the agent.
#[derive(Clone)]
pub struct GenerationAdapter {
    generator: Arc<dyn Generator>,
}

impl GenerationAdapter {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Initial extraction over the raw input. Output is trimmed, nothing more.
    pub async fn extract(&self, raw_text: &str) -> Result<String> {
        let out = self
            .generator
            .generate(EXTRACT_SYSTEM, &extract_payload(raw_text))
            .await?;
        Ok(out.trim().to_string())
    }

    /// Corrective call: the previous output plus the validation feedback.
    pub async fn correct(&self, previous_raw_text: &str, validation_error: &str) -> Result<String> {
        let out = self
            .generator
            .generate(
                CORRECT_SYSTEM,
                &correct_payload(previous_raw_text, validation_error),
            )
            .await?;
        Ok(out.trim().to_string())
    }
}

impl std::fmt::Debug for GenerationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationAdapter").finish_non_exhaustive()
    }
}
