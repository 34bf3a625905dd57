//! Scripted backend for tests and offline demos.
//!
//! [`MockBackend`] plays back a fixed script of replies in order, cycling
//! when the script runs out, and records every request it receives.
//!
//! ```
//! use extraction_agent::backend::{MockBackend, MockReply};
//!
//! let flaky = MockBackend::scripted(vec![
//!     MockReply::Status(503),
//!     MockReply::Text(r#"{"employees": [], "rejected": []}"#.into()),
//! ]);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{Backend, LlmRequest, LlmResponse};
use crate::error::{AgentError, Result};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// A successful completion with this text.
    Text(String),
    /// A non-success HTTP status.
    Status(u16),
}

/// A test backend that returns scripted replies in order.
#[derive(Debug)]
pub struct MockBackend {
    script: Vec<MockReply>,
    index: AtomicUsize,
    latency: Option<Duration>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockBackend {
    /// Successful replies in order, cycling when exhausted.
    pub fn new(responses: Vec<String>) -> Self {
        Self::scripted(responses.into_iter().map(MockReply::Text).collect())
    }

    /// A mock that always returns the same text.
    pub fn fixed(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Arbitrary mix of text replies and HTTP failures.
    pub fn scripted(script: Vec<MockReply>) -> Self {
        assert!(!script.is_empty(), "MockBackend requires at least one reply");
        Self {
            script,
            index: AtomicUsize::new(0),
            latency: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Sleep this long before answering each call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::Relaxed)
    }

    /// Copies of every request received, in order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self) -> MockReply {
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % self.script.len();
        self.script[idx].clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn complete(
        &self,
        _client: &Client,
        _base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }
        match self.next_reply() {
            MockReply::Text(text) => Ok(LlmResponse {
                text,
                status: 200,
                metadata: None,
            }),
            MockReply::Status(status) => Err(AgentError::HttpError {
                status,
                body: "scripted failure".into(),
                retry_after: None,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
