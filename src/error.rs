use std::time::Duration;
use thiserror::Error;

/// Errors that abort a step of the extraction agent.
///
/// Schema violations are deliberately absent: a document that fails
/// validation is an ordinary value ([`ValidationError`](crate::validator::ValidationError))
/// that the retry controller feeds back into a correction call.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Low-level HTTP transport failure (connection refused, reset, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON (de)serialization failed outside of document validation.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error with status code, response body, and optional Retry-After hint.
    ///
    /// Returned by [`Backend`](crate::backend::Backend) implementations when
    /// the provider returns a non-success status code.
    #[error("HTTP {status}: {body}")]
    HttpError {
        /// HTTP status code (e.g. 429, 500, 503).
        status: u16,
        /// Response body text.
        body: String,
        /// Parsed `Retry-After` header value, if present.
        retry_after: Option<Duration>,
    },

    /// A single generator call exceeded its deadline.
    #[error("generator call timed out after {0:?}")]
    Timeout(Duration),

    /// The run was cancelled via the cancellation flag.
    #[error("run was cancelled")]
    Cancelled,

    /// Invalid configuration detected at build time.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading evaluation inputs from disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration sources could not be merged or extracted.
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// An offline replay ran out of canned outputs.
    #[error("replay exhausted after {served} canned outputs")]
    ReplayExhausted { served: usize },

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Whether this error means the generator could not be reached or did
    /// not answer (as opposed to answering with unusable content).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AgentError::Request(_) | AgentError::HttpError { .. } | AgentError::Timeout(_)
        )
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
