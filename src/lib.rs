//! # Extraction Agent
//!
//! Turn messy, human-written employee records into a schema-valid JSON
//! document, using a text generator for the extraction and a strict
//! validator as the gatekeeper.
//!
//! Every run is a small state machine: **extract** with the generator,
//! **validate** the raw output against the schema, and on failure
//! **correct** by sending the previous output plus the exact validation
//! error back to the generator. This repeats until a document validates or
//! the attempt budget is spent. Nothing the generator returns is trusted
//! until it validates, and every step lands in an append-only audit log.
//!
//! ## Core Concepts
//!
//! - **[`Generator`]**: the injected capability (`system prompt + JSON
//!   payload -> raw text`). [`BackendGenerator`] wraps a [`Backend`] with
//!   timeout and transport retry; [`ReplayGenerator`] serves canned output.
//! - **[`validate`]**: strict parse plus field validators, all-or-nothing.
//! - **[`RetryController`]**: drives the loop and returns a [`RunOutcome`]
//!   (result or exhausted budget) or a [`RunFailure`] (transport error,
//!   cancellation) that still carries the partial log.
//! - **[`eval`]**: batch runs over a directory with a summary report.
//!
//! ## Quick Start
//!
//! ```no_run
//! use extraction_agent::{AgentConfig, BackendGenerator, RetryController};
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AgentConfig::load(None)?;
//!     let api_key = std::env::var("OPENAI_API_KEY")?;
//!     let cancel = Arc::new(AtomicBool::new(false));
//!     let generator = BackendGenerator::openai(&config, api_key, Some(cancel.clone()))?;
//!     let controller = RetryController::from_config(Arc::new(generator), &config)?
//!         .with_cancellation(cancel);
//!
//!     let outcome = controller
//!         .run("Michael Chen, id 101, 29 yrs, AI team, joined 2024-01-01")
//!         .await?;
//!     match outcome.result {
//!         Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
//!         None => println!("no valid document after {} attempts", outcome.attempts),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Offline
//!
//! ```
//! use extraction_agent::harness::run_offline;
//!
//! let outcome = run_offline(
//!     "Sam (no id), 41, Data Science",
//!     vec![r#"{"employees": [], "rejected": [{"raw_record": "Sam (no id), 41, Data Science", "reasons": ["missing user_id"]}]}"#.into()],
//!     3,
//! )
//! .unwrap();
//! assert!(outcome.passed());
//! assert!(outcome.result.unwrap().is_all_rejected());
//! ```

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod eval;
pub mod events;
pub mod exec_ctx;
pub mod generation;
pub mod harness;
pub mod prompts;
pub mod safe_json;
pub mod schema;
pub mod validator;

pub use backend::{Backend, BackoffConfig, LlmRequest, LlmResponse, MockBackend, MockReply};
#[cfg(feature = "openai")]
pub use backend::OpenAiBackend;
pub use config::{AgentConfig, LlmConfig};
pub use controller::{
    AgentRunState, LogEntry, RetryController, RunFailure, RunOutcome, Step, ValidationStatus,
};
pub use error::{AgentError, Result};
pub use eval::{EvalCase, Expectation, SuiteReport, SuiteSummary};
pub use events::{Event, EventHandler, FnEventHandler};
pub use exec_ctx::{ExecCtx, ExecCtxBuilder};
pub use generation::{BackendGenerator, GenerationAdapter, Generator};
pub use harness::{run_offline, ReplayGenerator};
pub use safe_json::{to_safe_value, JsonSafe};
pub use schema::{Department, Employee, ExtractionResult, RejectedRecord, Violation};
pub use validator::{validate, ValidationError};
