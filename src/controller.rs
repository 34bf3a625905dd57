//! Retry controller: the extract → validate → correct state machine.
//!
//! ```text
//!            ┌──────────┐   always   ┌──────────┐  pass, or fail with
//!  start ──► │ extract  │ ─────────► │ validate │ ─ budget spent ──► finalize
//!            └──────────┘            └──────────┘
//!                                      ▲     │ fail, attempts left
//!                          always      │     ▼
//!                                    ┌──────────┐
//!                                    │ correct  │  (attempt += 1)
//!                                    └──────────┘
//! ```
//!
//! [`AgentRunState`] is an owned value threaded through pure transition
//! functions; each returns the next state. Only this module mutates it,
//! and the audit log is append-only. [`RetryController::run`] drives the
//! transitions and performs the generator calls between them.

use crate::backend::flag_raised;
use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::events::{emit, Event, EventHandler};
use crate::generation::{GenerationAdapter, Generator};
use crate::schema::ExtractionResult;
use crate::validator::{self, truncate, ValidationError, LOG_TEXT_LIMIT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// States of the controller. `Finalize` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Extract,
    Validate,
    Correct,
    Finalize,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Extract => "extract",
            Step::Validate => "validate",
            Step::Correct => "correct",
            Step::Finalize => "finalize",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Pass,
    Fail,
}

/// One immutable audit record. Serializes as
/// `{"step": "...", "attempt": n, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "lowercase")]
pub enum LogEntry {
    Extract {
        attempt: u32,
        output: String,
    },
    Validate {
        attempt: u32,
        status: ValidationStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Correct {
        attempt: u32,
        output: String,
    },
}

impl LogEntry {
    pub fn step(&self) -> Step {
        match self {
            LogEntry::Extract { .. } => Step::Extract,
            LogEntry::Validate { .. } => Step::Validate,
            LogEntry::Correct { .. } => Step::Correct,
        }
    }

    pub fn attempt(&self) -> u32 {
        match self {
            LogEntry::Extract { attempt, .. }
            | LogEntry::Validate { attempt, .. }
            | LogEntry::Correct { attempt, .. } => *attempt,
        }
    }

    pub fn is_failed_validation(&self) -> bool {
        matches!(
            self,
            LogEntry::Validate {
                status: ValidationStatus::Fail,
                ..
            }
        )
    }
}

/// State of one run, owned exclusively by the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRunState {
    raw_text: String,
    attempt: u32,
    max_attempts: u32,
    last_raw_text: String,
    validation_error: String,
    result: Option<ExtractionResult>,
    log: Vec<LogEntry>,
}

impl AgentRunState {
    /// Fresh state at attempt 1. `max_attempts` must be at least 1.
    pub fn new(raw_text: impl Into<String>, max_attempts: u32) -> Result<Self> {
        if max_attempts == 0 {
            return Err(AgentError::InvalidConfig(
                "max_attempts must be at least 1".into(),
            ));
        }
        Ok(Self {
            raw_text: raw_text.into(),
            attempt: 1,
            max_attempts,
            last_raw_text: String::new(),
            validation_error: String::new(),
            result: None,
            log: Vec::new(),
        })
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn last_raw_text(&self) -> &str {
        &self.last_raw_text
    }

    /// Empty when the last validation passed (or none has run yet).
    pub fn validation_error(&self) -> &str {
        &self.validation_error
    }

    pub fn result(&self) -> Option<&ExtractionResult> {
        self.result.as_ref()
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// `extract → validate`: record the generator's first output.
    pub fn after_extract(mut self, output: String) -> Self {
        self.log.push(LogEntry::Extract {
            attempt: self.attempt,
            output: truncate(&output, LOG_TEXT_LIMIT),
        });
        self.last_raw_text = output;
        self
    }

    /// Apply a validation outcome. The next step is [`Self::next_after_validate`].
    pub fn after_validate(
        mut self,
        outcome: std::result::Result<ExtractionResult, ValidationError>,
    ) -> Self {
        match outcome {
            Ok(result) => {
                self.result = Some(result);
                self.validation_error.clear();
                self.log.push(LogEntry::Validate {
                    attempt: self.attempt,
                    status: ValidationStatus::Pass,
                    error: None,
                });
            }
            Err(err) => {
                self.result = None;
                self.validation_error = err.to_string();
                self.log.push(LogEntry::Validate {
                    attempt: self.attempt,
                    status: ValidationStatus::Fail,
                    error: Some(err.truncated(LOG_TEXT_LIMIT)),
                });
            }
        }
        self
    }

    /// `validate → finalize | correct`.
    pub fn next_after_validate(&self) -> Step {
        if self.result.is_some() || self.attempt >= self.max_attempts {
            Step::Finalize
        } else {
            Step::Correct
        }
    }

    /// `correct → validate`: record the corrective output under the
    /// attempt it repairs, then advance the counter.
    pub fn after_correct(mut self, output: String) -> Self {
        self.log.push(LogEntry::Correct {
            attempt: self.attempt,
            output: truncate(&output, LOG_TEXT_LIMIT),
        });
        self.last_raw_text = output;
        self.attempt += 1;
        self
    }

    /// Terminal transition.
    pub fn finish(self) -> RunOutcome {
        RunOutcome {
            result: self.result,
            log: self.log,
            last_raw_text: self.last_raw_text,
            attempts: self.attempt,
        }
    }

    /// Abort with a hard failure, preserving the log as it stands.
    pub fn abort(self, step: Step, reason: AgentError) -> RunFailure {
        RunFailure {
            reason,
            step,
            attempt: self.attempt,
            log: self.log,
            last_raw_text: self.last_raw_text,
        }
    }
}

/// Terminal output of a run that reached `finalize`.
///
/// `result` is `None` when every attempt failed validation. Serializes as
/// `{"result": ..., "log": [...], "last_raw_text": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    pub result: Option<ExtractionResult>,
    pub log: Vec<LogEntry>,
    pub last_raw_text: String,
    /// Attempt counter at finalize.
    #[serde(skip)]
    pub attempts: u32,
}

impl RunOutcome {
    pub fn passed(&self) -> bool {
        self.result.is_some()
    }

    /// Highest attempt number recorded in the log (0 for an empty log).
    pub fn attempts_used(&self) -> u32 {
        self.log.iter().map(LogEntry::attempt).max().unwrap_or(0)
    }

    /// Number of log entries for `step`.
    pub fn count(&self, step: Step) -> usize {
        self.log.iter().filter(|e| e.step() == step).count()
    }
}

/// A run that could not reach `finalize`: transport failure, cancellation,
/// or an exhausted replay. Distinct from a budget-exhausted [`RunOutcome`].
#[derive(Debug, Error)]
#[error("run aborted during {step} at attempt {attempt}: {reason}")]
pub struct RunFailure {
    #[source]
    pub reason: AgentError,
    pub step: Step,
    pub attempt: u32,
    /// Everything logged before the failure, unmodified.
    pub log: Vec<LogEntry>,
    pub last_raw_text: String,
}

/// Drives one run at a time through the state machine.
///
/// # Example
///
/// ```
/// use extraction_agent::{harness::ReplayGenerator, RetryController};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let generator = Arc::new(ReplayGenerator::new(vec![
///     r#"{"employees": [], "rejected": [{"raw_record": "Sam", "reasons": ["missing user_id"]}]}"#.into(),
/// ]));
/// let controller = RetryController::new(generator, 3).unwrap();
/// let outcome = controller.run("Sam, 34, AI").await.unwrap();
/// assert!(outcome.passed());
/// # });
/// ```
#[derive(Clone)]
pub struct RetryController {
    adapter: GenerationAdapter,
    max_attempts: u32,
    cancellation: Option<Arc<AtomicBool>>,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl RetryController {
    pub fn new(generator: Arc<dyn Generator>, max_attempts: u32) -> Result<Self> {
        if max_attempts == 0 {
            return Err(AgentError::InvalidConfig(
                "max_attempts must be at least 1".into(),
            ));
        }
        Ok(Self {
            adapter: GenerationAdapter::new(generator),
            max_attempts,
            cancellation: None,
            event_handler: None,
        })
    }

    /// Build with the attempt budget from loaded configuration.
    pub fn from_config(generator: Arc<dyn Generator>, config: &AgentConfig) -> Result<Self> {
        Self::new(generator, config.max_attempts)
    }

    /// Abort at the next step boundary once this flag is raised.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancellation = Some(flag);
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run the loop to a terminal state.
    ///
    /// `Ok` covers both a validated result and an exhausted budget;
    /// `Err` is reserved for hard failures, carrying the partial log.
    pub async fn run(
        &self,
        raw_text: impl Into<String>,
    ) -> std::result::Result<RunOutcome, RunFailure> {
        let mut state = AgentRunState::new(raw_text, self.max_attempts)
            .map_err(|e| RunFailure {
                reason: e,
                step: Step::Extract,
                attempt: 0,
                log: Vec::new(),
                last_raw_text: String::new(),
            })?;
        let mut step = Step::Extract;

        loop {
            if flag_raised(self.cancellation.as_deref()) {
                warn!(%step, attempt = state.attempt(), "run cancelled");
                return Err(state.abort(step, AgentError::Cancelled));
            }
            if step != Step::Finalize {
                debug!(%step, attempt = state.attempt(), "step");
                emit(
                    &self.event_handler,
                    Event::StepStarted {
                        step,
                        attempt: state.attempt(),
                    },
                );
            }

            step = match step {
                Step::Extract => {
                    let generated = self.adapter.extract(state.raw_text()).await;
                    match generated {
                        Ok(output) => {
                            state = state.after_extract(output);
                            Step::Validate
                        }
                        Err(e) => return Err(self.fail(state, Step::Extract, e)),
                    }
                }
                Step::Validate => {
                    let outcome = validator::validate(state.last_raw_text());
                    if let Err(ref err) = outcome {
                        debug!(
                            attempt = state.attempt(),
                            violations = err.violations.len(),
                            "validation failed"
                        );
                        emit(
                            &self.event_handler,
                            Event::ValidationFailed {
                                attempt: state.attempt(),
                                error: err.truncated(LOG_TEXT_LIMIT),
                            },
                        );
                    }
                    state = state.after_validate(outcome);
                    state.next_after_validate()
                }
                Step::Correct => {
                    let generated = self
                        .adapter
                        .correct(state.last_raw_text(), state.validation_error())
                        .await;
                    match generated {
                        Ok(output) => {
                            state = state.after_correct(output);
                            Step::Validate
                        }
                        Err(e) => return Err(self.fail(state, Step::Correct, e)),
                    }
                }
                Step::Finalize => {
                    let outcome = state.finish();
                    if outcome.passed() {
                        info!(attempts = outcome.attempts, "run finished with a valid result");
                    } else {
                        warn!(attempts = outcome.attempts, "attempt budget exhausted without a valid result");
                    }
                    emit(
                        &self.event_handler,
                        Event::RunFinished {
                            passed: outcome.passed(),
                            attempts: outcome.attempts,
                        },
                    );
                    return Ok(outcome);
                }
            };
        }
    }

    fn fail(&self, state: AgentRunState, step: Step, reason: AgentError) -> RunFailure {
        warn!(%step, attempt = state.attempt(), error = %reason, transport = reason.is_transport(), "run aborted");
        state.abort(step, reason)
    }
}

impl fmt::Debug for RetryController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryController")
            .field("max_attempts", &self.max_attempts)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("has_event_handler", &self.event_handler.is_some())
            .finish()
    }
}
