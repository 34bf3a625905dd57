//! Offline test harness.
//!
//! Two ways to exercise the loop without a network:
//!
//! - [`run_offline`] feeds an ordered list of candidate outputs straight
//!   through the controller's transitions and the validator. The first
//!   candidate is the extraction, every later one a correction.
//! - [`ReplayGenerator`] is a [`Generator`] that serves canned outputs, so
//!   the real async [`RetryController`](crate::RetryController) can be
//!   driven end to end.

use crate::controller::{AgentRunState, RunOutcome, Step};
use crate::error::{AgentError, Result};
use crate::generation::Generator;
use crate::validator;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use tracing::debug;

/// Replay `candidates` through extract/validate/correct.
///
/// Stops at the first passing validation, when `max_attempts` is reached,
/// or when the candidates run out (the outcome then has no result).
///
/// # Example
///
/// ```
/// use extraction_agent::harness::run_offline;
///
/// let outcome = run_offline(
///     "Michael Chen, 29, AI",
///     vec![
///         r#"{"employees": [{"user_id": "x", "name": "Michael Chen", "department": "AI"}]}"#.into(),
///         r#"{"employees": [], "rejected": [{"raw_record": "Michael Chen, 29, AI", "reasons": ["missing user_id"]}]}"#.into(),
///     ],
///     2,
/// )
/// .unwrap();
/// assert!(outcome.passed());
/// assert_eq!(outcome.log.len(), 4);
/// ```
pub fn run_offline(
    raw_text: &str,
    candidates: Vec<String>,
    max_attempts: u32,
) -> Result<RunOutcome> {
    let mut replay = candidates.into_iter().map(|c| c.trim().to_string());
    let first = replay
        .next()
        .ok_or(AgentError::ReplayExhausted { served: 0 })?;

    let mut state = AgentRunState::new(raw_text, max_attempts)?.after_extract(first);
    loop {
        let outcome = validator::validate(state.last_raw_text());
        state = state.after_validate(outcome);
        if state.next_after_validate() == Step::Finalize {
            break;
        }
        match replay.next() {
            Some(candidate) => state = state.after_correct(candidate),
            None => {
                debug!(attempt = state.attempt(), "replay candidates exhausted");
                break;
            }
        }
    }
    Ok(state.finish())
}

#[derive(Debug, Default)]
struct ReplayState {
    served: usize,
    calls: Vec<(String, Value)>,
}

/// A [`Generator`] serving canned outputs in order.
///
/// Once the list is used up it fails with
/// [`AgentError::ReplayExhausted`], unless built with
/// [`ReplayGenerator::repeating`], which keeps serving the last output.
#[derive(Debug)]
pub struct ReplayGenerator {
    outputs: Vec<String>,
    repeat_last: bool,
    state: Mutex<ReplayState>,
}

impl ReplayGenerator {
    pub fn new(outputs: Vec<String>) -> Self {
        Self {
            outputs,
            repeat_last: false,
            state: Mutex::new(ReplayState::default()),
        }
    }

    /// Serve `outputs` in order, then repeat the last one forever.
    pub fn repeating(outputs: Vec<String>) -> Self {
        Self {
            repeat_last: true,
            ..Self::new(outputs)
        }
    }

    /// Number of outputs served so far.
    pub fn served(&self) -> usize {
        self.state.lock().map(|s| s.served).unwrap_or(0)
    }

    /// Every `(system_prompt, user_payload)` pair received, in order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.state
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Generator for ReplayGenerator {
    async fn generate(&self, system_prompt: &str, user_payload: &Value) -> Result<String> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| AgentError::Other("replay state poisoned".into()))?;
        state
            .calls
            .push((system_prompt.to_string(), user_payload.clone()));

        let next = match self.outputs.get(state.served) {
            Some(out) => Some(out),
            None if self.repeat_last => self.outputs.last(),
            None => None,
        };
        match next {
            Some(out) => {
                let out = out.clone();
                state.served += 1;
                Ok(out)
            }
            None => Err(AgentError::ReplayExhausted {
                served: state.served,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{LogEntry, ValidationStatus};
    use crate::prompts::{CORRECT_SYSTEM, EXTRACT_SYSTEM};
    use crate::RetryController;
    use std::sync::Arc;

    const GOOD: &str = r#"{"employees": [{"user_id": 7, "name": "ann lee", "age": 30, "department": "Data Science"}], "rejected": []}"#;
    const BAD_ID: &str = r#"{"employees": [{"user_id": 7.5, "name": "ann lee", "department": "Data Science"}]}"#;

    #[test]
    fn test_bad_then_good() {
        let outcome = run_offline("raw", vec![BAD_ID.into(), GOOD.into()], 2).unwrap();
        assert!(outcome.passed());
        assert_eq!(outcome.last_raw_text, GOOD);

        let steps: Vec<Step> = outcome.log.iter().map(LogEntry::step).collect();
        assert_eq!(
            steps,
            vec![Step::Extract, Step::Validate, Step::Correct, Step::Validate]
        );
        assert!(outcome.log[1].is_failed_validation());
        assert!(matches!(
            outcome.log[3],
            LogEntry::Validate { status: ValidationStatus::Pass, attempt: 2, .. }
        ));
    }

    #[test]
    fn test_stops_at_budget_with_candidates_left() {
        let outcome = run_offline(
            "raw",
            vec![BAD_ID.into(), BAD_ID.into(), GOOD.into()],
            2,
        )
        .unwrap();
        assert!(!outcome.passed());
        assert_eq!(outcome.count(Step::Validate), 2);
        assert_eq!(outcome.count(Step::Correct), 1);
    }

    #[test]
    fn test_stops_when_candidates_run_out() {
        let outcome = run_offline("raw", vec![BAD_ID.into()], 5).unwrap();
        assert!(!outcome.passed());
        assert_eq!(outcome.log.len(), 2);
    }

    #[test]
    fn test_first_pass_ignores_rest() {
        let outcome = run_offline("raw", vec![GOOD.into(), BAD_ID.into()], 3).unwrap();
        assert!(outcome.passed());
        assert_eq!(outcome.log.len(), 2);
    }

    #[test]
    fn test_no_candidates_is_error() {
        let err = run_offline("raw", vec![], 3).unwrap_err();
        assert!(matches!(err, AgentError::ReplayExhausted { served: 0 }));
    }

    #[tokio::test]
    async fn test_replay_generator_records_calls() {
        let generator = Arc::new(ReplayGenerator::new(vec![BAD_ID.into(), GOOD.into()]));
        let controller = RetryController::new(generator.clone(), 3).unwrap();
        let outcome = controller.run("Ann Lee, id 7").await.unwrap();
        assert!(outcome.passed());

        let calls = generator.calls();
        assert_eq!(calls[0].0, EXTRACT_SYSTEM);
        assert_eq!(calls[0].1["raw_text"], "Ann Lee, id 7");
        assert_eq!(calls[1].0, CORRECT_SYSTEM);
        assert_eq!(calls[1].1["previous_json"], BAD_ID);
    }

    #[tokio::test]
    async fn test_exhausted_replay_is_hard_failure() {
        let generator = Arc::new(ReplayGenerator::new(vec![BAD_ID.into()]));
        let controller = RetryController::new(generator, 3).unwrap();
        let failure = controller.run("raw").await.unwrap_err();
        assert!(matches!(failure.reason, AgentError::ReplayExhausted { served: 1 }));
        assert_eq!(failure.step, Step::Correct);
        assert_eq!(failure.log.len(), 2);
    }

    #[tokio::test]
    async fn test_repeating_serves_last() {
        let generator = ReplayGenerator::repeating(vec!["a".into(), "b".into()]);
        let payload = Value::Null;
        for expected in ["a", "b", "b", "b"] {
            assert_eq!(generator.generate("sys", &payload).await.unwrap(), expected);
        }
        assert_eq!(generator.served(), 4);
    }
}
