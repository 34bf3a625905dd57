//! Evaluation harness: run the agent over a directory of inputs and
//! tabulate the outcome.
//!
//! Cases run concurrently (bounded by `concurrency`); each run owns its own
//! state, so nothing is shared between them but the generator. Reporting
//! only: pass/fail is exactly the controller's contract.

use crate::controller::{LogEntry, RetryController, RunOutcome};
use crate::error::Result;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Optional per-directory map of `file name -> expectation`.
pub const EXPECTATIONS_FILE: &str = "expectations.json";

/// What a case is expected to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expectation {
    /// A schema-valid result.
    #[default]
    Valid,
    /// A valid result with no employees and at least one rejected entry.
    Reject,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalCase {
    pub case_id: String,
    pub raw_text: String,
    pub expected: Expectation,
}

impl EvalCase {
    pub fn new(case_id: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            raw_text: raw_text.into(),
            expected: Expectation::Valid,
        }
    }

    pub fn expecting(mut self, expected: Expectation) -> Self {
        self.expected = expected;
        self
    }
}

/// Load every `*.txt` file in `dir`, sorted by file name.
///
/// Expectations come from [`EXPECTATIONS_FILE`] when present; unlisted
/// files default to [`Expectation::Valid`].
pub fn load_cases(dir: &Path) -> Result<Vec<EvalCase>> {
    let expectations: HashMap<String, Expectation> = {
        let path = dir.join(EXPECTATIONS_FILE);
        if path.is_file() {
            serde_json::from_str(&std::fs::read_to_string(&path)?)?
        } else {
            HashMap::new()
        }
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut cases = Vec::with_capacity(paths.len());
    for path in paths {
        let case_id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let expected = expectations.get(&case_id).copied().unwrap_or_default();
        cases.push(EvalCase {
            raw_text: std::fs::read_to_string(&path)?,
            case_id,
            expected,
        });
    }
    Ok(cases)
}

/// Per-case line of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseReport {
    pub case_id: String,
    pub expected: Expectation,
    /// A schema-valid result was produced.
    pub passed: bool,
    pub handled_correctly: bool,
    /// Highest attempt number seen in the log.
    pub attempts_used: u32,
    pub employees: usize,
    pub rejected: usize,
    /// Set when the run aborted instead of finalizing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub last_raw_text: String,
}

impl CaseReport {
    fn from_outcome(case: &EvalCase, outcome: &RunOutcome) -> Self {
        let (employees, rejected) = outcome
            .result
            .as_ref()
            .map(|r| (r.employee_count(), r.rejected_count()))
            .unwrap_or((0, 0));
        let passed = outcome.passed();
        let handled_correctly = match case.expected {
            Expectation::Valid => passed,
            Expectation::Reject => passed && employees == 0 && rejected > 0,
        };
        Self {
            case_id: case.case_id.clone(),
            expected: case.expected,
            passed,
            handled_correctly,
            attempts_used: outcome.attempts_used(),
            employees,
            rejected,
            error: None,
            last_raw_text: outcome.last_raw_text.clone(),
        }
    }

    pub fn status(&self) -> &'static str {
        match (&self.error, self.passed) {
            (Some(_), _) => "ERROR",
            (None, true) => "PASS",
            (None, false) => "FAIL",
        }
    }
}

/// Aggregate statistics over a suite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteSummary {
    pub total: usize,
    pub passed: usize,
    pub handled_correctly: usize,
    pub errored: usize,
    pub pass_rate: f64,
    pub handling_rate: f64,
    /// Mean attempts over cases that finalized; aborted cases are left out.
    /// `None` when no case finalized.
    pub mean_attempts_all: Option<f64>,
    /// Mean attempts over passed cases, `None` when nothing passed.
    pub mean_attempts_passed: Option<f64>,
}

impl SuiteSummary {
    pub fn from_cases(cases: &[CaseReport]) -> Self {
        let total = cases.len();
        let passed = cases.iter().filter(|c| c.passed).count();
        let handled_correctly = cases.iter().filter(|c| c.handled_correctly).count();
        let errored = cases.iter().filter(|c| c.error.is_some()).count();
        let rate = |n: usize| if total == 0 { 0.0 } else { n as f64 / total as f64 };

        Self {
            total,
            passed,
            handled_correctly,
            errored,
            pass_rate: rate(passed),
            handling_rate: rate(handled_correctly),
            mean_attempts_all: mean(
                cases
                    .iter()
                    .filter(|c| c.error.is_none())
                    .map(|c| c.attempts_used),
            ),
            mean_attempts_passed: mean(
                cases.iter().filter(|c| c.passed).map(|c| c.attempts_used),
            ),
        }
    }
}

fn mean(values: impl Iterator<Item = u32>) -> Option<f64> {
    let (sum, n) = values.fold((0u64, 0usize), |(s, n), v| (s + u64::from(v), n + 1));
    (n > 0).then(|| sum as f64 / n as f64)
}

/// Full suite result, sorted by case id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteReport {
    pub cases: Vec<CaseReport>,
    pub summary: SuiteSummary,
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.cases {
            write!(
                f,
                "{}: {} | attempts={} | employees={} | rejected={}",
                c.case_id,
                c.status(),
                c.attempts_used,
                c.employees,
                c.rejected
            )?;
            if let Some(err) = &c.error {
                write!(f, " | error={}", err)?;
            } else if c.passed && c.employees == 0 && c.rejected > 0 {
                write!(f, " | all records rejected")?;
            }
            writeln!(f)?;
        }

        let s = &self.summary;
        writeln!(f, "\n=== SUITE SUMMARY ===")?;
        writeln!(f, "Total cases: {}", s.total)?;
        writeln!(
            f,
            "Schema-valid produced (pass): {}/{} = {:.2}%",
            s.passed,
            s.total,
            s.pass_rate * 100.0
        )?;
        writeln!(
            f,
            "Correct handling: {}/{} = {:.2}%",
            s.handled_correctly,
            s.total,
            s.handling_rate * 100.0
        )?;
        if s.errored > 0 {
            writeln!(f, "Errored: {}", s.errored)?;
        }
        if let Some(m) = s.mean_attempts_all {
            writeln!(f, "Avg attempts (all cases): {:.2}", m)?;
        }
        if let Some(m) = s.mean_attempts_passed {
            writeln!(f, "Avg attempts (passed cases): {:.2}", m)?;
        }
        Ok(())
    }
}

/// Run a single case to a [`CaseReport`]. Hard failures become `ERROR` rows.
pub async fn run_case(controller: &RetryController, case: &EvalCase) -> CaseReport {
    match controller.run(case.raw_text.as_str()).await {
        Ok(outcome) => {
            let report = CaseReport::from_outcome(case, &outcome);
            info!(
                case = %report.case_id,
                passed = report.passed,
                attempts = report.attempts_used,
                employees = report.employees,
                rejected = report.rejected,
                "case finished"
            );
            report
        }
        Err(failure) => {
            warn!(case = %case.case_id, error = %failure, "case aborted");
            CaseReport {
                case_id: case.case_id.clone(),
                expected: case.expected,
                passed: false,
                handled_correctly: false,
                attempts_used: failure.log.iter().map(LogEntry::attempt).max().unwrap_or(0),
                employees: 0,
                rejected: 0,
                error: Some(failure.reason.to_string()),
                last_raw_text: failure.last_raw_text,
            }
        }
    }
}

/// Run every case with at most `concurrency` runs in flight.
///
/// `make_controller` is called once per case, so callers can share one
/// controller (it is cheap to clone) or script a generator per case.
pub async fn run_suite<F>(cases: Vec<EvalCase>, concurrency: usize, make_controller: F) -> SuiteReport
where
    F: Fn(&EvalCase) -> RetryController,
{
    let mut reports: Vec<CaseReport> = stream::iter(cases.into_iter().map(|case| {
        let controller = make_controller(&case);
        async move { run_case(&controller, &case).await }
    }))
    .buffer_unordered(concurrency.max(1))
    .collect()
    .await;

    reports.sort_by(|a, b| a.case_id.cmp(&b.case_id));
    let summary = SuiteSummary::from_cases(&reports);
    SuiteReport {
        cases: reports,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::ReplayGenerator;
    use std::sync::Arc;

    const VALID: &str = r#"{"employees": [{"user_id": 1, "name": "ann", "department": "AI/ML"}], "rejected": []}"#;
    const ALL_REJECTED: &str = r#"{"employees": [], "rejected": [{"raw_record": "bob, no id", "reasons": ["missing user_id"]}]}"#;
    const INVALID: &str = r#"{"employees": [{"user_id": 1, "name": "ann", "department": "Sales"}]}"#;

    fn scripted(case: &EvalCase) -> RetryController {
        let outputs: Vec<String> = match case.case_id.as_str() {
            "a.txt" => vec![VALID.into()],
            "b.txt" => vec![INVALID.into(), VALID.into()],
            "c.txt" => vec![ALL_REJECTED.into()],
            "d.txt" => vec![INVALID.into()],
            _ => vec![],
        };
        RetryController::new(Arc::new(ReplayGenerator::repeating(outputs)), 3).unwrap()
    }

    #[test]
    fn test_load_cases_sorted_with_expectations() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("case02.txt"), "two").unwrap();
        std::fs::write(dir.path().join("case01.txt"), "one").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        std::fs::write(
            dir.path().join(EXPECTATIONS_FILE),
            r#"{"case02.txt": "reject"}"#,
        )
        .unwrap();

        let cases = load_cases(dir.path()).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].case_id, "case01.txt");
        assert_eq!(cases[0].raw_text, "one");
        assert_eq!(cases[0].expected, Expectation::Valid);
        assert_eq!(cases[1].expected, Expectation::Reject);
    }

    #[test]
    fn test_load_cases_bad_expectations_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(EXPECTATIONS_FILE), r#"{"a.txt": "maybe"}"#).unwrap();
        assert!(load_cases(dir.path()).is_err());
    }

    #[test]
    fn test_load_cases_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_cases(&dir.path().join("absent")).is_err());
    }

    #[tokio::test]
    async fn test_suite_tabulates() {
        let cases = vec![
            EvalCase::new("d.txt", "d"),
            EvalCase::new("c.txt", "c").expecting(Expectation::Reject),
            EvalCase::new("b.txt", "b"),
            EvalCase::new("a.txt", "a"),
            EvalCase::new("e.txt", "e"),
        ];
        let report = run_suite(cases, 3, scripted).await;

        let ids: Vec<&str> = report.cases.iter().map(|c| c.case_id.as_str()).collect();
        assert_eq!(ids, vec!["a.txt", "b.txt", "c.txt", "d.txt", "e.txt"]);

        let by_id = |id: &str| report.cases.iter().find(|c| c.case_id == id).unwrap();
        assert_eq!(by_id("a.txt").attempts_used, 1);
        assert_eq!(by_id("b.txt").attempts_used, 2);
        assert!(by_id("c.txt").handled_correctly);
        assert_eq!(by_id("c.txt").employees, 0);
        assert!(!by_id("d.txt").passed);
        assert_eq!(by_id("d.txt").attempts_used, 3);
        assert_eq!(by_id("e.txt").status(), "ERROR");

        let s = &report.summary;
        assert_eq!(s.total, 5);
        assert_eq!(s.passed, 3);
        assert_eq!(s.handled_correctly, 3);
        assert_eq!(s.errored, 1);
        assert!((s.pass_rate - 0.6).abs() < 1e-9);
        assert_eq!(s.mean_attempts_passed, Some(4.0 / 3.0));
        // e.txt aborted and stays out of the all-cases mean.
        assert_eq!(s.mean_attempts_all, Some(7.0 / 4.0));
    }

    #[tokio::test]
    async fn test_reject_expectation_needs_rejections() {
        let case = EvalCase::new("a.txt", "a").expecting(Expectation::Reject);
        let report = run_case(&scripted(&case), &case).await;
        assert!(report.passed);
        assert!(!report.handled_correctly);
    }

    #[test]
    fn test_empty_suite_summary() {
        let s = SuiteSummary::from_cases(&[]);
        assert_eq!(s.pass_rate, 0.0);
        assert_eq!(s.mean_attempts_all, None);
    }

    #[tokio::test]
    async fn test_report_renders_and_serializes() {
        let cases = vec![EvalCase::new("a.txt", "a"), EvalCase::new("d.txt", "d")];
        let report = run_suite(cases, 2, scripted).await;

        let text = report.to_string();
        assert!(text.contains("a.txt: PASS | attempts=1"));
        assert!(text.contains("d.txt: FAIL | attempts=3"));
        assert!(text.contains("Schema-valid produced (pass): 1/2 = 50.00%"));
        assert!(text.contains("Avg attempts (all cases): 2.00"));

        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["summary"]["passed"], 1);
        assert_eq!(v["cases"][0]["expected"], "valid");
        assert!(v["cases"][0].get("error").is_none());
    }
}
