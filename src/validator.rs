//! Whole-document validation of raw generator text.
//!
//! [`validate`] parses strictly (no fence stripping, no repair) and runs
//! the schema's field validators. Success is all-or-nothing: either the
//! complete [`ExtractionResult`] or a [`ValidationError`] listing every
//! violated constraint.

use crate::safe_json::JsonSafe;
use crate::schema::{ExtractionResult, Violation};
use serde_json::Value;
use std::fmt;

/// Maximum characters of any text recorded in the audit log.
pub const LOG_TEXT_LIMIT: usize = 2000;

/// Every constraint the document violated, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    fn parse(err: &serde_json::Error) -> Self {
        Self {
            violations: vec![Violation {
                path: "$".into(),
                reason: format!("invalid JSON: {}", err),
                value: None,
            }],
        }
    }

    /// The rendered feedback, cut to at most `limit` characters.
    pub fn truncated(&self, limit: usize) -> String {
        truncate(&self.to_string(), limit)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.violations.len();
        write!(
            f,
            "{} validation error{} for ExtractionResult",
            n,
            if n == 1 { "" } else { "s" }
        )?;
        for v in &self.violations {
            write!(f, "\n- {}", v)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Parse and validate raw generator text against the document schema.
///
/// On success the result has been passed through the Safe-JSON normalizer.
pub fn validate(raw_text: &str) -> Result<ExtractionResult, ValidationError> {
    let doc: Value = serde_json::from_str(raw_text).map_err(|e| ValidationError::parse(&e))?;
    ExtractionResult::from_value(&doc)
        .map(JsonSafe::json_safe)
        .map_err(|violations| ValidationError { violations })
}

/// Cut `s` to at most `max_chars` characters, on a char boundary.
pub fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_doc() -> Value {
        json!({
            "employees": [{
                "user_id": 101,
                "name": "michael  chen",
                "age": 29,
                "email": "m.chen@example.com",
                "salary": 120000,
                "join_date": "2024-01-01",
                "department": "Artificial Intelligence",
                "performance_score": 9.5,
                "location": "Chicago",
                "job_title": "Engineer"
            }],
            "rejected": [
                {"raw_record": "Sarah, maybe 30, AI", "reasons": ["missing user_id"]}
            ]
        })
    }

    #[test]
    fn test_valid_document_passes() {
        let result = validate(&valid_doc().to_string()).unwrap();
        assert_eq!(result.employee_count(), 1);
        assert_eq!(result.rejected_count(), 1);
        assert_eq!(result.employees[0].name, "Michael Chen");
    }

    #[test]
    fn test_round_trip() {
        let first = validate(&valid_doc().to_string()).unwrap();
        let again = validate(&serde_json::to_string(&first).unwrap()).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_empty_pass_is_not_failure() {
        let result = validate(r#"{"employees": [], "rejected": [{"raw_record": "???", "reasons": ["no id"]}]}"#)
            .unwrap();
        assert!(result.is_all_rejected());
    }

    #[test]
    fn test_malformed_json_reports_parse_error() {
        let err = validate("{bad json").unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].path, "$");
        assert!(err.to_string().starts_with("1 validation error for ExtractionResult"));
    }

    #[test]
    fn test_markdown_fence_is_not_stripped() {
        let fenced = format!("```json\n{}\n```", valid_doc());
        assert!(validate(&fenced).is_err());
    }

    #[test]
    fn test_reports_every_violation() {
        let doc = json!({
            "employees": [
                {"user_id": "101", "name": "", "department": "ai"},
                {"user_id": 7, "name": "Ann", "department": "AI/ML", "age": 81}
            ]
        });
        let err = validate(&doc.to_string()).unwrap_err();
        let rendered = err.to_string();
        assert_eq!(err.violations.len(), 4);
        assert!(rendered.starts_with("4 validation errors"));
        assert!(rendered.contains("employees.0.user_id"));
        assert!(rendered.contains("employees.1.age"));
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
        let err = validate("nope").unwrap_err();
        assert_eq!(err.truncated(5).chars().count(), 5);
    }
}
