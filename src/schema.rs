//! Record schema: the canonical shape of an extraction document.
//!
//! A document is a JSON object with two lists:
//!
//! ```text
//! {
//!   "employees": [ Employee, ... ],
//!   "rejected":  [ {"raw_record": string, "reasons": [string, ...]}, ... ]
//! }
//! ```
//!
//! Records are only ever built through [`ExtractionResult::from_value`],
//! which runs every field validator and either yields a fully valid
//! document or the complete list of [`Violation`]s. There is no partially
//! valid [`Employee`].

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Inclusive bounds for `age`.
pub const AGE_RANGE: (i64, i64) = (16, 80);

/// Inclusive bounds for `performance_score`.
pub const SCORE_RANGE: (f64, f64) = (0.0, 10.0);

/// Closed set of canonical department names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Department {
    #[serde(rename = "Artificial Intelligence")]
    ArtificialIntelligence,
    #[serde(rename = "AI/ML")]
    AiMl,
    #[serde(rename = "Machine Learning")]
    MachineLearning,
    #[serde(rename = "Data Science")]
    DataScience,
}

impl Department {
    pub const ALL: [Department; 4] = [
        Department::ArtificialIntelligence,
        Department::AiMl,
        Department::MachineLearning,
        Department::DataScience,
    ];

    /// The canonical string the generator must emit.
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::ArtificialIntelligence => "Artificial Intelligence",
            Department::AiMl => "AI/ML",
            Department::MachineLearning => "Machine Learning",
            Department::DataScience => "Data Science",
        }
    }

    /// Exact, case-sensitive lookup. No aliasing happens here; mapping
    /// `"ai"` or `"DataScience"` onto a canonical name is the generator's job.
    pub fn from_canonical(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == s)
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully schema-valid employee record.
///
/// Optional fields serialize as explicit `null` when absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Employee {
    pub user_id: i64,
    pub name: String,
    pub age: Option<i64>,
    pub email: Option<String>,
    pub salary: Option<f64>,
    pub join_date: Option<NaiveDate>,
    pub department: Department,
    pub performance_score: Option<f64>,
    pub location: Option<String>,
    pub job_title: Option<String>,
}

/// A raw fragment that could not be promoted to an [`Employee`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRecord {
    pub raw_record: String,
    /// Never empty.
    pub reasons: Vec<String>,
}

/// The whole document accepted by one validation attempt.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ExtractionResult {
    pub employees: Vec<Employee>,
    pub rejected: Vec<RejectedRecord>,
}

/// One violated constraint, addressed by a dotted path such as
/// `employees.2.age`.
///
/// The rendered form is fed verbatim into the correction prompt, so it
/// names the field, the rule, and the offending input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub path: String,
    pub reason: String,
    /// The offending input, if there was one (absent for missing fields).
    pub value: Option<Value>,
}

impl Violation {
    fn new(path: impl Into<String>, reason: impl Into<String>, value: Option<&Value>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
            value: value.cloned(),
        }
    }

    fn missing(path: impl Into<String>) -> Self {
        Self::new(path, "field required", None)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{}: {} [input_value={}]", self.path, self.reason, v),
            None => write!(f, "{}: {}", self.path, self.reason),
        }
    }
}

type FieldResult<T> = std::result::Result<T, Violation>;

impl ExtractionResult {
    /// Validate a parsed JSON document, all-or-nothing.
    ///
    /// Missing `employees`/`rejected` keys mean empty lists; unknown keys
    /// are ignored. Every violation across every entry is reported.
    pub fn from_value(doc: &Value) -> Result<Self, Vec<Violation>> {
        let obj = match doc.as_object() {
            Some(obj) => obj,
            None => {
                return Err(vec![Violation::new(
                    "$",
                    format!("document must be a JSON object, got {}", type_name(doc)),
                    Some(doc),
                )])
            }
        };

        let mut violations = Vec::new();
        let mut employees = Vec::new();
        let mut rejected = Vec::new();

        match list_field(obj, "employees") {
            Ok(items) => {
                for (i, item) in items.iter().enumerate() {
                    match validate_employee(item, &format!("employees.{}", i)) {
                        Ok(e) => employees.push(e),
                        Err(mut v) => violations.append(&mut v),
                    }
                }
            }
            Err(v) => violations.push(v),
        }

        match list_field(obj, "rejected") {
            Ok(items) => {
                for (i, item) in items.iter().enumerate() {
                    match validate_rejected(item, &format!("rejected.{}", i)) {
                        Ok(r) => rejected.push(r),
                        Err(mut v) => violations.append(&mut v),
                    }
                }
            }
            Err(v) => violations.push(v),
        }

        if violations.is_empty() {
            Ok(Self {
                employees,
                rejected,
            })
        } else {
            Err(violations)
        }
    }

    pub fn employee_count(&self) -> usize {
        self.employees.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    /// A passing document with no records but explicit rejections.
    pub fn is_all_rejected(&self) -> bool {
        self.employees.is_empty() && !self.rejected.is_empty()
    }
}

fn list_field<'a>(obj: &'a Map<String, Value>, key: &str) -> FieldResult<&'a [Value]> {
    match obj.get(key) {
        None => Ok(&[][..]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(other) => Err(Violation::new(
            key,
            format!("expected array, got {}", type_name(other)),
            Some(other),
        )),
    }
}

/// Validate a single employee candidate, collecting every field violation.
pub fn validate_employee(value: &Value, path: &str) -> Result<Employee, Vec<Violation>> {
    let obj = match value.as_object() {
        Some(obj) => obj,
        None => {
            return Err(vec![Violation::new(
                path,
                format!("expected object, got {}", type_name(value)),
                Some(value),
            )])
        }
    };
    let at = |key: &str| format!("{}.{}", path, key);

    let mut errs = Vec::new();
    let user_id = take(&mut errs, user_id(obj.get("user_id"), at("user_id")));
    let name = take(&mut errs, name(obj.get("name"), at("name")));
    let age = take(&mut errs, age(obj.get("age"), at("age")));
    let email = take(&mut errs, optional_text(obj.get("email"), at("email")));
    let salary = take(&mut errs, salary(obj.get("salary"), at("salary")));
    let join_date = take(&mut errs, join_date(obj.get("join_date"), at("join_date")));
    let department = take(&mut errs, department(obj.get("department"), at("department")));
    let performance_score = take(
        &mut errs,
        performance_score(obj.get("performance_score"), at("performance_score")),
    );
    let location = take(&mut errs, optional_text(obj.get("location"), at("location")));
    let job_title = take(&mut errs, optional_text(obj.get("job_title"), at("job_title")));

    match (
        user_id,
        name,
        age,
        email,
        salary,
        join_date,
        department,
        performance_score,
        location,
        job_title,
    ) {
        (
            Some(user_id),
            Some(name),
            Some(age),
            Some(email),
            Some(salary),
            Some(join_date),
            Some(department),
            Some(performance_score),
            Some(location),
            Some(job_title),
        ) => Ok(Employee {
            user_id,
            name,
            age,
            email,
            salary,
            join_date,
            department,
            performance_score,
            location,
            job_title,
        }),
        _ => Err(errs),
    }
}

/// Validate a single rejected-entry candidate.
pub fn validate_rejected(value: &Value, path: &str) -> Result<RejectedRecord, Vec<Violation>> {
    let obj = match value.as_object() {
        Some(obj) => obj,
        None => {
            return Err(vec![Violation::new(
                path,
                format!("expected object, got {}", type_name(value)),
                Some(value),
            )])
        }
    };

    let mut errs = Vec::new();

    let raw_path = format!("{}.raw_record", path);
    let raw_record = match obj.get("raw_record") {
        None | Some(Value::Null) => {
            errs.push(Violation::missing(raw_path));
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            errs.push(Violation::new(
                raw_path,
                "string should have at least 1 character",
                obj.get("raw_record"),
            ));
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            errs.push(Violation::new(
                raw_path,
                format!("expected string, got {}", type_name(other)),
                Some(other),
            ));
            None
        }
    };

    let reasons_path = format!("{}.reasons", path);
    let reasons = match obj.get("reasons") {
        None | Some(Value::Null) => {
            errs.push(Violation::missing(reasons_path));
            None
        }
        Some(Value::Array(items)) if items.is_empty() => {
            errs.push(Violation::new(
                reasons_path,
                "list should have at least 1 item",
                obj.get("reasons"),
            ));
            None
        }
        Some(Value::Array(items)) => {
            let mut reasons = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::String(s) if !s.trim().is_empty() => reasons.push(s.clone()),
                    Value::String(_) => errs.push(Violation::new(
                        format!("{}.{}", reasons_path, i),
                        "reason must not be empty",
                        Some(item),
                    )),
                    other => errs.push(Violation::new(
                        format!("{}.{}", reasons_path, i),
                        format!("expected string, got {}", type_name(other)),
                        Some(other),
                    )),
                }
            }
            Some(reasons)
        }
        Some(other) => {
            errs.push(Violation::new(
                reasons_path,
                format!("expected array, got {}", type_name(other)),
                Some(other),
            ));
            None
        }
    };

    match (raw_record, reasons) {
        (Some(raw_record), Some(reasons)) if errs.is_empty() => Ok(RejectedRecord {
            raw_record,
            reasons,
        }),
        _ => Err(errs),
    }
}

fn take<T>(errs: &mut Vec<Violation>, result: FieldResult<T>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(v) => {
            errs.push(v);
            None
        }
    }
}

/// Treat JSON `null` and an absent key the same way.
fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Strict integer: a JSON integer literal. Strings, floats, and booleans
/// are never coerced.
fn strict_int(value: &Value, path: &str) -> FieldResult<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if n.is_u64() {
                Err(Violation::new(path, "integer out of range", Some(value)))
            } else {
                Err(Violation::new(
                    path,
                    "expected integer, got float",
                    Some(value),
                ))
            }
        }
        other => Err(Violation::new(
            path,
            format!("expected integer, got {}", type_name(other)),
            Some(other),
        )),
    }
}

fn strict_number(value: &Value, path: &str) -> FieldResult<f64> {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() => Ok(f),
            _ => Err(Violation::new(path, "number is not finite", Some(value))),
        },
        other => Err(Violation::new(
            path,
            format!("expected number, got {}", type_name(other)),
            Some(other),
        )),
    }
}

fn user_id(value: Option<&Value>, path: String) -> FieldResult<i64> {
    match present(value) {
        None => Err(Violation::missing(path)),
        Some(v) => strict_int(v, &path),
    }
}

fn name(value: Option<&Value>, path: String) -> FieldResult<String> {
    match present(value) {
        None => Err(Violation::missing(path)),
        Some(Value::String(s)) => {
            let normalized = normalize_name(s);
            if normalized.is_empty() {
                Err(Violation::new(
                    path,
                    "string should have at least 1 character",
                    value,
                ))
            } else {
                Ok(normalized)
            }
        }
        Some(other) => Err(Violation::new(
            path,
            format!("expected string, got {}", type_name(other)),
            Some(other),
        )),
    }
}

fn age(value: Option<&Value>, path: String) -> FieldResult<Option<i64>> {
    let Some(v) = present(value) else {
        return Ok(None);
    };
    let age = strict_int(v, &path)?;
    let (lo, hi) = AGE_RANGE;
    if (lo..=hi).contains(&age) {
        Ok(Some(age))
    } else {
        Err(Violation::new(
            path,
            format!("must be between {} and {} inclusive", lo, hi),
            Some(v),
        ))
    }
}

fn salary(value: Option<&Value>, path: String) -> FieldResult<Option<f64>> {
    let Some(v) = present(value) else {
        return Ok(None);
    };
    let salary = strict_number(v, &path)?;
    if salary >= 0.0 {
        Ok(Some(salary))
    } else {
        Err(Violation::new(path, "must be greater than or equal to 0", Some(v)))
    }
}

fn performance_score(value: Option<&Value>, path: String) -> FieldResult<Option<f64>> {
    let Some(v) = present(value) else {
        return Ok(None);
    };
    let score = strict_number(v, &path)?;
    let (lo, hi) = SCORE_RANGE;
    if (lo..=hi).contains(&score) {
        Ok(Some(score))
    } else {
        Err(Violation::new(
            path,
            format!("must be between {} and {} inclusive", lo, hi),
            Some(v),
        ))
    }
}

fn join_date(value: Option<&Value>, path: String) -> FieldResult<Option<NaiveDate>> {
    let Some(v) = present(value) else {
        return Ok(None);
    };
    match v {
        Value::String(s) => parse_iso_date(s).map(Some).ok_or_else(|| {
            Violation::new(path, "must be a valid calendar date in YYYY-MM-DD format", Some(v))
        }),
        other => Err(Violation::new(
            path,
            format!("expected date string, got {}", type_name(other)),
            Some(other),
        )),
    }
}

fn department(value: Option<&Value>, path: String) -> FieldResult<Department> {
    match present(value) {
        None => Err(Violation::missing(path)),
        Some(Value::String(s)) => Department::from_canonical(s).ok_or_else(|| {
            let allowed: Vec<&str> = Department::ALL.iter().map(|d| d.as_str()).collect();
            Violation::new(
                path,
                format!("must be one of {}", allowed.join(", ")),
                value,
            )
        }),
        Some(other) => Err(Violation::new(
            path,
            format!("expected string, got {}", type_name(other)),
            Some(other),
        )),
    }
}

fn optional_text(value: Option<&Value>, path: String) -> FieldResult<Option<String>> {
    match present(value) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(Violation::new(
            path,
            format!("expected string or null, got {}", type_name(other)),
            Some(other),
        )),
    }
}

/// Strict `YYYY-MM-DD`: exactly ten characters with zero-padded fields.
fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let b = s.as_bytes();
    let shaped = b.len() == 10
        && b[4] == b'-'
        && b[7] == b'-'
        && b.iter()
            .enumerate()
            .all(|(i, c)| i == 4 || i == 7 || c.is_ascii_digit());
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Collapse runs of whitespace, trim, and title-case each word.
///
/// A letter is upper-cased when it follows a non-letter and lower-cased
/// otherwise, so `"o'neil-SMITH"` becomes `"O'Neil-Smith"`. When an
/// upper-case mapping expands to several characters only the first stays
/// upper-case (`"ß"` becomes `"Ss"`), which keeps the result stable under
/// a second pass.
///
/// ```
/// use extraction_agent::schema::normalize_name;
///
/// assert_eq!(normalize_name("  michael   chen "), "Michael Chen");
/// ```
pub fn normalize_name(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(collapsed.len());
    let mut prev_cased = false;
    for c in collapsed.chars() {
        if c.is_alphabetic() {
            if prev_cased {
                out.extend(c.to_lowercase());
            } else {
                let mut upper = c.to_uppercase();
                out.extend(upper.next());
                out.extend(upper.flat_map(char::to_lowercase));
            }
            prev_cased = true;
        } else {
            out.push(c);
            prev_cased = false;
        }
    }
    out
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_employee() -> Value {
        json!({
            "user_id": 101,
            "name": "Michael Chen",
            "age": 29,
            "email": null,
            "salary": 120000,
            "join_date": "2024-01-01",
            "department": "Artificial Intelligence",
            "performance_score": 9.5,
            "location": "Chicago",
            "job_title": "Engineer"
        })
    }

    fn with(field: &str, value: Value) -> Value {
        let mut e = valid_employee();
        e[field] = value;
        e
    }

    fn paths(errs: &[Violation]) -> Vec<&str> {
        errs.iter().map(|v| v.path.as_str()).collect()
    }

    #[test]
    fn test_accepts_valid_employee() {
        let e = validate_employee(&valid_employee(), "employees.0").unwrap();
        assert_eq!(e.user_id, 101);
        assert_eq!(e.department, Department::ArtificialIntelligence);
        assert_eq!(e.join_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(e.salary, Some(120000.0));
    }

    #[test]
    fn test_optional_fields_may_be_absent() {
        let e = validate_employee(
            &json!({"user_id": 7, "name": "ada", "department": "Data Science"}),
            "employees.0",
        )
        .unwrap();
        assert_eq!(e.name, "Ada");
        assert!(e.age.is_none());
        assert!(e.email.is_none());
        assert!(e.join_date.is_none());
    }

    #[test]
    fn test_user_id_never_coerced() {
        for bad in [json!("101"), json!(101.0), json!(101.5), json!(true)] {
            let errs = validate_employee(&with("user_id", bad), "employees.0").unwrap_err();
            assert_eq!(paths(&errs), vec!["employees.0.user_id"]);
        }
    }

    #[test]
    fn test_user_id_missing_or_null() {
        let mut e = valid_employee();
        e.as_object_mut().unwrap().remove("user_id");
        let errs = validate_employee(&e, "employees.0").unwrap_err();
        assert_eq!(errs[0].reason, "field required");

        let errs = validate_employee(&with("user_id", Value::Null), "employees.0").unwrap_err();
        assert_eq!(errs[0].reason, "field required");
    }

    #[test]
    fn test_name_normalization() {
        assert_eq!(normalize_name("  michael   chen "), "Michael Chen");
        assert_eq!(normalize_name("ANNA\tmaria\nLOPEZ"), "Anna Maria Lopez");
        assert_eq!(normalize_name("o'neil-SMITH"), "O'Neil-Smith");
        assert_eq!(normalize_name("ßa müller"), "Ssa Müller");
        assert_eq!(normalize_name("ﬁona élodie"), "Fiona Élodie");
        let e = validate_employee(&with("name", json!("  michael   chen ")), "e").unwrap();
        assert_eq!(e.name, "Michael Chen");
    }

    #[test]
    fn test_name_normalization_is_idempotent() {
        for raw in [
            "ßa müller",
            "STRAßE weg",
            "ﬁona ﬂynn",
            "ÉLODIE d'arc",
            "  jürgen   ÖZIL ",
            "ǆenan kovač",
            "o'neil-SMITH",
        ] {
            let once = normalize_name(raw);
            assert_eq!(normalize_name(&once), once, "{:?}", raw);
        }
    }

    #[test]
    fn test_blank_name_rejected() {
        let errs = validate_employee(&with("name", json!("   ")), "employees.0").unwrap_err();
        assert_eq!(paths(&errs), vec!["employees.0.name"]);
    }

    #[test]
    fn test_age_boundaries() {
        assert!(validate_employee(&with("age", json!(16)), "e").is_ok());
        assert!(validate_employee(&with("age", json!(80)), "e").is_ok());
        assert!(validate_employee(&with("age", json!(15)), "e").is_err());
        assert!(validate_employee(&with("age", json!(81)), "e").is_err());
        assert!(validate_employee(&with("age", json!(29.5)), "e").is_err());
        assert!(validate_employee(&with("age", Value::Null), "e").is_ok());
    }

    #[test]
    fn test_salary_non_negative() {
        assert!(validate_employee(&with("salary", json!(0)), "e").is_ok());
        assert!(validate_employee(&with("salary", json!(55000.5)), "e").is_ok());
        assert!(validate_employee(&with("salary", json!(-1)), "e").is_err());
        assert!(validate_employee(&with("salary", json!("$55,000")), "e").is_err());
    }

    #[test]
    fn test_performance_score_range() {
        assert!(validate_employee(&with("performance_score", json!(0)), "e").is_ok());
        assert!(validate_employee(&with("performance_score", json!(10.0)), "e").is_ok());
        assert!(validate_employee(&with("performance_score", json!(10.01)), "e").is_err());
        assert!(validate_employee(&with("performance_score", json!(-0.5)), "e").is_err());
    }

    #[test]
    fn test_join_date_strict_iso() {
        assert!(validate_employee(&with("join_date", json!("2024-02-29")), "e").is_ok());
        for bad in ["2023-02-29", "2024-1-5", "01/05/2024", "2024-01-05T00:00:00", ""] {
            assert!(
                validate_employee(&with("join_date", json!(bad)), "e").is_err(),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_department_closed_set() {
        for d in Department::ALL {
            assert!(validate_employee(&with("department", json!(d.as_str())), "e").is_ok());
        }
        for bad in ["ai", "AI", "Data science", "Engineering"] {
            let errs = validate_employee(&with("department", json!(bad)), "e").unwrap_err();
            assert_eq!(paths(&errs), vec!["e.department"]);
        }
    }

    #[test]
    fn test_all_field_violations_collected() {
        let errs = validate_employee(
            &json!({"user_id": "101", "name": "", "department": "ai"}),
            "employees.0",
        )
        .unwrap_err();
        assert_eq!(
            paths(&errs),
            vec![
                "employees.0.user_id",
                "employees.0.name",
                "employees.0.department"
            ]
        );
    }

    #[test]
    fn test_rejected_entry_rules() {
        assert!(validate_rejected(
            &json!({"raw_record": "Sam, 40", "reasons": ["missing user_id"]}),
            "r"
        )
        .is_ok());
        assert!(validate_rejected(&json!({"raw_record": "", "reasons": ["x"]}), "r").is_err());
        assert!(validate_rejected(&json!({"raw_record": "Sam", "reasons": []}), "r").is_err());
        assert!(validate_rejected(&json!({"raw_record": "Sam", "reasons": [""]}), "r").is_err());

        let errs =
            validate_rejected(&json!({"raw_record": "   ", "reasons": ["x"]}), "r").unwrap_err();
        assert_eq!(paths(&errs), vec!["r.raw_record"]);
        let errs = validate_rejected(&json!({"raw_record": "Sam", "reasons": ["ok", " \t "]}), "r")
            .unwrap_err();
        assert_eq!(paths(&errs), vec!["r.reasons.1"]);
        assert!(validate_rejected(&json!({"raw_record": "Sam"}), "r").is_err());
    }

    #[test]
    fn test_document_all_or_nothing() {
        let doc = json!({
            "employees": [valid_employee(), with("age", json!(81))],
            "rejected": []
        });
        let errs = ExtractionResult::from_value(&doc).unwrap_err();
        assert_eq!(paths(&errs), vec!["employees.1.age"]);
    }

    #[test]
    fn test_document_defaults_and_shape() {
        let empty = ExtractionResult::from_value(&json!({})).unwrap();
        assert_eq!(empty, ExtractionResult::default());

        assert!(ExtractionResult::from_value(&json!([])).is_err());
        assert!(ExtractionResult::from_value(&json!({"employees": null})).is_err());
        assert!(ExtractionResult::from_value(&json!({"employees": {}})).is_err());
    }

    #[test]
    fn test_serializes_explicit_nulls() {
        let e = validate_employee(
            &json!({"user_id": 7, "name": "ada", "department": "AI/ML"}),
            "e",
        )
        .unwrap();
        let v = serde_json::to_value(&e).unwrap();
        assert!(v.get("email").unwrap().is_null());
        assert!(v.get("join_date").unwrap().is_null());
        assert_eq!(v["department"], "AI/ML");
    }

    #[test]
    fn test_violation_display_names_offending_value() {
        let errs = validate_employee(&with("age", json!(81)), "employees.0").unwrap_err();
        let rendered = errs[0].to_string();
        assert!(rendered.contains("employees.0.age"));
        assert!(rendered.contains("16 and 80"));
        assert!(rendered.contains("input_value=81"));
    }
}
