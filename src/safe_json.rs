//! Safe-JSON normalization.
//!
//! Strict JSON has no representation for NaN or the infinities. [`JsonSafe`]
//! walks a structure and replaces every non-finite float with `null`, so the
//! result always survives a strict serializer. Every impl is idempotent.

use crate::error::Result;
use crate::schema::{Employee, ExtractionResult, RejectedRecord};
use serde::Serialize;
use serde_json::Value;

/// Replace non-finite floats with null, recursively.
pub trait JsonSafe: Sized {
    fn json_safe(self) -> Self;
}

impl JsonSafe for Value {
    fn json_safe(self) -> Self {
        match self {
            Value::Number(n) => match n.as_f64() {
                Some(f) if !f.is_finite() => Value::Null,
                _ => Value::Number(n),
            },
            Value::Array(items) => Value::Array(items.into_iter().map(JsonSafe::json_safe).collect()),
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, v.json_safe()))
                    .collect(),
            ),
            other => other,
        }
    }
}

impl JsonSafe for Option<f64> {
    fn json_safe(self) -> Self {
        self.filter(|f| f.is_finite())
    }
}

impl<T: JsonSafe> JsonSafe for Vec<T> {
    fn json_safe(self) -> Self {
        self.into_iter().map(JsonSafe::json_safe).collect()
    }
}

impl JsonSafe for Employee {
    fn json_safe(self) -> Self {
        Self {
            salary: self.salary.json_safe(),
            performance_score: self.performance_score.json_safe(),
            ..self
        }
    }
}

impl JsonSafe for RejectedRecord {
    fn json_safe(self) -> Self {
        self
    }
}

impl JsonSafe for ExtractionResult {
    fn json_safe(self) -> Self {
        Self {
            employees: self.employees.json_safe(),
            rejected: self.rejected.json_safe(),
        }
    }
}

/// Serialize any value into a normalized `serde_json::Value`.
pub fn to_safe_value<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?.json_safe())
}
