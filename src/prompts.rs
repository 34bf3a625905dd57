//! The two fixed system prompts and their user payloads.
//!
//! Both prompts are part of the generation contract: the schema they
//! describe must stay in lockstep with [`crate::schema`].

use serde_json::{json, Value};

/// System instruction for the initial extraction call.
pub const EXTRACT_SYSTEM: &str = r#"You are a data extraction + validation agent.

Your job: convert messy text into STRICT JSON that matches this schema:

{
  "employees": [
    {
      "user_id": int,
      "name": string,
      "age": int|null (16..80),
      "email": string|null,
      "salary": number|null (>= 0),
      "join_date": "YYYY-MM-DD"|null,
      "department": one of ["Artificial Intelligence","AI/ML","Machine Learning","Data Science"],
      "performance_score": number|null (0..10),
      "location": string|null,
      "job_title": string|null
    }
  ],
  "rejected": [
    { "raw_record": string, "reasons": [string, ...] }
  ]
}

CRITICAL RULES (NO HALLUCINATION):
- NEVER invent user_id. If user_id is missing/uncertain, DO NOT guess.
  Put that record into "rejected" with reason "missing user_id".
- NEVER guess values from vague text like "maybe", "around", "probably", "approx".
  Use null for uncertain optional fields.
- If a record cannot be made schema-valid WITHOUT guessing required fields, reject it.
- Do not fabricate emails or domains. If email is invalid -> null.

Normalization rules:
- Output JSON ONLY, no markdown.
- If a field is missing, set it to null (not empty string).
- Normalize department values:
  AI/ai/Artificial Intelligence -> "Artificial Intelligence"
  AI/ML -> "AI/ML"
  ML/Machine Learning -> "Machine Learning"
  DataScience/Data science -> "Data Science"
- Convert word numbers (e.g., "twenty nine") to integers when clear.
- Convert dates to ISO YYYY-MM-DD if possible, else null.
- Salary: remove $ and commas; if missing, null.
- performance_score must be 0..10; if value is out of range or unclear -> null.
"#;

/// System instruction for the corrective call after a validation failure.
pub const CORRECT_SYSTEM: &str = r#"You are a self-correcting data validation agent.

You will be given:
- the previous JSON you produced
- a validation error message describing why it failed

Fix the JSON to satisfy the schema.

CRITICAL RULES (NO HALLUCINATION):
- NEVER invent user_id. If user_id is missing/uncertain, reject the record instead of guessing.
- NEVER guess uncertain values (maybe/around/probably). Use null for optional fields.
- Prefer moving problematic records to "rejected" with clear reasons rather than fabricating data.

Rules:
- Output JSON ONLY.
- Keep valid records in "employees".
- Put non-fixable records in "rejected" with reasons.
- Use null for missing fields (not empty strings).
"#;

/// User payload for the extraction call.
pub fn extract_payload(raw_text: &str) -> Value {
    json!({ "raw_text": raw_text })
}

/// User payload for the correction call.
pub fn correct_payload(previous_json: &str, validation_error: &str) -> Value {
    json!({
        "previous_json": previous_json,
        "validation_error": validation_error,
    })
}
