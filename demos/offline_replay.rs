//! Example: drive the extract/validate/correct loop with canned outputs.
//!
//! Run with: `cargo run --example offline_replay`
//! (set `RUST_LOG=debug` to see every step).

use anyhow::Result;
use extraction_agent::{
    run_offline, Event, FnEventHandler, ReplayGenerator, RetryController,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const RAW: &str = "michael chen | id 101 | twenty-nine | AI team | joined 2024-01-01 | 120k\n\
                   Sarah, maybe 30, worked on ML, no id";

// First reply: id as a string, unnormalized department, slash date.
const FIRST: &str = r#"{
  "employees": [{"user_id": "101", "name": "michael chen", "age": 29,
                 "department": "AI team", "join_date": "01/01/2024", "salary": 120000}],
  "rejected": []
}"#;

const CORRECTED: &str = r#"{
  "employees": [{"user_id": 101, "name": "michael chen", "age": 29,
                 "department": "Artificial Intelligence", "join_date": "2024-01-01",
                 "salary": 120000}],
  "rejected": [{"raw_record": "Sarah, maybe 30, worked on ML, no id",
                "reasons": ["missing user_id"]}]
}"#;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    // Pure replay: no generator at all, candidates go straight to the validator.
    let outcome = run_offline(RAW, vec![FIRST.into(), CORRECTED.into()], 3)?;
    info!(passed = outcome.passed(), entries = outcome.log.len(), "offline replay done");
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    // The real controller over a replaying generator, with an event hook.
    let generator = Arc::new(ReplayGenerator::new(vec![FIRST.into(), CORRECTED.into()]));
    let controller = RetryController::new(generator, 3)?.with_event_handler(Arc::new(
        FnEventHandler(|event| {
            if let Event::ValidationFailed { attempt, error } = event {
                println!("--- attempt {} rejected ---\n{}", attempt, error);
            }
        }),
    ));

    let outcome = controller.run(RAW).await?;
    match &outcome.result {
        Some(result) => println!(
            "accepted {} employee(s), rejected {} record(s) after {} attempt(s)",
            result.employee_count(),
            result.rejected_count(),
            outcome.attempts_used()
        ),
        None => println!("no valid document within budget"),
    }
    Ok(())
}
