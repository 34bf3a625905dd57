//! Run the agent over every `*.txt` file in a directory and print a summary.
//!
//! ```text
//! export OPENAI_API_KEY="sk-..."
//! cargo run --example run_agent_suite -- [test_inputs] [--json]
//! ```
//!
//! Settings come from `extraction-agent.toml` and `EXTRACT_*` variables;
//! the suite defaults to 4 attempts per case.

use anyhow::{bail, Result};
use extraction_agent::config::{AgentConfig, CONFIG_FILE, ENV_PREFIX};
use extraction_agent::eval::{load_cases, run_suite};
use extraction_agent::{BackendGenerator, RetryController};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SUITE_MAX_ATTEMPTS: u32 = 4;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let mut dir = PathBuf::from("test_inputs");
    let mut as_json = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => as_json = true,
            other => dir = PathBuf::from(other),
        }
    }

    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
    if api_key.trim().is_empty() {
        bail!("OPENAI_API_KEY is not set. Export your key before running the suite:\n\n    export OPENAI_API_KEY=\"sk-...\"");
    }

    let config = AgentConfig::from_figment(
        Figment::from(Serialized::defaults(AgentConfig {
            max_attempts: SUITE_MAX_ATTEMPTS,
            ..AgentConfig::default()
        }))
        .merge(Toml::file(CONFIG_FILE))
        .merge(Env::prefixed(ENV_PREFIX).split("__")),
    )?;

    let cases = load_cases(&dir)?;
    if cases.is_empty() {
        bail!("no *.txt inputs found in {}", dir.display());
    }
    info!(
        cases = cases.len(),
        model = %config.model,
        max_attempts = config.max_attempts,
        concurrency = config.concurrency,
        "running suite"
    );

    let cancel = Arc::new(AtomicBool::new(false));
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling remaining runs");
            on_ctrl_c.store(true, Ordering::Relaxed);
        }
    });

    let controller = RetryController::from_config(
        Arc::new(BackendGenerator::openai(
            &config,
            api_key.trim(),
            Some(cancel.clone()),
        )?),
        &config,
    )?
    .with_cancellation(cancel);
    let report = run_suite(cases, config.concurrency, |_| controller.clone()).await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}
