//! Generation settings and agent configuration loading.
//!
//! [`AgentConfig`] merges, lowest priority first:
//! 1. built-in defaults
//! 2. a TOML file (`extraction-agent.toml`, or an explicit path)
//! 3. environment variables prefixed `EXTRACT_` (nested keys use `__`,
//!    e.g. `EXTRACT_LLM__MAX_TOKENS=2000`)
//!
//! The API key is never part of the config; it is read from
//! `OPENAI_API_KEY` by the caller.

use crate::backend::BackoffConfig;
use crate::error::{AgentError, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default project-level config file name.
pub const CONFIG_FILE: &str = "extraction-agent.toml";

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "EXTRACT_";

/// Per-call generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Temperature (0.0 = deterministic).
    pub temperature: f64,

    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// Ask the provider for a JSON object response.
    pub json_mode: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 1400,
            json_mode: true,
        }
    }
}

impl LlmConfig {
    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = temp;
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }
}

/// Everything needed to build a generator and a retry controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model identifier sent to the provider.
    pub model: String,

    /// Provider base URL.
    pub base_url: String,

    /// Extract/validate attempts per run, counting the first one.
    pub max_attempts: u32,

    /// Deadline for a single generator call, in seconds.
    pub timeout_secs: u64,

    /// Transport-level retries on 429/5xx/connection faults.
    pub transport_retries: u32,

    /// Concurrent runs in the evaluation suite.
    pub concurrency: usize,

    pub llm: LlmConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-mini".to_string(),
            base_url: "https://api.openai.com".to_string(),
            max_attempts: 3,
            timeout_secs: 60,
            transport_retries: 3,
            concurrency: 4,
            llm: LlmConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Load from defaults, the config file, and the environment.
    ///
    /// A missing file is not an error; an explicit `path` replaces the
    /// default file name.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path.unwrap_or_else(|| Path::new(CONFIG_FILE));
        Self::from_figment(
            Figment::from(Serialized::defaults(AgentConfig::default()))
                .merge(Toml::file(file))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    /// Extract and validate from an already assembled figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AgentConfig = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the controller cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(AgentError::InvalidConfig(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(AgentError::InvalidConfig(
                "timeout_secs must be at least 1".into(),
            ));
        }
        if self.concurrency == 0 {
            return Err(AgentError::InvalidConfig(
                "concurrency must be at least 1".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AgentError::InvalidConfig(format!(
                "temperature {} outside 0.0-2.0",
                self.llm.temperature
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Standard cloud backoff with the configured retry count.
    pub fn backoff(&self) -> BackoffConfig {
        BackoffConfig {
            max_retries: self.transport_retries,
            ..BackoffConfig::standard()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_llm_config_defaults() {
        let config = LlmConfig::default();
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.max_tokens, 1400);
        assert!(config.json_mode);
    }

    #[test]
    fn test_llm_config_builder() {
        let config = LlmConfig::default()
            .with_temperature(0.3)
            .with_max_tokens(4096)
            .with_json_mode(false);
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.max_tokens, 4096);
        assert!(!config.json_mode);
    }

    #[test]
    fn test_defaults_validate() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff().max_retries, 3);
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = AgentConfig {
            max_attempts: 0,
            ..AgentConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AgentError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "model = \"gpt-4o\"\nmax_attempts = 4\n\n[llm]\nmax_tokens = 2000"
        )
        .unwrap();

        let config = AgentConfig::from_figment(
            Figment::from(Serialized::defaults(AgentConfig::default()))
                .merge(Toml::file(file.path())),
        )
        .unwrap();

        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.llm.max_tokens, 2000);
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn test_invalid_file_value_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_attempts = \"many\"").unwrap();

        let err = AgentConfig::from_figment(
            Figment::from(Serialized::defaults(AgentConfig::default()))
                .merge(Toml::file(file.path())),
        )
        .unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }
}
