//! Configuration management
//!
//! Plain serde structs with sensible defaults, environment-variable
//! overrides under the `VULNSIFT_` prefix, and an explicit `validate()`
//! pass before a config is handed to the engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration validation failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub osv: OsvConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

/// Knobs for the analysis engine itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Hard cap on extracted dependencies; truncation keeps discovery order.
    pub max_dependencies: usize,
    /// Bounded worker count for concurrent triage calls.
    pub triage_concurrency: usize,
    /// Timeout for repository acquisition (in seconds).
    pub acquire_timeout_seconds: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_dependencies: 1000,
            triage_concurrency: 4,
            acquire_timeout_seconds: 300,
        }
    }
}

impl AnalysisConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

/// OSV advisory database client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OsvConfig {
    pub base_url: String,
    pub request_timeout_seconds: u64,
}

impl Default for OsvConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.osv.dev".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

impl OsvConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Completion provider configuration for triage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// Low temperature keeps triage output stable across runs.
    pub temperature: f32,
    pub max_tokens: u32,
    /// Per-call timeout; expiry routes the pair into the fallback path.
    pub request_timeout_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            max_tokens: 1000,
            request_timeout_seconds: 60,
            api_key: None,
        }
    }
}

impl LlmConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter directive, e.g. "info" or "vulnsift=debug".
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Build a config from defaults plus `VULNSIFT_*` environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(value) = env_parse::<usize>("VULNSIFT_MAX_DEPENDENCIES") {
            config.analysis.max_dependencies = value;
        }
        if let Some(value) = env_parse::<usize>("VULNSIFT_TRIAGE_CONCURRENCY") {
            config.analysis.triage_concurrency = value;
        }
        if let Some(value) = env_parse::<u64>("VULNSIFT_ACQUIRE_TIMEOUT_SECONDS") {
            config.analysis.acquire_timeout_seconds = value;
        }
        if let Ok(value) = std::env::var("VULNSIFT_OSV_BASE_URL") {
            config.osv.base_url = value;
        }
        if let Ok(value) = std::env::var("VULNSIFT_LLM_BASE_URL") {
            config.llm.base_url = value;
        }
        if let Ok(value) = std::env::var("VULNSIFT_LLM_MODEL") {
            config.llm.model = value;
        }
        if let Ok(value) = std::env::var("VULNSIFT_LLM_API_KEY") {
            config.llm.api_key = Some(value);
        }
        if let Ok(value) = std::env::var("VULNSIFT_LOG_LEVEL") {
            config.logging.level = value;
        }

        config
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.max_dependencies == 0 {
            return Err(ConfigError::Invalid {
                field: "analysis.max_dependencies".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.analysis.triage_concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "analysis.triage_concurrency".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid {
                field: "llm.temperature".to_string(),
                reason: "must be within 0.0..=2.0".to_string(),
            });
        }
        if self.osv.base_url.is_empty() {
            return Err(ConfigError::Invalid {
                field: "osv.base_url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|raw| raw.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.analysis.max_dependencies, 1000);
        assert_eq!(config.osv.base_url, "https://api.osv.dev");
    }

    #[test]
    fn test_zero_cap_rejected() {
        let mut config = Config::default();
        config.analysis.max_dependencies = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_temperature_range_enforced() {
        let mut config = Config::default();
        config.llm.temperature = 3.5;
        assert!(config.validate().is_err());
    }
}
