use std::time::Duration;

use anyhow::{Context, Result};

use crate::embeddings::cache::DEFAULT_TTL;
use crate::embeddings::model::DEFAULT_DIMENSIONS;
use crate::llm_client::DEFAULT_MAX_TOKENS;
use crate::orchestrator::{DEFAULT_MAX_ITERATIONS, DEFAULT_MODEL_TIMEOUT};

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub max_tool_iterations: usize,
    pub model_timeout: Duration,
    pub max_output_tokens: u32,
    pub embedding_ttl: Duration,
    /// Zero disables the background sweep.
    pub embedding_sweep_interval: Duration,
    pub embedding_dimensions: usize,
    /// When set, embeddings come from this feature-extraction endpoint
    /// instead of the local hashing extractor.
    pub embedding_endpoint: Option<String>,
    pub embedding_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. `from_env` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            anthropic_api_key: optional("ANTHROPIC_API_KEY").with_context(|| {
                "Required environment variable 'ANTHROPIC_API_KEY' is not set".to_string()
            })?,
            port: parse_or(optional("PORT"), 8080, "PORT must be a valid port number")?,
            rust_log: optional("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            max_tool_iterations: parse_or(
                optional("MAX_TOOL_ITERATIONS"),
                DEFAULT_MAX_ITERATIONS,
                "MAX_TOOL_ITERATIONS must be a non-negative integer",
            )?,
            model_timeout: Duration::from_secs(parse_or(
                optional("MODEL_TIMEOUT_SECS"),
                DEFAULT_MODEL_TIMEOUT.as_secs(),
                "MODEL_TIMEOUT_SECS must be a number of seconds",
            )?),
            max_output_tokens: parse_or(
                optional("MAX_OUTPUT_TOKENS"),
                DEFAULT_MAX_TOKENS,
                "MAX_OUTPUT_TOKENS must be a positive integer",
            )?,
            embedding_ttl: Duration::from_secs(parse_or(
                optional("EMBEDDING_TTL_SECS"),
                DEFAULT_TTL.as_secs(),
                "EMBEDDING_TTL_SECS must be a number of seconds",
            )?),
            embedding_sweep_interval: Duration::from_secs(parse_or(
                optional("EMBEDDING_SWEEP_INTERVAL_SECS"),
                0,
                "EMBEDDING_SWEEP_INTERVAL_SECS must be a number of seconds",
            )?),
            embedding_dimensions: parse_or(
                optional("EMBEDDING_DIMENSIONS"),
                DEFAULT_DIMENSIONS,
                "EMBEDDING_DIMENSIONS must be a positive integer",
            )?,
            embedding_endpoint: optional("EMBEDDING_ENDPOINT"),
            embedding_api_key: optional("EMBEDDING_API_KEY"),
        })
    }
}

fn parse_or<T>(raw: Option<String>, default: T, message: &'static str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value.trim().parse::<T>().context(message),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults_applied() {
        let config = config_from(&[("ANTHROPIC_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.max_tool_iterations, 8);
        assert_eq!(config.model_timeout, Duration::from_secs(60));
        assert_eq!(config.max_output_tokens, 4096);
        assert_eq!(config.embedding_ttl, Duration::from_secs(86_400));
        assert!(config.embedding_sweep_interval.is_zero());
        assert_eq!(config.embedding_dimensions, 384);
        assert!(config.embedding_endpoint.is_none());
    }

    #[test]
    fn test_missing_api_key_fails() {
        let err = config_from(&[("PORT", "3000")]).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        assert!(config_from(&[("ANTHROPIC_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn test_overrides_parsed() {
        let config = config_from(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("PORT", "3000"),
            ("MAX_TOOL_ITERATIONS", "4"),
            ("MODEL_TIMEOUT_SECS", "15"),
            ("EMBEDDING_SWEEP_INTERVAL_SECS", "300"),
            ("EMBEDDING_ENDPOINT", "http://localhost:8081/embed"),
        ])
        .unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_tool_iterations, 4);
        assert_eq!(config.model_timeout, Duration::from_secs(15));
        assert_eq!(config.embedding_sweep_interval, Duration::from_secs(300));
        assert_eq!(
            config.embedding_endpoint.as_deref(),
            Some("http://localhost:8081/embed")
        );
    }

    #[test]
    fn test_bad_number_reports_variable() {
        let err = config_from(&[("ANTHROPIC_API_KEY", "sk-test"), ("PORT", "eighty")]).unwrap_err();
        assert_eq!(err.to_string(), "PORT must be a valid port number");
    }
}
