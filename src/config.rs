//! Process configuration
//!
//! Built once at startup from the environment (a `.env` file is honoured)
//! and shared read-only with the agent, tools and HTTP layer.
//!
//! - `OPENAI_API_KEY` / `POLYGON_API_KEY` - collaborator secrets
//! - `OPENAI_MODEL` - defaults to `gpt-4o-mini`
//! - `OPENAI_BASE_URL` - defaults to `https://api.openai.com/v1`
//! - `OPENAI_TEMPERATURE` - defaults to `0.7`
//! - `POLYGON_BASE_URL` - defaults to `https://api.polygon.io`
//! - `AGENT_MAX_ITERATIONS` - tool rounds per request, `0` disables the bound (default `12`)
//! - `HTTP_TIMEOUT_SECS` - outbound request timeout (default `60`)
//! - `PORT` / `API_PORT` - HTTP listen port (default `8080`)

use crate::error::AdvisorError;
use crate::Result;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_POLYGON_BASE_URL: &str = "https://api.polygon.io";

/// One entry decision plus two nodes per round stays inside a 25-step budget.
pub const DEFAULT_MAX_ITERATIONS: usize = 12;

#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub openai_api_key: String,
    pub polygon_api_key: String,
    pub model: String,
    pub openai_base_url: String,
    pub temperature: f32,
    pub polygon_base_url: String,
    /// `None` means the loop runs until the model produces an answer.
    pub max_iterations: Option<usize>,
    pub http_timeout: Duration,
    pub port: u16,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            polygon_api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            temperature: 0.7,
            polygon_base_url: DEFAULT_POLYGON_BASE_URL.to_string(),
            max_iterations: Some(DEFAULT_MAX_ITERATIONS),
            http_timeout: Duration::from_secs(60),
            port: 8080,
        }
    }
}

impl AdvisorConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY").unwrap_or_default();
        if openai_api_key.is_empty() {
            warn!("OPENAI_API_KEY is not set; model calls will be rejected upstream");
        }

        let polygon_api_key = get("POLYGON_API_KEY").unwrap_or_default();
        if polygon_api_key.is_empty() {
            warn!("POLYGON_API_KEY is not set; market data calls will be rejected upstream");
        }

        let max_iterations = match get("AGENT_MAX_ITERATIONS") {
            Some(raw) => match parse_value::<usize>("AGENT_MAX_ITERATIONS", &raw)? {
                0 => None,
                n => Some(n),
            },
            None => defaults.max_iterations,
        };

        let port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => parse_value("PORT", &raw)?,
            None => defaults.port,
        };

        Ok(Self {
            openai_api_key,
            polygon_api_key,
            model: get("OPENAI_MODEL").unwrap_or(defaults.model),
            openai_base_url: get("OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.openai_base_url),
            temperature: match get("OPENAI_TEMPERATURE") {
                Some(raw) => parse_value("OPENAI_TEMPERATURE", &raw)?,
                None => defaults.temperature,
            },
            polygon_base_url: get("POLYGON_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.polygon_base_url),
            max_iterations,
            http_timeout: match get("HTTP_TIMEOUT_SECS") {
                Some(raw) => Duration::from_secs(parse_value("HTTP_TIMEOUT_SECS", &raw)?),
                None => defaults.http_timeout,
            },
            port,
        })
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| AdvisorError::ConfigError(format!("{} has invalid value '{}'", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = AdvisorConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_iterations, Some(DEFAULT_MAX_ITERATIONS));
        assert_eq!(config.port, 8080);
        assert!(config.openai_api_key.is_empty());
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = AdvisorConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("POLYGON_API_KEY", "pg-test"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("POLYGON_BASE_URL", "http://localhost:9000/"),
            ("API_PORT", "3000"),
            ("HTTP_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.openai_api_key, "sk-test");
        assert_eq!(config.polygon_api_key, "pg-test");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.polygon_base_url, "http://localhost:9000");
        assert_eq!(config.port, 3000);
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_zero_iterations_disables_bound() {
        let config =
            AdvisorConfig::from_lookup(lookup_from(&[("AGENT_MAX_ITERATIONS", "0")])).unwrap();
        assert_eq!(config.max_iterations, None);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let result = AdvisorConfig::from_lookup(lookup_from(&[("PORT", "eighty")]));
        assert!(matches!(result, Err(AdvisorError::ConfigError(_))));
    }
}
