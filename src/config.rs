//! Runtime configuration loaded from environment variables.
//!
//! - `GOOGLE_API_KEY` (required): key for the Gemini API
//! - `TAVILY_API_KEY` (optional): key for research; without it research degrades
//! - `ITBP_MODEL`: Gemini model name
//! - `ITBP_GEMINI_URL` / `ITBP_TAVILY_URL`: API base URLs
//! - `ITBP_REQUEST_TIMEOUT_SECS`: timeout for each outbound request

use std::time::Duration;

use thiserror::Error;

use crate::gateway::{GenerationParams, GEMINI_BASE_URL};
use crate::research::TAVILY_BASE_URL;

pub const DEFAULT_MODEL: &str = "gemini-2.5-pro-preview-05-06";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub google_api_key: String,
    pub tavily_api_key: Option<String>,
    pub model: String,
    pub gemini_base_url: String,
    pub tavily_base_url: String,
    pub request_timeout: Duration,
    pub generation: GenerationParams,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let google_api_key = get("GOOGLE_API_KEY").ok_or(ConfigError::Missing("GOOGLE_API_KEY"))?;
        let tavily_api_key = get("TAVILY_API_KEY");

        let request_timeout = match get("ITBP_REQUEST_TIMEOUT_SECS") {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "ITBP_REQUEST_TIMEOUT_SECS",
                        value,
                    })
                }
            },
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            google_api_key,
            tavily_api_key,
            model: get("ITBP_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_base_url: get("ITBP_GEMINI_URL").unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            tavily_base_url: get("ITBP_TAVILY_URL").unwrap_or_else(|| TAVILY_BASE_URL.to_string()),
            request_timeout,
            generation: GenerationParams::default(),
        })
    }

    /// Whether the research phase can reach the research service.
    pub fn research_enabled(&self) -> bool {
        self.tavily_api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn google_key_is_required() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("GOOGLE_API_KEY"));
    }

    #[test]
    fn blank_google_key_counts_as_missing() {
        let err = Config::from_lookup(lookup(&[("GOOGLE_API_KEY", "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("GOOGLE_API_KEY"));
    }

    #[test]
    fn defaults_apply_when_only_google_key_is_set() {
        let config = Config::from_lookup(lookup(&[("GOOGLE_API_KEY", "g")])).unwrap();
        assert_eq!(config.google_api_key, "g");
        assert!(config.tavily_api_key.is_none());
        assert!(!config.research_enabled());
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.request_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.generation, GenerationParams::default());
    }

    #[test]
    fn overrides_are_read() {
        let config = Config::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "g"),
            ("TAVILY_API_KEY", "t"),
            ("ITBP_MODEL", "gemini-flash"),
            ("ITBP_REQUEST_TIMEOUT_SECS", "30"),
            ("ITBP_GEMINI_URL", "http://localhost:1"),
        ]))
        .unwrap();
        assert!(config.research_enabled());
        assert_eq!(config.model, "gemini-flash");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.gemini_base_url, "http://localhost:1");
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "g"),
            ("ITBP_REQUEST_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "ITBP_REQUEST_TIMEOUT_SECS",
                ..
            }
        ));
    }
}
