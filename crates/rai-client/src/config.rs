//! Client configuration.
//!
//! Built explicitly, from a YAML `api:` section, or from the environment.

use serde::{Deserialize, Serialize};
use url::Url;

/// Default collaborator API location (the development stub).
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8095/api/v1";

/// Connection settings for the compliance API.
///
/// Custom `Debug` implementation redacts the `api_token` field.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root, e.g. `https://compliance.example.com/api/v1`.
    pub base_url: String,
    /// Bearer token, if the API requires one.
    pub api_token: Option<String>,
    /// Per-request timeout in seconds. Does not apply to the analysis stream.
    pub timeout_secs: u64,
    /// Retries after the first attempt for idempotent requests.
    pub max_retries: u32,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: None,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `RAI_API_URL` (default: [`DEFAULT_BASE_URL`])
    /// - `RAI_API_TOKEN` (optional)
    /// - `RAI_TIMEOUT_SECS` (default: 30)
    /// - `RAI_MAX_RETRIES` (default: 3)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            base_url: std::env::var("RAI_API_URL").unwrap_or(defaults.base_url),
            api_token: std::env::var("RAI_API_TOKEN").ok().filter(|t| !t.is_empty()),
            timeout_secs: env_number("RAI_TIMEOUT_SECS", defaults.timeout_secs)?,
            max_retries: env_number("RAI_MAX_RETRIES", defaults.max_retries)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the URL and limits before use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ConfigError::InvalidUrl(self.base_url.clone(), e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(
                self.base_url.clone(),
                format!("unsupported scheme {}", url.scheme()),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_secs",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

fn env_number<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            field: var,
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },
}
