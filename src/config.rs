//! Client and retry configuration.
//!
//! Configuration can be built in code, read from environment variables,
//! or (with the `yaml` feature) loaded from a YAML file:
//!
//! ```yaml
//! base_url: "https://byos.example.com"
//! access_token: "abc123"
//! timeout_secs: 20
//! retry:
//!   max_retries: 3
//!   max_backoff_ms: 16000
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::Error;
use crate::{
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, INITIAL_BACKOFF_MS, MAX_BACKOFF_MS, MAX_RETRIES,
    RATE_LIMIT_STATUS,
};

/// Retry policy for rate-limited (HTTP 429) responses.
///
/// Defaults: 5 retries, 1s initial backoff, 32s ceiling, status 429.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum retries after the initial attempt
    pub max_retries: u32,
    /// Base delay for exponential backoff (milliseconds)
    pub initial_backoff_ms: u64,
    /// Upper bound for any single backoff delay (milliseconds)
    pub max_backoff_ms: u64,
    /// Status code that triggers a retry
    pub rate_limit_status: u16,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            initial_backoff_ms: INITIAL_BACKOFF_MS,
            max_backoff_ms: MAX_BACKOFF_MS,
            rate_limit_status: RATE_LIMIT_STATUS,
        }
    }
}

impl RetryConfig {
    /// Set the retry budget.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the initial backoff delay.
    #[must_use]
    pub fn with_initial_backoff(mut self, initial: Duration) -> Self {
        self.initial_backoff_ms = initial.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    /// Set the backoff ceiling.
    #[must_use]
    pub fn with_max_backoff(mut self, max: Duration) -> Self {
        self.max_backoff_ms = max.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    /// Initial backoff as a `Duration`.
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Backoff ceiling as a `Duration`.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Connection settings for a TRMNL (or BYOS) server.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Server base URL without trailing slash (default: `https://usetrmnl.com`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Device API key, sent as the `access-token` header
    pub access_token: String,

    /// Device MAC address, sent as the `ID` header to BYOS servers
    #[serde(default)]
    pub device_id: Option<String>,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Rate-limit retry policy
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .field("device_id", &self.device_id)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ClientConfig {
    /// Create a config for the hosted TRMNL API.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            base_url: default_base_url(),
            access_token: access_token.into(),
            device_id: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryConfig::default(),
        }
    }

    /// Read config from environment variables.
    ///
    /// - `TRMNL_ACCESS_TOKEN` (required)
    /// - `TRMNL_BASE_URL` (optional, e.g. a BYOS server)
    /// - `TRMNL_DEVICE_ID` (optional)
    /// - `TRMNL_TIMEOUT_SECS` (optional)
    pub fn from_env() -> Result<Self, Error> {
        let token = std::env::var("TRMNL_ACCESS_TOKEN")
            .map_err(|_| Error::Config("missing TRMNL_ACCESS_TOKEN".to_string()))?;

        let mut config = Self::new(token);
        if let Ok(url) = std::env::var("TRMNL_BASE_URL") {
            config = config.with_base_url(url);
        }
        if let Ok(id) = std::env::var("TRMNL_DEVICE_ID") {
            config.device_id = Some(id);
        }
        if let Ok(secs) = std::env::var("TRMNL_TIMEOUT_SECS") {
            config.timeout_secs = secs
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("invalid TRMNL_TIMEOUT_SECS '{}'", secs)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load config from a YAML file.
    #[cfg(feature = "yaml")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    #[cfg(feature = "yaml")]
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        let mut config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::Config(format!("Invalid config YAML: {}", e)))?;
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }

    /// Point the client at a different server (BYOS or a test server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the device MAC address.
    #[must_use]
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Per-request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.access_token.trim().is_empty() {
            return Err(Error::Config("access token is empty".to_string()));
        }
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("base URL is empty".to_string()));
        }
        Ok(())
    }
}
