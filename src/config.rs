// Configuration file parser.
// Reads optional settings for the catalog client and the query cache from config.toml.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::cache::{DEFAULT_MAX_PAGES, FreshnessPolicy, RetryPolicy};
use crate::swapi::{DEFAULT_TIMEOUT, SWAPI_BASE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Application configuration. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the catalog API.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// How long a fetched page counts as fresh. 0 revalidates on every visit.
    pub page_ttl_secs: u64,
    /// Wait before a failed request is attempted again on its own.
    pub error_retry_secs: u64,
    /// Cap on cached pages. Records are never evicted.
    pub max_cached_pages: usize,
    /// Extra attempts after a transport failure.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        let freshness = FreshnessPolicy::default();
        let retry = RetryPolicy::default();
        Self {
            base_url: SWAPI_BASE.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            page_ttl_secs: freshness.page_ttl.as_secs(),
            error_retry_secs: freshness.error_retry.as_secs(),
            max_cached_pages: DEFAULT_MAX_PAGES,
            max_retries: retry.max_retries,
            retry_base_delay_ms: retry.base_delay.as_millis() as u64,
        }
    }
}

const KNOWN_KEYS: &[&str] = &[
    "base_url",
    "request_timeout_secs",
    "page_ttl_secs",
    "error_retry_secs",
    "max_cached_pages",
    "max_retries",
    "retry_base_delay_ms",
];

impl Config {
    const MAX_FILE_SIZE: u64 = 65_536;

    /// Load configuration from a TOML file.
    ///
    /// A missing or empty file yields the defaults. Unknown keys are logged and ignored.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "{} is {} bytes (max {} bytes)",
                    path.display(),
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(path = %path.display(), base_url = %config.base_url, "Loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if url::Url::parse(&self.base_url).is_err() {
            return Err(ConfigError::Invalid(format!(
                "base_url {:?} is not a URL",
                self.base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.max_cached_pages == 0 {
            return Err(ConfigError::Invalid(
                "max_cached_pages must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn freshness(&self) -> FreshnessPolicy {
        FreshnessPolicy {
            page_ttl: Duration::from_secs(self.page_ttl_secs),
            error_retry: Duration::from_secs(self.error_retry_secs),
        }
    }

    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}
