//! Layered client configuration.
//!
//! Settings come from built-in defaults, an optional TOML file and
//! `STOREFRONT__`-prefixed environment variables, in increasing priority.
//! Nested keys use a double underscore, e.g. `STOREFRONT__RETRY__MAX_ATTEMPTS=5`.

use config::{Config, Environment, File, FileFormat};
use reqwest::Url;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::error::log::DEFAULT_LOG_CAPACITY;
use crate::fetch::FetchConfig;
use crate::retry::RetryPolicy;

/// Public dummyjson API root.
pub const DEFAULT_BASE_URL: &str = "https://dummyjson.com";

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "STOREFRONT";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// The configuration could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(#[from] config::ConfigError),

    /// The configuration file path is invalid.
    #[error("invalid configuration path: {0}")]
    InvalidPath(String),

    #[error("invalid api.base_url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// API endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    /// Per-request deadline in milliseconds; 0 disables it.
    pub timeout_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

/// Backoff settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            jitter_ms: 1000,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_jitter(Duration::from_millis(self.jitter_ms))
    }
}

/// Fetch wrapper defaults.
///
/// Catalog calls always surface failures as errors, so only logging is
/// configurable here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub log_errors: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self { log_errors: true }
    }
}

impl FetchSettings {
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig::default().with_log_errors(self.log_errors)
    }
}

/// In-memory error log settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub capacity: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    pub api: ApiSettings,
    pub retry: RetrySettings,
    pub fetch: FetchSettings,
    pub log: LogSettings,
}

impl StorefrontConfig {
    /// Loads configuration from an optional TOML file plus environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The given file does not exist or its path is not valid UTF-8
    /// - A source cannot be parsed
    /// - `api.base_url` is not an absolute http(s) URL
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            let path_str = path
                .to_str()
                .ok_or_else(|| ConfigError::InvalidPath(format!("{:?}", path)))?;
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path_str.to_string()));
            }
            builder = builder.add_source(File::new(path_str, FileFormat::Toml));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: StorefrontConfig = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Parses configuration from a TOML string, without environment overrides.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?;
        let parsed: StorefrontConfig = config.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// The API root as a URL.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: self.api.base_url.clone(),
            reason,
        };

        let url = Url::parse(&self.api.base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        if url.cannot_be_a_base() {
            return Err(invalid("not a base URL".to_string()));
        }
        Ok(url)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.base_url().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::default();
        assert_eq!(config.api.base_url, "https://dummyjson.com");
        assert_eq!(config.api.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.max_delay_ms, 30_000);
        assert!(config.fetch.log_errors);
        assert_eq!(config.log.capacity, 100);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = StorefrontConfig::from_toml(
            r#"
            [api]
            base_url = "http://localhost:8080"
            timeout_ms = 0

            [retry]
            max_attempts = 5
            base_delay_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.api.timeout(), None);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.jitter_ms, 1000);
        assert_eq!(config.fetch, FetchSettings::default());

        let policy = config.retry.policy();
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = StorefrontConfig::from_toml("[api]\nbase_url = \"ftp://example.com\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));

        let err = StorefrontConfig::from_toml("[api]\nbase_url = \"not a url\"").unwrap_err();
        assert!(err.to_string().contains("not a url"));
    }

    #[test]
    fn test_malformed_toml() {
        let err = StorefrontConfig::from_toml("[retry\nmax_attempts = ").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = StorefrontConfig::load(Some(Path::new("/nonexistent/storefront.toml")))
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[fetch]\nlog_errors = false\n[log]\ncapacity = 7").unwrap();

        let config = StorefrontConfig::load(Some(file.path())).unwrap();
        assert!(!config.fetch.log_errors);
        assert_eq!(config.fetch.fetch_config(), FetchConfig::silent());
        assert!(config.fetch.fetch_config().throw_on_error);
        assert_eq!(config.log.capacity, 7);
    }
}
