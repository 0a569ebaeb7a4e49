//! Configuration management for peopledesk.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::transport::RetryPolicy;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default config directory name.
const CONFIG_DIR_NAME: &str = "peopledesk";

/// Environment variable prefix.
const ENV_PREFIX: &str = "PEOPLEDESK_";

/// Default endpoint of the people resource.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/people";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `PEOPLEDESK_`, `__` between levels)
/// 2. TOML config file at `~/.config/peopledesk/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote API configuration.
    pub api: ApiConfig,
    /// Interface configuration.
    pub ui: UiConfig,
}

/// Remote API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the people collection; single records live at `{base_url}/{dni}`.
    pub base_url: String,
    /// Per-request deadline in milliseconds.
    pub timeout_ms: u64,
    /// Total attempts for retried operations (list, create, update).
    pub retries: u32,
    /// Base delay for exponential backoff in milliseconds.
    pub retry_base_delay_ms: u64,
    /// Upper bound of the random jitter added to each backoff, in milliseconds.
    pub retry_jitter_ms: u64,
}

/// Interface configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Quiet period before a search query is applied, in milliseconds.
    pub search_debounce_ms: u64,
    /// How long a notice stays visible, in milliseconds.
    pub notice_ms: u64,
    /// How long the "list refreshed" notice stays visible, in milliseconds.
    pub refresh_notice_ms: u64,
    /// Ask before deleting a record.
    pub confirm_deletes: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 8_000,
            retries: 2,
            retry_base_delay_ms: 150,
            retry_jitter_ms: 100,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            search_debounce_ms: 200,
            notice_ms: 3_500,
            refresh_notice_ms: 1_200,
            confirm_deletes: true,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        Self::load_with_base_url(config_path, None)
    }

    /// Load configuration, letting `base_url` replace whatever the file and
    /// environment say before validation runs.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails, or if the
    /// final values are invalid.
    pub fn load_with_base_url(
        config_path: Option<PathBuf>,
        base_url: Option<&str>,
    ) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config: Config = figment.extract()?;
        if let Some(base_url) = base_url {
            config.api.base_url = base_url.to_string();
        }
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.api.base_url).map_err(|e| Error::ConfigValidation {
            message: format!("invalid base_url {}: {e}", self.api.base_url),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::ConfigValidation {
                message: format!("base_url must be http or https, got {}", url.scheme()),
            });
        }

        if self.api.timeout_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "timeout_ms must be greater than 0".to_string(),
            });
        }

        if self.api.retries == 0 {
            return Err(Error::ConfigValidation {
                message: "retries must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.api.base_url.trim_end_matches('/')
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.api.timeout_ms)
    }

    /// Retry policy for the retried operations.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            tries: self.api.retries,
            base_delay: Duration::from_millis(self.api.retry_base_delay_ms),
            max_jitter: Duration::from_millis(self.api.retry_jitter_ms),
        }
    }

    /// Get the search debounce period as a Duration.
    #[must_use]
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.ui.search_debounce_ms)
    }

    /// Get the notice lifetime as a Duration.
    #[must_use]
    pub fn notice_duration(&self) -> Duration {
        Duration::from_millis(self.ui.notice_ms)
    }

    /// Get the lifetime of the "list refreshed" notice as a Duration.
    #[must_use]
    pub fn refresh_notice_duration(&self) -> Duration {
        Duration::from_millis(self.ui.refresh_notice_ms)
    }
}
