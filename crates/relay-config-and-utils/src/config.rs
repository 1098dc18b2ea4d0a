//! Configuration management for the relay.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use url::Url;

/// Default base URL for cookie-authenticated requests (override at compile time via TBRELAY_API_BASE_URL).
pub const DEFAULT_API_BASE_URL: &str = match option_env!("TBRELAY_API_BASE_URL") {
    Some(url) => url,
    None => "https://old.reddit.com",
};

/// Default base URL for OAuth requests (override at compile time via TBRELAY_OAUTH_BASE_URL).
pub const DEFAULT_OAUTH_BASE_URL: &str = match option_env!("TBRELAY_OAUTH_BASE_URL") {
    Some(url) => url,
    None => "https://oauth.reddit.com",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default lifetime of durable cache entries, in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

fn default_user_agent() -> String {
    format!("tbrelay/{}", env!("CARGO_PKG_VERSION"))
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_oauth_base_url() -> String {
    DEFAULT_OAUTH_BASE_URL.to_string()
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

/// Main relay configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Base URL for requests without OAuth.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Base URL for OAuth requests.
    #[serde(default = "default_oauth_base_url")]
    pub oauth_base_url: String,
    /// User-Agent sent with every upstream request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Durable cache entry lifetime. Zero disables expiry.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
            oauth_base_url: default_oauth_base_url(),
            user_agent: default_user_agent(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl Config {
    /// Load configuration from the config file, falling back to defaults.
    /// Environment variables win over the file.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            debug!(path = %config_path.display(), "Loading config file");
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let config_path = paths.config_file();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Write the built-in defaults to the config file if there is none yet.
    ///
    /// Returns whether a file was written. Environment overrides are not saved.
    pub fn write_default_if_missing(paths: &Paths) -> CoreResult<bool> {
        if paths.config_file().exists() {
            return Ok(false);
        }
        Self::default().save(paths)?;
        Ok(true)
    }

    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("TBRELAY_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(url) = std::env::var("TBRELAY_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Ok(url) = std::env::var("TBRELAY_OAUTH_BASE_URL") {
            self.oauth_base_url = url;
        }
    }

    /// Reject base URLs that cannot be used for requests.
    pub fn validate(&self) -> CoreResult<()> {
        for url in [self.api_base_url()?, self.oauth_base_url()?] {
            if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
                return Err(CoreError::Config(format!(
                    "base URL must be http(s): {}",
                    url
                )));
            }
        }
        Ok(())
    }

    /// Get the API base URL as a parsed URL.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(CoreError::from)
    }

    /// Get the OAuth base URL as a parsed URL.
    pub fn oauth_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.oauth_base_url).map_err(CoreError::from)
    }
}
