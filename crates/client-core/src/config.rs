//! Configuration management for the client.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default auth endpoint (can be overridden at compile time via HOMEGRID_AUTH_URL env var).
pub const DEFAULT_AUTH_URL: &str = match option_env!("HOMEGRID_AUTH_URL") {
    Some(url) => url,
    None => "https://homegrid.app/api/auth.php",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default franchise id used when the server omits one in a profile.
pub const DEFAULT_FRANCHISE_ID: &str = "HomegridDefault";

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Unified auth endpoint URL.
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    /// Franchise id to fall back to when the server omits one.
    #[serde(default = "default_franchise_id")]
    pub default_franchise_id: String,
    /// Human-readable device name sent with verify requests.
    #[serde(default = "default_device_name")]
    pub device_name: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.to_string()
}

fn default_franchise_id() -> String {
    DEFAULT_FRANCHISE_ID.to_string()
}

fn default_device_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown-device".to_string())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            auth_url: default_auth_url(),
            default_franchise_id: default_franchise_id(),
            device_name: default_device_name(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults.
    /// Note: auth_url is compile-time only and always uses the built-in
    /// default, regardless of what's in the config file.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        // Force the compile-time endpoint (never from the config file)
        config.auth_url = DEFAULT_AUTH_URL.to_string();

        config.load_from_env();

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let config_path = paths.config_file();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Override configuration from environment variables.
    /// Only log_level can be overridden at runtime.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("HOMEGRID_LOG_LEVEL") {
            self.log_level = log_level;
        }
    }

    /// Get the auth endpoint as a parsed URL.
    pub fn auth_url(&self) -> CoreResult<Url> {
        Url::parse(&self.auth_url).map_err(CoreError::from)
    }
}
