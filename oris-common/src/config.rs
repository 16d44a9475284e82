//! Configuration loading
//!
//! Bootstrap configuration is resolved in priority order:
//! 1. Command-line argument (explicit config path, explicit API URL)
//! 2. Environment variables (`ORIS_CONFIG`, `ORIS_API_URL`)
//! 3. TOML config file in the platform config directory
//! 4. Compiled defaults
//!
//! A missing config file is not an error: a warning is logged and defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ORIS_CONFIG";

/// Environment variable overriding the API base URL
pub const API_URL_ENV_VAR: &str = "ORIS_API_URL";

const DEFAULT_API_URL: &str = "https://oris.orientacnisporty.cz/API/";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Results service settings
    #[serde(default)]
    pub oris: OrisConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Results service client settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrisConfig {
    /// Base URL of the JSON API
    #[serde(default = "default_api_url")]
    pub base_url: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retries after a transient fetch failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Client-side rate limit
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Concurrent placement lookups while building a runner timeline
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl OrisConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("oris.base_url must not be empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "oris.request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.requests_per_second == 0 {
            return Err(Error::Config(
                "oris.requests_per_second must be positive".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(Error::Config("oris.concurrency must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for OrisConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            request_timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            requests_per_second: default_requests_per_second(),
            concurrency: default_concurrency(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_max_retries() -> u32 {
    2
}

fn default_requests_per_second() -> u32 {
    5
}

fn default_concurrency() -> usize {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.oris.validate()?;
        Ok(config)
    }

    /// Load a specific TOML file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Resolve the configuration following the priority order in the module docs
    pub fn resolve(cli_path: Option<&Path>, cli_api_url: Option<&str>) -> Result<Self> {
        Self::resolve_with_origin(cli_path, cli_api_url).map(|(config, _)| config)
    }

    /// Like [`TomlConfig::resolve`], also reporting where the file settings came from
    ///
    /// Nothing is logged here; resolution runs before logging is set up.
    pub fn resolve_with_origin(
        cli_path: Option<&Path>,
        cli_api_url: Option<&str>,
    ) -> Result<(Self, ConfigOrigin)> {
        let (mut config, origin) = match config_file_path(cli_path) {
            Some(path) if path.exists() => {
                let config = Self::load_file(&path)?;
                (config, ConfigOrigin::File(path))
            }
            Some(path) if cli_path.is_some() || std::env::var_os(CONFIG_ENV_VAR).is_some() => {
                // An explicitly named file must exist
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            _ => (Self::default(), ConfigOrigin::Defaults),
        };

        if let Ok(url) = std::env::var(API_URL_ENV_VAR) {
            if !url.trim().is_empty() {
                config.oris.base_url = url;
            }
        }
        if let Some(url) = cli_api_url {
            config.oris.base_url = url.to_string();
        }

        config.oris.validate()?;
        Ok((config, origin))
    }
}

/// Where the resolved configuration was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    File(PathBuf),
    /// No config file; built-in defaults
    Defaults,
}

impl ConfigOrigin {
    /// Report the origin once the subscriber is installed
    pub fn log(&self) {
        match self {
            ConfigOrigin::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigOrigin::Defaults => warn!("No config file found, using built-in defaults"),
        }
    }
}

/// Config file location: CLI argument, then `ORIS_CONFIG`, then the platform default
fn config_file_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }
    default_config_path()
}

/// `~/.config/oris-analyzer/config.toml` (or the platform equivalent)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("oris-analyzer").join("config.toml"))
}

/// User-Agent sent to the results service
pub fn get_user_agent() -> String {
    format!("oris-analyzer/{}", env!("CARGO_PKG_VERSION"))
}
