//! Configuration loading and credential resolution
//!
//! Bootstrap settings come from a single TOML file. Config file location
//! priority:
//! 1. Command-line argument (highest priority)
//! 2. `PVR_CONFIG` environment variable
//! 3. `<config dir>/pvr/pvr-vr.toml`
//! 4. Built-in defaults (a missing file is not fatal)
//!
//! Provider API keys resolve ENV → TOML.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PVR_CONFIG";

/// Environment variable carrying the ATTOM API key
pub const ATTOM_API_KEY_ENV: &str = "ATTOM_API_KEY";

/// Environment variable carrying the RentCast API key
pub const RENTCAST_API_KEY_ENV: &str = "RENTCAST_API_KEY";

/// Default ATTOM property API base URL
pub const DEFAULT_ATTOM_BASE_URL: &str = "https://api.gateway.attomdata.com/propertyapi/v1.0.0";

/// Default RentCast API base URL
pub const DEFAULT_RENTCAST_BASE_URL: &str = "https://api.rentcast.io/v1";

const CONFIG_FILE_NAME: &str = "pvr-vr.toml";

/// Bootstrap configuration loaded from TOML file
///
/// Every field has a built-in default, so an empty file (or no file at all)
/// yields a usable configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Outbound HTTP settings (optional)
    #[serde(default)]
    pub http: HttpConfig,

    /// ATTOM provider settings
    #[serde(default)]
    pub attom: ProviderConfig,

    /// RentCast provider settings
    #[serde(default)]
    pub rentcast: ProviderConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Outbound HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout applied to every upstream call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Per-provider settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    /// API key (the environment variable takes priority)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Override for the provider's API base URL
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_port() -> u16 {
    5730
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            logging: LoggingConfig::default(),
            http: HttpConfig::default(),
            attom: ProviderConfig::default(),
            rentcast: ProviderConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TomlConfig {
    /// ATTOM base URL, falling back to the public gateway
    pub fn attom_base_url(&self) -> &str {
        self.attom
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_ATTOM_BASE_URL)
    }

    /// RentCast base URL, falling back to the public API
    pub fn rentcast_base_url(&self) -> &str {
        self.rentcast
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_RENTCAST_BASE_URL)
    }
}

/// Locate the config file to load, if any
///
/// Returns `None` when no candidate applies; the caller then runs on
/// built-in defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config directory
    dirs::config_dir()
        .map(|d| d.join("pvr").join(CONFIG_FILE_NAME))
        .filter(|p| p.exists())
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Load configuration with graceful degradation
///
/// A missing file produces a warning and built-in defaults. A file that
/// exists but cannot be parsed is an error.
pub fn load_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        info!("No config file found, using built-in defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let config = load_toml_config(path)?;
    info!("Loaded TOML configuration from {}", path.display());
    Ok(config)
}

/// Resolve a provider API key from 2-tier configuration
///
/// **Priority:** ENV → TOML
///
/// A missing key is not an error: the provider reports it per resolution.
pub fn resolve_api_key(provider: &str, env_var: &str, toml_key: Option<&str>) -> Option<String> {
    let env_key = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_key.filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "{} API key found in both environment ({}) and TOML. Using environment.",
            provider, env_var
        );
    }

    if let Some(key) = env_key {
        info!("{} API key loaded from environment variable", provider);
        return Some(key.trim().to_string());
    }

    if let Some(key) = toml_key {
        info!("{} API key loaded from TOML config", provider);
        return Some(key.trim().to_string());
    }

    warn!(
        "{} API key not configured (set {} or [{}].api_key)",
        provider,
        env_var,
        provider.to_lowercase()
    );
    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
