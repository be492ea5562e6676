//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;
use trail_observe::EngineConfig;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Recorder settings: storage mode, key and retention bound.
    #[serde(default)]
    pub recorder: EngineConfig,

    /// Long-term storage settings, used when `recorder.storage = "local"`.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Read-only bridge settings.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Long-term storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Origin the stored entries are scoped to.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,

    /// Byte quota per origin. `None` disables the check.
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: Option<usize>,
}

/// Bridge configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Namespace the trail is published under.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trail_observe=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3300
}

fn default_db_path() -> String {
    "activity-trail.db".to_string()
}

fn default_origin() -> String {
    "http://localhost".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    4
}

fn default_quota_bytes() -> Option<usize> {
    Some(5 * 1024 * 1024)
}

fn default_namespace() -> String {
    trail_observe::bridge::DEFAULT_NAMESPACE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
            quota_bytes: default_quota_bytes(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `TRAIL_HOST` overrides `server.host`
/// - `TRAIL_PORT` overrides `server.port`
/// - `TRAIL_STORAGE` overrides `recorder.storage`
/// - `TRAIL_STORAGE_KEY` overrides `recorder.storage_key`
/// - `TRAIL_MAX_EVENTS` overrides `recorder.max_events`
/// - `TRAIL_DB_PATH` overrides `storage.db_path`
/// - `TRAIL_ORIGIN` overrides `storage.origin`
/// - `TRAIL_LOG_LEVEL` overrides `logging.level`
/// - `TRAIL_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => parse_config(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Parses configuration from TOML text.
///
/// # Errors
///
/// Returns `ConfigError::Parse` on malformed TOML or mistyped values.
pub fn parse_config(contents: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(contents)?)
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(host) = var("TRAIL_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = var("TRAIL_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(storage) = var("TRAIL_STORAGE") {
        match storage.parse() {
            Ok(mode) => config.recorder.storage = mode,
            Err(e) => tracing::warn!(error = %e, "ignoring TRAIL_STORAGE"),
        }
    }
    if let Some(key) = var("TRAIL_STORAGE_KEY") {
        config.recorder.storage_key = key;
    }
    if let Some(max) = var("TRAIL_MAX_EVENTS") {
        if let Ok(parsed) = max.parse() {
            config.recorder.max_events = Some(parsed);
        }
    }
    if let Some(db_path) = var("TRAIL_DB_PATH") {
        config.storage.db_path = db_path;
    }
    if let Some(origin) = var("TRAIL_ORIGIN") {
        config.storage.origin = origin;
    }
    if let Some(level) = var("TRAIL_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("TRAIL_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
