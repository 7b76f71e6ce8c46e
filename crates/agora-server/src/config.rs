//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Generative model backend.
    #[serde(default)]
    pub model: ModelConfig,

    /// Web search used for fact-checking.
    #[serde(default)]
    pub search: SearchSettings,

    /// Facilitation behaviour.
    #[serde(default)]
    pub facilitator: FacilitatorConfig,
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

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "agora_facilitator=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Model backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Base URL of the Ollama-compatible API.
    #[serde(default = "default_model_url")]
    pub url: String,

    /// Model used when a call does not name one.
    #[serde(default = "default_model_name")]
    pub default_model: String,

    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,

    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,
}

/// Search backend configuration.
#[derive(Clone, Deserialize)]
pub struct SearchSettings {
    /// Brave Search API key. Brave is skipped when unset.
    #[serde(default)]
    pub brave_api_key: Option<String>,

    #[serde(default = "default_brave_endpoint")]
    pub brave_endpoint: String,

    #[serde(default = "default_duckduckgo_endpoint")]
    pub duckduckgo_endpoint: String,

    /// Per-request timeout for search calls.
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
}

/// Facilitation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FacilitatorConfig {
    /// Whether posted messages and reactions are passed to the facilitator.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Capacity of the notification channel feeding SSE subscribers.
    #[serde(default = "default_notification_buffer")]
    pub notification_buffer: usize,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "agora.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_model_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model_name() -> String {
    "llama3.1".to_string()
}

fn default_generation_timeout_secs() -> u64 {
    agora_gateway::DEFAULT_GENERATION_TIMEOUT.as_secs()
}

fn default_health_timeout_secs() -> u64 {
    agora_gateway::DEFAULT_HEALTH_TIMEOUT.as_secs()
}

fn default_brave_endpoint() -> String {
    agora_evidence::BRAVE_ENDPOINT.to_string()
}

fn default_duckduckgo_endpoint() -> String {
    agora_evidence::DUCKDUCKGO_ENDPOINT.to_string()
}

fn default_search_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_notification_buffer() -> usize {
    256
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
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

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            url: default_model_url(),
            default_model: default_model_name(),
            generation_timeout_secs: default_generation_timeout_secs(),
            health_timeout_secs: default_health_timeout_secs(),
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            brave_api_key: None,
            brave_endpoint: default_brave_endpoint(),
            duckduckgo_endpoint: default_duckduckgo_endpoint(),
            timeout_secs: default_search_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for SearchSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchSettings")
            .field(
                "brave_api_key",
                &self.brave_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("brave_endpoint", &self.brave_endpoint)
            .field("duckduckgo_endpoint", &self.duckduckgo_endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for FacilitatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            notification_buffer: default_notification_buffer(),
        }
    }
}

impl ModelConfig {
    pub fn gateway_config(&self) -> agora_gateway::GatewayConfig {
        agora_gateway::GatewayConfig {
            default_model: self.default_model.clone(),
            generation_timeout: Duration::from_secs(self.generation_timeout_secs),
            health_timeout: Duration::from_secs(self.health_timeout_secs),
        }
    }
}

impl SearchSettings {
    pub fn search_config(&self) -> agora_evidence::SearchConfig {
        agora_evidence::SearchConfig {
            brave_api_key: self
                .brave_api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            brave_endpoint: self.brave_endpoint.clone(),
            duckduckgo_endpoint: self.duckduckgo_endpoint.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
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
/// - `AGORA_HOST` overrides `server.host`
/// - `AGORA_PORT` overrides `server.port`
/// - `AGORA_DB_PATH` overrides `database.path`
/// - `AGORA_LOG_LEVEL` overrides `logging.level`
/// - `AGORA_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `AGORA_MODEL_URL` overrides `model.url`
/// - `AGORA_MODEL` overrides `model.default_model`
/// - `AGORA_BRAVE_API_KEY` overrides `search.brave_api_key`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
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

/// Default config file, used when neither a CLI argument nor
/// `AGORA_CONFIG_PATH` names one.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Picks the config file: the first CLI argument, then `AGORA_CONFIG_PATH`,
/// then [`DEFAULT_CONFIG_PATH`]. Blank values are skipped.
pub fn config_path(cli_arg: Option<String>, env_var: Option<String>) -> String {
    [cli_arg, env_var]
        .into_iter()
        .flatten()
        .find(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(host) = var("AGORA_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = var("AGORA_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(db_path) = var("AGORA_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = var("AGORA_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("AGORA_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(url) = var("AGORA_MODEL_URL") {
        config.model.url = url;
    }
    if let Some(model) = var("AGORA_MODEL") {
        config.model.default_model = model;
    }
    if let Some(key) = var("AGORA_BRAVE_API_KEY") {
        config.search.brave_api_key = Some(key);
    }
}
