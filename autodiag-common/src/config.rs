//! Bootstrap configuration loading
//!
//! Configuration file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Platform config directory (`~/.config/autodiag/config.toml` on Linux)
//! 4. Built-in defaults (no file)
//!
//! A missing config file is not an error: the service starts on defaults and
//! logs a warning.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "AUTODIAG_CONFIG";

/// Default HTTP port for autodiag-api
pub const DEFAULT_PORT: u16 = 5050;

/// Upper bound for follow-up questions per intake
pub const MAX_FOLLOW_UP_QUESTIONS: usize = 5;

/// User-Agent sent by every outbound HTTP client
pub fn get_user_agent() -> String {
    format!(
        "AutoDiag/{} (guided vehicle diagnosis)",
        env!("CARGO_PKG_VERSION")
    )
}

/// Bootstrap configuration loaded from TOML file
///
/// Cannot change while running; restart to pick up edits.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// AI diagnosis provider settings
    #[serde(default)]
    pub diagnosis: DiagnosisProviderConfig,

    /// Repair video search settings
    #[serde(default)]
    pub video: VideoSearchConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            logging: LoggingConfig::default(),
            diagnosis: DiagnosisProviderConfig::default(),
            video: VideoSearchConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// AI diagnosis provider (Gemini) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosisProviderConfig {
    /// API key (overridden by `AUTODIAG_GEMINI_API_KEY`)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_diagnosis_base_url")]
    pub base_url: String,

    /// Upper bound for one generate call, in seconds
    #[serde(default = "default_diagnosis_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry once on timeouts, network errors, HTTP 429 and 5xx
    #[serde(default = "default_true")]
    pub retry_transient: bool,

    /// Follow-up questions requested on intake (clamped to 1..=5)
    #[serde(default = "default_max_questions")]
    pub max_follow_up_questions: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for DiagnosisProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_diagnosis_base_url(),
            timeout_secs: default_diagnosis_timeout_secs(),
            retry_transient: true,
            max_follow_up_questions: default_max_questions(),
            temperature: default_temperature(),
        }
    }
}

impl DiagnosisProviderConfig {
    /// Question cap actually applied, always within 1..=5
    pub fn effective_max_questions(&self) -> usize {
        self.max_follow_up_questions.clamp(1, MAX_FOLLOW_UP_QUESTIONS)
    }
}

/// Video search provider (YouTube Data API) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct VideoSearchConfig {
    /// API key (overridden by `AUTODIAG_YOUTUBE_API_KEY`); absent disables enrichment
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_video_base_url")]
    pub base_url: String,

    /// Upper bound for a single part lookup, in milliseconds
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,

    /// Lookups in flight at once for one diagnosis
    #[serde(default = "default_max_concurrent_lookups")]
    pub max_concurrent_lookups: usize,

    /// Outbound search requests per second across all sessions
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

impl Default for VideoSearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_video_base_url(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
            max_concurrent_lookups: default_max_concurrent_lookups(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_diagnosis_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_diagnosis_timeout_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_max_questions() -> usize {
    MAX_FOLLOW_UP_QUESTIONS
}

fn default_temperature() -> f32 {
    0.4
}

fn default_video_base_url() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

fn default_lookup_timeout_ms() -> u64 {
    8_000
}

fn default_max_concurrent_lookups() -> usize {
    4
}

fn default_requests_per_second() -> u32 {
    5
}

/// Config file path resolution
pub struct ConfigPathResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigPathResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Resolve the config file path, or `None` when no file applies
    ///
    /// CLI and environment paths are returned even if the file is missing so
    /// that the loader can report them.
    pub fn resolve(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        default_config_path().filter(|p| p.exists())
    }
}

/// Platform default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("autodiag").join("config.toml"))
}

/// Parse TOML configuration text
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Load TOML configuration from a file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_toml_config(&content)?;
    info!("Configuration loaded from {}", path.display());
    Ok(config)
}

/// Load configuration from the resolved path, falling back to defaults
///
/// A missing file degrades to defaults with a warning; a file that exists but
/// does not parse is an error.
pub fn load_or_default(resolver: &ConfigPathResolver) -> Result<TomlConfig> {
    match resolver.resolve() {
        Some(path) if path.exists() => load_toml_config(&path),
        Some(path) => {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            info!("No config file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = parse_toml_config("").unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.logging.level, "info");
        assert!(config.diagnosis.api_key.is_none());
        assert!(config.diagnosis.retry_transient);
        assert_eq!(config.video.max_concurrent_lookups, 4);
    }

    #[test]
    fn test_partial_sections() {
        let config = parse_toml_config(
            r#"
            port = 8080

            [diagnosis]
            model = "gemini-1.5-pro"
            max_follow_up_questions = 3

            [video]
            lookup_timeout_ms = 2500
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.diagnosis.model, "gemini-1.5-pro");
        assert_eq!(config.diagnosis.effective_max_questions(), 3);
        assert_eq!(config.diagnosis.timeout_secs, 60);
        assert_eq!(config.video.lookup_timeout_ms, 2500);
        assert_eq!(config.video.requests_per_second, 5);
    }

    #[test]
    fn test_question_cap_is_clamped() {
        let mut diagnosis = DiagnosisProviderConfig::default();
        diagnosis.max_follow_up_questions = 12;
        assert_eq!(diagnosis.effective_max_questions(), 5);
        diagnosis.max_follow_up_questions = 0;
        assert_eq!(diagnosis.effective_max_questions(), 1);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = parse_toml_config("port = \"not a number\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_user_agent_contains_version() {
        let ua = get_user_agent();
        assert!(ua.starts_with("AutoDiag/"));
        assert!(ua.contains(env!("CARGO_PKG_VERSION")));
    }
}
