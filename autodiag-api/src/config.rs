//! Configuration resolution for autodiag-api
//!
//! API keys resolve with ENV → TOML priority. The diagnosis key is
//! mandatory; without a video key the service runs with enrichment off.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use autodiag_common::config::TomlConfig;
use autodiag_common::{Error, Result};

use crate::services::{GeminiClient, OrchestratorSettings, SessionOrchestrator, VideoResolver, YouTubeClient};

/// Environment variable for the diagnosis provider key
pub const GEMINI_API_KEY_ENV: &str = "AUTODIAG_GEMINI_API_KEY";

/// Environment variable for the video search key
pub const YOUTUBE_API_KEY_ENV: &str = "AUTODIAG_YOUTUBE_API_KEY";

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve a key from environment then TOML
///
/// Returns `None` when neither source holds a usable key.
fn resolve_key(label: &str, env_var: &str, toml_key: Option<&String>) -> Option<String> {
    let env_key = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_key.filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "{} API key found in both environment and TOML. Using environment (highest priority).",
            label
        );
    }

    if let Some(key) = env_key {
        info!("{} API key loaded from environment variable", label);
        return Some(key.trim().to_string());
    }

    if let Some(key) = toml_key {
        info!("{} API key loaded from TOML config", label);
        return Some(key.trim().to_string());
    }

    None
}

/// Resolve the diagnosis provider key
///
/// # Errors
/// `Error::Config` when no source holds a key.
pub fn resolve_gemini_api_key(config: &TomlConfig) -> Result<String> {
    resolve_key("Gemini", GEMINI_API_KEY_ENV, config.diagnosis.api_key.as_ref()).ok_or_else(|| {
        Error::Config(format!(
            "Gemini API key not configured. Please configure using one of:\n\
             1. Environment: {}=your-key-here\n\
             2. TOML config: [diagnosis] api_key = \"your-key\"",
            GEMINI_API_KEY_ENV
        ))
    })
}

/// Resolve the video search key, `None` disables enrichment
pub fn resolve_youtube_api_key(config: &TomlConfig) -> Option<String> {
    resolve_key("YouTube", YOUTUBE_API_KEY_ENV, config.video.api_key.as_ref())
}

/// Orchestrator settings from the `[diagnosis]` section
pub fn orchestrator_settings(config: &TomlConfig) -> OrchestratorSettings {
    OrchestratorSettings {
        ai_timeout: Duration::from_secs(config.diagnosis.timeout_secs.max(1)),
        retry_transient: config.diagnosis.retry_transient,
        max_follow_up_questions: config.diagnosis.effective_max_questions(),
        ..OrchestratorSettings::default()
    }
}

/// Build the session orchestrator with real provider clients
///
/// # Errors
/// `Error::Config` when the diagnosis key is missing or a client cannot be built.
pub fn build_orchestrator(config: &TomlConfig) -> Result<SessionOrchestrator> {
    let gemini_key = resolve_gemini_api_key(config)?;
    let gemini = GeminiClient::from_config(gemini_key, &config.diagnosis)
        .map_err(|e| Error::Config(format!("Gemini client setup failed: {}", e)))?;

    let resolver = match resolve_youtube_api_key(config) {
        Some(key) => {
            let youtube = YouTubeClient::from_config(key, &config.video)
                .map_err(|e| Error::Config(format!("YouTube client setup failed: {}", e)))?;
            VideoResolver::new(
                Arc::new(youtube),
                Duration::from_millis(config.video.lookup_timeout_ms.max(1)),
                config.video.max_concurrent_lookups,
            )
        }
        None => {
            warn!(
                "YouTube API key not configured ({} or [video] api_key); repair videos disabled",
                YOUTUBE_API_KEY_ENV
            );
            VideoResolver::disabled()
        }
    };

    info!(
        model = %config.diagnosis.model,
        video_enabled = resolver.is_enabled(),
        "Diagnosis pipeline configured"
    );

    Ok(SessionOrchestrator::new(
        Arc::new(gemini),
        resolver,
        orchestrator_settings(config),
    ))
}
