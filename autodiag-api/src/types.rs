//! Core Types and Trait Definitions for autodiag-api
//!
//! The two external collaborators sit behind narrow traits:
//! - **DiagnosisProvider:** prompt → raw diagnosis text (Gemini)
//! - **VideoSearchProvider:** query → ranked repair videos (YouTube)
//!
//! Everything between them (prompt building, parsing, enrichment) is pure
//! and lives in `services`.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Diagnosis Provider
// ============================================================================

/// Which half of the guided flow a request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisStage {
    /// Intake: initial diagnosis plus follow-up questions
    Initial,
    /// Final diagnosis from the user's answers, no questions
    FollowUp,
}

/// Provider-agnostic diagnosis request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderRequest {
    pub stage: DiagnosisStage,
    /// Role and output-format instructions
    pub system_instruction: String,
    /// Session-specific content
    pub prompt: String,
}

/// AI diagnosis provider
///
/// # Example
/// ```rust,ignore
/// struct CannedProvider;
///
/// #[async_trait::async_trait]
/// impl DiagnosisProvider for CannedProvider {
///     fn name(&self) -> &'static str { "canned" }
///
///     async fn generate(&self, _request: &ProviderRequest) -> Result<String, ProviderError> {
///         Ok("DIAGNOSIS:\nWorn spark plugs".to_string())
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait DiagnosisProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    /// Generate raw diagnosis text for a request
    ///
    /// # Errors
    /// Returns `ProviderError` on network failure, timeout, non-2xx status or
    /// an empty/unreadable response body.
    async fn generate(&self, request: &ProviderRequest) -> Result<String, ProviderError>;
}

/// Diagnosis provider errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Provider returned no diagnosis text")]
    EmptyResponse,

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ProviderError {
    /// Errors worth a single retry: timeouts, network failures, 429 and 5xx
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Network(_) | ProviderError::Timeout(_) => true,
            ProviderError::Api(status, _) => *status == 429 || *status >= 500,
            ProviderError::EmptyResponse | ProviderError::Parse(_) => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout(_))
    }
}

// ============================================================================
// Video Search Provider
// ============================================================================

/// One video search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoHit {
    pub url: String,
    pub title: String,
}

/// Repair video search provider
#[async_trait::async_trait]
pub trait VideoSearchProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    /// Search for videos, best match first (possibly empty)
    async fn search(&self, query: &str) -> Result<Vec<VideoHit>, VideoSearchError>;
}

/// Video search errors (never surfaced to clients)
#[derive(Debug, Error)]
pub enum VideoSearchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Quota exceeded or API key rejected")]
    QuotaExceeded,

    #[error("Parse error: {0}")]
    Parse(String),
}
