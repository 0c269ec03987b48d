//! Error types for autodiag-api
//!
//! Every failure leaves the service as `{ "success": false, "message": ... }`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::ValidationError;
use crate::services::DiagnosisError;
use crate::types::ProviderError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Diagnosis pipeline failure (400 for validation, 502/504 for provider)
    #[error(transparent)]
    Diagnosis(#[from] DiagnosisError),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Diagnosis(DiagnosisError::Validation(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Diagnosis(DiagnosisError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Diagnosis(DiagnosisError::Provider(e)) if e.is_timeout() => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ApiError::Diagnosis(DiagnosisError::Provider(_)) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Whether the error came from the AI provider (tracked by /health)
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, ApiError::Diagnosis(DiagnosisError::Provider(_)))
    }

    fn client_message(&self) -> String {
        match self {
            ApiError::Diagnosis(DiagnosisError::Provider(ProviderError::Timeout(_))) => {
                "Diagnosis service timed out, please try again".to_string()
            }
            ApiError::Diagnosis(DiagnosisError::Provider(e)) => {
                format!("Failed to get a diagnosis: {}", e)
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "success": false,
            "message": self.client_message(),
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
