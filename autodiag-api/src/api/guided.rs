//! Guided diagnosis API handlers
//!
//! POST /api/analyze-guided, POST /api/analyze-followup and the deprecated
//! POST /api/followup-analysis redirect.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    models::{FollowUpAnswer, FollowUpQuestion, QuestionInput, RequiredPartWithVideo, VehicleDetailsInput},
    services::FollowUpContext,
    AppState,
};

/// Current follow-up endpoint
pub const FOLLOW_UP_PATH: &str = "/api/analyze-followup";

/// Superseded follow-up endpoint, answered with a redirect
pub const DEPRECATED_FOLLOW_UP_PATH: &str = "/api/followup-analysis";

/// POST /api/analyze-followup request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpRequest {
    /// Summary returned by the intake call
    #[serde(default)]
    pub initial_analysis: Option<String>,
    #[serde(default)]
    pub follow_up_questions: Vec<QuestionInput>,
    /// Bare strings (positional) or `{ questionId, answer }` objects
    #[serde(default)]
    pub follow_up_answers: Vec<FollowUpAnswer>,
    #[serde(default)]
    pub car_details: Option<VehicleDetailsInput>,
}

/// POST /api/analyze-guided response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidedResponse {
    pub success: bool,
    /// Initial diagnosis summary
    pub result: String,
    pub follow_up_questions: Vec<FollowUpQuestion>,
}

/// POST /api/analyze-followup response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpResponse {
    pub success: bool,
    /// Final diagnosis summary
    pub result: String,
    pub required_parts_with_videos: Vec<RequiredPartWithVideo>,
}

/// Body of the deprecated endpoint's redirect
#[derive(Debug, Serialize)]
pub struct RedirectResponse {
    pub success: bool,
    pub message: String,
    pub redirect: String,
}

/// Remember provider failures for /health
async fn record_failure(state: &AppState, err: &ApiError) {
    if err.is_provider_failure() {
        *state.last_error.write().await = Some(err.to_string());
    }
}

/// POST /api/analyze-guided
///
/// Validate vehicle details, then return the initial diagnosis and up to five
/// follow-up questions.
pub async fn analyze_guided(
    State(state): State<AppState>,
    payload: Result<Json<VehicleDetailsInput>, JsonRejection>,
) -> ApiResult<Json<GuidedResponse>> {
    let Json(input) = payload?;
    let vehicle = input.validate()?;

    match state.orchestrator.start_guided(vehicle).await {
        Ok(outcome) => Ok(Json(GuidedResponse {
            success: true,
            result: outcome.result.summary,
            follow_up_questions: outcome.result.follow_up_questions,
        })),
        Err(e) => {
            let err = ApiError::from(e);
            record_failure(&state, &err).await;
            Err(err)
        }
    }
}

/// POST /api/analyze-followup
///
/// Produce the final diagnosis from the original details plus the answers,
/// with a repair video per required part where one was found.
pub async fn analyze_followup(
    State(state): State<AppState>,
    payload: Result<Json<FollowUpRequest>, JsonRejection>,
) -> ApiResult<Json<FollowUpResponse>> {
    let Json(request) = payload?;
    let context = FollowUpContext::from_input(
        request.car_details,
        request.initial_analysis,
        request.follow_up_questions,
        request.follow_up_answers,
    )?;

    match state.orchestrator.complete_guided(context).await {
        Ok(outcome) => Ok(Json(FollowUpResponse {
            success: true,
            result: outcome.result.summary,
            required_parts_with_videos: outcome.parts_with_videos,
        })),
        Err(e) => {
            let err = ApiError::from(e);
            record_failure(&state, &err).await;
            Err(err)
        }
    }
}

/// POST /api/followup-analysis (deprecated)
///
/// Body is accepted but ignored. Never reaches a provider.
pub async fn deprecated_followup() -> impl IntoResponse {
    tracing::warn!(
        path = DEPRECATED_FOLLOW_UP_PATH,
        redirect = FOLLOW_UP_PATH,
        "Deprecated endpoint called"
    );

    (
        StatusCode::TEMPORARY_REDIRECT,
        [(header::LOCATION, FOLLOW_UP_PATH)],
        Json(RedirectResponse {
            success: false,
            message: format!(
                "This endpoint is deprecated, use POST {} instead",
                FOLLOW_UP_PATH
            ),
            redirect: FOLLOW_UP_PATH.to_string(),
        }),
    )
}

/// Build guided diagnosis routes
pub fn guided_routes() -> Router<AppState> {
    Router::new()
        .route("/api/analyze-guided", post(analyze_guided))
        .route(FOLLOW_UP_PATH, post(analyze_followup))
        .route(DEPRECATED_FOLLOW_UP_PATH, post(deprecated_followup))
}
