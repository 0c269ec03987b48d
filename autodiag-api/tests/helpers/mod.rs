//! Test Helper Utilities
//!
//! Shared utilities for testing autodiag-api

#![allow(dead_code)]

pub mod mock_providers;

pub use mock_providers::{MockDiagnosis, MockVideos, VideoBehavior};

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use autodiag_api::services::{OrchestratorSettings, SessionOrchestrator, VideoResolver};
use autodiag_api::{build_router, AppState};

/// Video lookup timeout used by test apps
pub const TEST_LOOKUP_TIMEOUT: Duration = Duration::from_millis(100);

/// Build app state around mock providers
///
/// `videos = None` runs with video enrichment disabled.
pub fn test_state(diagnosis: Arc<MockDiagnosis>, videos: Option<Arc<MockVideos>>) -> AppState {
    let resolver = match videos {
        Some(videos) => VideoResolver::new(videos, TEST_LOOKUP_TIMEOUT, 4),
        None => VideoResolver::disabled(),
    };
    let settings = OrchestratorSettings {
        ai_timeout: Duration::from_secs(2),
        retry_backoff: Duration::ZERO,
        ..OrchestratorSettings::default()
    };

    AppState::new(SessionOrchestrator::new(diagnosis, resolver, settings))
}

/// Build router around mock providers
pub fn test_app(diagnosis: Arc<MockDiagnosis>, videos: Option<Arc<MockVideos>>) -> Router {
    build_router(test_state(diagnosis, videos))
}

/// Send a request and collect status, headers and JSON body
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

/// POST a JSON body
pub async fn post_json(app: Router, uri: &str, body: &Value) -> (StatusCode, HeaderMap, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// GET a path
pub async fn get(app: Router, uri: &str) -> (StatusCode, HeaderMap, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}
