//! Gemini client tests against a mock HTTP server

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use autodiag_api::services::GeminiClient;
use autodiag_api::types::{DiagnosisProvider, DiagnosisStage, ProviderError, ProviderRequest};

const GENERATE_PATH: &str = "/v1beta/models/gemini-test:generateContent";

fn client(server: &MockServer, timeout: Duration) -> GeminiClient {
    GeminiClient::new(
        "test-key".to_string(),
        "gemini-test".to_string(),
        format!("{}/v1beta", server.uri()),
        timeout,
        0.4,
    )
    .unwrap()
}

fn request() -> ProviderRequest {
    ProviderRequest {
        stage: DiagnosisStage::Initial,
        system_instruction: "You are a mechanic".to_string(),
        prompt: "Vehicle: Toyota Camry 2020\nengine knocking noise".to_string(),
    }
}

#[tokio::test]
async fn test_generate_returns_candidate_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "systemInstruction": { "parts": [{ "text": "You are a mechanic" }] },
            "contents": [{ "role": "user" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "text": "DIAGNOSIS:\n" }, { "text": "Rod knock" }]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = client(&server, Duration::from_secs(5))
        .generate(&request())
        .await
        .unwrap();
    assert_eq!(text, "DIAGNOSIS:\nRod knock");
}

#[tokio::test]
async fn test_error_status_maps_to_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT" }
        })))
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_secs(5))
        .generate(&request())
        .await
        .unwrap_err();
    match err {
        ProviderError::Api(status, message) => {
            assert_eq!(status, 400);
            assert_eq!(message, "API key not valid");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_secs(5))
        .generate(&request())
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_missing_candidates_is_empty_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_secs(5))
        .generate(&request())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::EmptyResponse));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(2))
                .set_body_json(json!({ "candidates": [] })),
        )
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_millis(200))
        .generate(&request())
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {:?}", err);
}
