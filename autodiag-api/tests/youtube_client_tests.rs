//! YouTube client tests against a mock HTTP server

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use autodiag_api::services::YouTubeClient;
use autodiag_api::types::{VideoSearchError, VideoSearchProvider};

fn client(server: &MockServer) -> YouTubeClient {
    YouTubeClient::new(
        "yt-key".to_string(),
        format!("{}/youtube/v3", server.uri()),
        Duration::from_secs(5),
        50,
    )
    .unwrap()
}

#[tokio::test]
async fn test_search_maps_items_to_watch_urls() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/youtube/v3/search"))
        .and(query_param("part", "snippet"))
        .and(query_param("type", "video"))
        .and(query_param("q", "Toyota Camry 2020 Oil pump replacement"))
        .and(query_param("key", "yt-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "id": { "kind": "youtube#video", "videoId": "abc123" },
                    "snippet": { "title": "Camry oil pump replacement" }
                },
                {
                    "id": { "kind": "youtube#channel", "channelId": "chan" },
                    "snippet": { "title": "Some channel" }
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let hits = client(&server)
        .search("Toyota Camry 2020 Oil pump replacement")
        .await
        .unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].url, "https://www.youtube.com/watch?v=abc123");
    assert_eq!(hits[0].title, "Camry oil pump replacement");
}

#[tokio::test]
async fn test_no_items_is_empty_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/youtube/v3/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;

    assert!(client(&server).search("obscure part").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_forbidden_is_quota_exceeded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/youtube/v3/search"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "quotaExceeded" }
        })))
        .mount(&server)
        .await;

    let err = client(&server).search("spark plugs").await.unwrap_err();
    assert!(matches!(err, VideoSearchError::QuotaExceeded));
}

#[tokio::test]
async fn test_server_error_maps_to_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/youtube/v3/search"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .mount(&server)
        .await;

    let err = client(&server).search("spark plugs").await.unwrap_err();
    assert!(matches!(err, VideoSearchError::Api(500, _)));
}
