//! YouTube repair video search
//!
//! Uses the Data API v3 `search` endpoint. Requests pass through a token
//! bucket so parallel part lookups stay within the configured rate.
//!
//! API Documentation: https://developers.google.com/youtube/v3/docs/search/list

use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;

use autodiag_common::config::{get_user_agent, VideoSearchConfig};

use crate::types::{VideoHit, VideoSearchError, VideoSearchProvider};

/// Results requested per lookup; only the first is used
const MAX_RESULTS: u32 = 3;

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ItemId,
    #[serde(default)]
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
}

/// YouTube Data API search client
pub struct YouTubeClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl YouTubeClient {
    /// Create client
    ///
    /// `requests_per_second` of 0 is treated as 1.
    pub fn new(
        api_key: String,
        base_url: String,
        timeout: Duration,
        requests_per_second: u32,
    ) -> Result<Self, VideoSearchError> {
        let client = Client::builder()
            .user_agent(get_user_agent())
            .timeout(timeout)
            .build()
            .map_err(|e| VideoSearchError::Network(format!("Failed to build HTTP client: {}", e)))?;

        let rate_limiter =
            RateLimiter::direct(Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN)));

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
            rate_limiter,
        })
    }

    /// Create client from the `[video]` config section and a resolved key
    pub fn from_config(api_key: String, config: &VideoSearchConfig) -> Result<Self, VideoSearchError> {
        Self::new(
            api_key,
            config.base_url.clone(),
            Duration::from_millis(config.lookup_timeout_ms.max(1)),
            config.requests_per_second,
        )
    }
}

#[async_trait::async_trait]
impl VideoSearchProvider for YouTubeClient {
    fn name(&self) -> &'static str {
        "youtube"
    }

    async fn search(&self, query: &str) -> Result<Vec<VideoHit>, VideoSearchError> {
        self.rate_limiter.until_ready().await;

        tracing::debug!(query = %query, "Querying YouTube search API");

        let max_results = MAX_RESULTS.to_string();
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", max_results.as_str()),
                ("q", query),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VideoSearchError::Timeout(self.timeout)
                } else {
                    VideoSearchError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 403 {
            return Err(VideoSearchError::QuotaExceeded);
        } else if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(VideoSearchError::Api(status.as_u16(), text));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| VideoSearchError::Parse(format!("Failed to parse YouTube response: {}", e)))?;

        let hits: Vec<VideoHit> = parsed
            .items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id.filter(|id| !id.trim().is_empty())?;
                Some(VideoHit {
                    url: format!("{}{}", WATCH_URL, video_id),
                    title: item.snippet.map(|s| s.title).unwrap_or_default(),
                })
            })
            .collect();

        tracing::debug!(query = %query, results = hits.len(), "YouTube search complete");
        Ok(hits)
    }
}
