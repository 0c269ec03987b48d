//! Repair video resolver
//!
//! Looks up one repair video per required part. Lookups are independent:
//! they run concurrently (bounded), each under its own timeout, and any
//! failure degrades only that part to "no video". Output always has the
//! same length and order as the input.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::{RequiredPart, RequiredPartWithVideo, VehicleDetails};
use crate::types::{VideoHit, VideoSearchProvider};

/// Resolves required parts to repair videos
pub struct VideoResolver {
    /// `None` when no video provider is configured
    provider: Option<Arc<dyn VideoSearchProvider>>,
    lookup_timeout: Duration,
    max_concurrent_lookups: usize,
}

impl VideoResolver {
    pub fn new(
        provider: Arc<dyn VideoSearchProvider>,
        lookup_timeout: Duration,
        max_concurrent_lookups: usize,
    ) -> Self {
        Self {
            provider: Some(provider),
            lookup_timeout,
            max_concurrent_lookups: max_concurrent_lookups.max(1),
        }
    }

    /// Resolver that never finds videos (video search not configured)
    pub fn disabled() -> Self {
        Self {
            provider: None,
            lookup_timeout: Duration::ZERO,
            max_concurrent_lookups: 1,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Resolve one video per part, preserving input order
    pub async fn resolve(
        &self,
        vehicle: &VehicleDetails,
        parts: Vec<RequiredPart>,
    ) -> Vec<RequiredPartWithVideo> {
        let provider = match &self.provider {
            Some(provider) if !parts.is_empty() => Arc::clone(provider),
            Some(_) => return Vec::new(),
            None => {
                if !parts.is_empty() {
                    warn!(
                        parts = parts.len(),
                        "Video search not configured, returning parts without videos"
                    );
                }
                return parts
                    .into_iter()
                    .map(RequiredPartWithVideo::without_video)
                    .collect();
            }
        };

        // Owned per-part inputs so the lookup futures borrow nothing from `parts`
        let queries: Vec<(usize, String, String)> = parts
            .iter()
            .enumerate()
            .map(|(idx, part)| (idx, build_search_query(vehicle, &part.name), part.name.clone()))
            .collect();
        let timeout = self.lookup_timeout;

        let lookups = queries.into_iter().map(move |(idx, query, part_name)| {
            let provider = Arc::clone(&provider);

            async move {
                let hit = match tokio::time::timeout(timeout, provider.search(&query)).await {
                    Ok(Ok(hits)) => {
                        let hit = hits.into_iter().find(|h| !h.url.trim().is_empty());
                        if hit.is_none() {
                            debug!(part = %part_name, query = %query, "No video found");
                        }
                        hit
                    }
                    Ok(Err(e)) => {
                        warn!(
                            provider = provider.name(),
                            part = %part_name,
                            error = %e,
                            "Video lookup failed (part degraded to no video)"
                        );
                        None
                    }
                    Err(_) => {
                        warn!(
                            provider = provider.name(),
                            part = %part_name,
                            timeout_ms = timeout.as_millis() as u64,
                            "Video lookup timed out (part degraded to no video)"
                        );
                        None
                    }
                };
                (idx, hit)
            }
        });

        // Completion order is arbitrary; slots are filled by original index
        let mut hits: Vec<Option<VideoHit>> = vec![None; parts.len()];
        {
            let mut completed =
                stream::iter(lookups).buffer_unordered(self.max_concurrent_lookups);
            while let Some((idx, hit)) = completed.next().await {
                hits[idx] = hit;
            }
        }

        let matched = hits.iter().filter(|h| h.is_some()).count();
        info!(parts = parts.len(), matched, "Video resolution complete");

        parts
            .into_iter()
            .zip(hits)
            .map(|(part, hit)| match hit {
                Some(hit) => RequiredPartWithVideo::with_video(part, hit),
                None => RequiredPartWithVideo::without_video(part),
            })
            .collect()
    }
}

/// Search query for a part: "{make} {model} {part} replacement"
///
/// Markdown punctuation is dropped and whitespace collapsed.
pub fn build_search_query(vehicle: &VehicleDetails, part_name: &str) -> String {
    let mut query = format!("{} {} {}", vehicle.car_type(), vehicle.car_model(), part_name);
    if !part_name.to_lowercase().contains("replace") {
        query.push_str(" replacement");
    }

    query
        .chars()
        .filter(|c| !matches!(c, '*' | '_' | '#' | '`' | '"'))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VehicleDetailsInput;
    use crate::types::VideoSearchError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn vehicle() -> VehicleDetails {
        serde_json::from_value::<VehicleDetailsInput>(serde_json::json!({
            "carType": "Toyota",
            "carModel": "Camry 2020",
            "mileage": 50000,
            "problemDescription": "engine knocking noise"
        }))
        .unwrap()
        .validate()
        .unwrap()
    }

    fn parts(names: &[&str]) -> Vec<RequiredPart> {
        names.iter().map(|n| RequiredPart::new(*n)).collect()
    }

    /// Answers by part keyword; "fail" errors, "slow" sleeps, "empty" finds nothing.
    /// Earlier parts sleep longer so completion order is reversed.
    struct ScriptedProvider {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl VideoSearchProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn search(&self, query: &str) -> Result<Vec<VideoHit>, VideoSearchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let delay = if query.contains("slow") {
                500
            } else if query.contains("first") {
                60
            } else {
                5
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if query.contains("fail") {
                return Err(VideoSearchError::Api(500, "backend error".to_string()));
            }
            if query.contains("empty") {
                return Ok(Vec::new());
            }
            Ok(vec![
                VideoHit {
                    url: format!("https://videos.example/{}", query.len()),
                    title: query.to_string(),
                },
                VideoHit {
                    url: "https://videos.example/second".to_string(),
                    title: "second best".to_string(),
                },
            ])
        }
    }

    fn resolver(provider: Arc<ScriptedProvider>) -> VideoResolver {
        VideoResolver::new(provider, Duration::from_millis(200), 4)
    }

    #[tokio::test]
    async fn test_order_preserved_despite_completion_order() {
        let resolver = resolver(Arc::new(ScriptedProvider::new()));
        let resolved = resolver
            .resolve(&vehicle(), parts(&["first bearing", "oil filter", "drain plug"]))
            .await;

        let names: Vec<&str> = resolved.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["first bearing", "oil filter", "drain plug"]);
        assert_eq!(
            resolved[0].video_title.as_deref(),
            Some("Toyota Camry 2020 first bearing replacement")
        );
        assert!(resolved.iter().all(|p| p.has_video()));
    }

    #[tokio::test]
    async fn test_partial_failures_degrade_per_part() {
        let resolver = resolver(Arc::new(ScriptedProvider::new()));
        let resolved = resolver
            .resolve(
                &vehicle(),
                parts(&["fail part", "spark plug", "slow part", "empty part"]),
            )
            .await;

        assert_eq!(resolved.len(), 4);
        assert!(!resolved[0].has_video());
        assert!(resolved[1].has_video());
        assert!(!resolved[2].has_video(), "timed-out lookup must not yield a video");
        assert!(!resolved[3].has_video());
        assert_eq!(resolved[2].name, "slow part");
    }

    #[tokio::test]
    async fn test_concurrency_bounded() {
        let provider = Arc::new(ScriptedProvider::new());
        let resolver = VideoResolver::new(provider.clone(), Duration::from_secs(1), 2);
        let names: Vec<String> = (0..6).map(|i| format!("part {}", i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();

        let resolved = resolver.resolve(&vehicle(), parts(&names)).await;
        assert_eq!(resolved.len(), 6);
        assert!(provider.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_resolve_runs_on_spawned_task() {
        let resolver = Arc::new(resolver(Arc::new(ScriptedProvider::new())));
        let vehicle = vehicle();

        let task = tokio::spawn({
            let resolver = Arc::clone(&resolver);
            async move {
                resolver
                    .resolve(&vehicle, parts(&["first bearing", "fail part", "oil filter"]))
                    .await
            }
        });
        let resolved = task.await.unwrap();

        let names: Vec<&str> = resolved.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["first bearing", "fail part", "oil filter"]);
        assert!(resolved[0].has_video());
        assert!(!resolved[1].has_video());
        assert!(resolved[2].has_video());
    }

    #[tokio::test]
    async fn test_disabled_resolver_returns_parts_without_videos() {
        let resolver = VideoResolver::disabled();
        assert!(!resolver.is_enabled());

        let input = vec![RequiredPart::new("Alternator").with_rationale("low voltage")];
        let resolved = resolver.resolve(&vehicle(), input).await;
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].rationale.as_deref(), Some("low voltage"));
        assert!(!resolved[0].has_video());
    }

    #[tokio::test]
    async fn test_empty_parts_list() {
        let resolver = resolver(Arc::new(ScriptedProvider::new()));
        assert!(resolver.resolve(&vehicle(), Vec::new()).await.is_empty());
    }

    #[test]
    fn test_search_query_normalized() {
        assert_eq!(
            build_search_query(&vehicle(), "  **Spark   plugs** "),
            "Toyota Camry 2020 Spark plugs replacement"
        );
        assert_eq!(
            build_search_query(&vehicle(), "Timing belt replacement kit"),
            "Toyota Camry 2020 Timing belt replacement kit"
        );
    }
}
