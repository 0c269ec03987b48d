//! In-process provider doubles

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use autodiag_api::types::{
    DiagnosisProvider, ProviderError, ProviderRequest, VideoHit, VideoSearchError,
    VideoSearchProvider,
};

/// Diagnosis provider replaying canned text
pub struct MockDiagnosis {
    replies: Mutex<VecDeque<String>>,
    unreachable: bool,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl MockDiagnosis {
    /// Reply with each text in turn
    pub fn replying(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            unreachable: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Fail every call with a connection error
    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            unreachable: true,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DiagnosisProvider for MockDiagnosis {
    fn name(&self) -> &'static str {
        "mock-diagnosis"
    }

    async fn generate(&self, request: &ProviderRequest) -> Result<String, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.unreachable {
            return Err(ProviderError::Network("connection refused".to_string()));
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(ProviderError::EmptyResponse)
    }
}

/// How the mock video provider behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoBehavior {
    /// One hit per query
    Found,
    /// Never answers within the lookup timeout
    Hang,
    /// Every lookup errors
    Fail,
}

/// Video provider double
pub struct MockVideos {
    behavior: VideoBehavior,
    queries: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockVideos {
    pub fn new(behavior: VideoBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            queries: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl VideoSearchProvider for MockVideos {
    fn name(&self) -> &'static str {
        "mock-videos"
    }

    async fn search(&self, query: &str) -> Result<Vec<VideoHit>, VideoSearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());

        match self.behavior {
            VideoBehavior::Found => Ok(vec![VideoHit {
                url: format!("https://www.youtube.com/watch?v=vid{}", query.len()),
                title: format!("How to: {}", query),
            }]),
            VideoBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(Vec::new())
            }
            VideoBehavior::Fail => Err(VideoSearchError::QuotaExceeded),
        }
    }
}
