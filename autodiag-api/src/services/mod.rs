//! Service modules for guided diagnosis
//!
//! Pure pipeline stages (prompt building, response parsing), the video
//! resolver and session orchestrator, plus the HTTP provider clients.

pub mod gemini_client;
pub mod prompt_builder;
pub mod response_parser;
pub mod session_orchestrator;
pub mod video_resolver;
pub mod youtube_client;

pub use gemini_client::GeminiClient;
pub use prompt_builder::{build_follow_up_prompt, build_initial_prompt, pair_answers};
pub use response_parser::{ParseConfidence, ParsedDiagnosis, ResponseParser};
pub use session_orchestrator::{
    DiagnosisError, FinalOutcome, FollowUpContext, IntakeOutcome, OrchestratorSettings,
    SessionOrchestrator,
};
pub use video_resolver::{build_search_query, VideoResolver};
pub use youtube_client::YouTubeClient;
