//! Guided diagnosis session orchestration
//!
//! Sequences the two guided transitions:
//! - **Intake:** `Start` → initial prompt → AI call → parse → `AwaitingAnswers`
//! - **Follow-up:** `AwaitingAnswers` (rebuilt from the client's echo) →
//!   follow-up prompt → AI call → parse → video resolution → `Done`
//!
//! AI failures are fatal for the call. Video failures never are.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use autodiag_common::config::MAX_FOLLOW_UP_QUESTIONS;

use crate::models::{
    normalize_question_ids, DiagnosisResult, FollowUpAnswer, FollowUpQuestion, GuidedSession,
    QuestionInput, RequiredPartWithVideo, SessionState, ValidationError, VehicleDetails,
    VehicleDetailsInput,
};
use crate::services::prompt_builder::{build_follow_up_prompt, build_initial_prompt};
use crate::services::response_parser::{ParseConfidence, ResponseParser};
use crate::services::video_resolver::VideoResolver;
use crate::types::{DiagnosisProvider, ProviderError, ProviderRequest};

/// Orchestration errors
#[derive(Debug, Error)]
pub enum DiagnosisError {
    /// Caller input rejected before any provider call
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// AI provider failed (after the optional transient retry)
    #[error("Diagnosis provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Orchestrator tuning
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Upper bound for one AI call
    pub ai_timeout: Duration,
    /// Retry once on timeout, network error, 429 or 5xx
    pub retry_transient: bool,
    /// Pause before the retry
    pub retry_backoff: Duration,
    pub max_follow_up_questions: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            ai_timeout: Duration::from_secs(60),
            retry_transient: true,
            retry_backoff: Duration::from_millis(500),
            max_follow_up_questions: MAX_FOLLOW_UP_QUESTIONS,
        }
    }
}

/// Result of the intake call
#[derive(Debug, Clone)]
pub struct IntakeOutcome {
    pub session_id: Uuid,
    pub result: DiagnosisResult,
    pub confidence: ParseConfidence,
}

/// Everything the client echoes back for the follow-up call
#[derive(Debug, Clone)]
pub struct FollowUpContext {
    pub vehicle: VehicleDetails,
    pub initial_analysis: String,
    pub questions: Vec<FollowUpQuestion>,
    pub answers: Vec<FollowUpAnswer>,
}

impl FollowUpContext {
    /// Rebuild the follow-up context from raw client input
    ///
    /// Vehicle details go through the same validation as intake. Questions
    /// without usable ids are renumbered "1".."n".
    pub fn from_input(
        car_details: Option<VehicleDetailsInput>,
        initial_analysis: Option<String>,
        questions: Vec<QuestionInput>,
        answers: Vec<FollowUpAnswer>,
    ) -> Result<Self, DiagnosisError> {
        let vehicle = car_details
            .ok_or_else(|| ValidationError("carDetails is required".to_string()))?
            .validate()?;

        let initial_analysis = initial_analysis
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ValidationError("initialAnalysis is required".to_string()))?;

        Ok(Self {
            vehicle,
            initial_analysis,
            questions: normalize_question_ids(questions),
            answers,
        })
    }
}

/// Result of the follow-up call
#[derive(Debug, Clone)]
pub struct FinalOutcome {
    pub session_id: Uuid,
    pub result: DiagnosisResult,
    pub parts_with_videos: Vec<RequiredPartWithVideo>,
    pub confidence: ParseConfidence,
}

/// Guided diagnosis orchestrator
///
/// Holds only immutable collaborators, so one instance is shared by all
/// requests.
pub struct SessionOrchestrator {
    diagnosis: Arc<dyn DiagnosisProvider>,
    parser: ResponseParser,
    resolver: VideoResolver,
    settings: OrchestratorSettings,
}

impl SessionOrchestrator {
    pub fn new(
        diagnosis: Arc<dyn DiagnosisProvider>,
        resolver: VideoResolver,
        settings: OrchestratorSettings,
    ) -> Self {
        let max_questions = settings.max_follow_up_questions.clamp(1, MAX_FOLLOW_UP_QUESTIONS);
        Self {
            diagnosis,
            parser: ResponseParser::new(max_questions),
            resolver,
            settings: OrchestratorSettings {
                max_follow_up_questions: max_questions,
                ..settings
            },
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Whether final diagnoses are enriched with videos
    pub fn video_enabled(&self) -> bool {
        self.resolver.is_enabled()
    }

    /// Intake: initial diagnosis plus follow-up questions
    pub async fn start_guided(&self, vehicle: VehicleDetails) -> Result<IntakeOutcome, DiagnosisError> {
        let mut session = GuidedSession::new(vehicle);

        info!(
            session_id = %session.session_id,
            vehicle = %session.vehicle.display_name(),
            "Starting guided diagnosis"
        );

        let request = build_initial_prompt(&session.vehicle, self.settings.max_follow_up_questions);
        let raw = self.call_provider(session.session_id, &request).await?;

        let parsed = self.parser.parse(&raw);
        if parsed.is_degraded() {
            warn!(
                session_id = %session.session_id,
                "Initial diagnosis text had no recognisable structure, returning raw summary"
            );
        }

        let confidence = parsed.confidence;
        session.record_initial(parsed.result);

        let result = session.initial.take().unwrap_or_default();
        info!(
            session_id = %session.session_id,
            questions = result.follow_up_questions.len(),
            elapsed_ms = session.elapsed_ms(),
            "Initial diagnosis ready"
        );

        Ok(IntakeOutcome {
            session_id: session.session_id,
            result,
            confidence,
        })
    }

    /// Follow-up: final diagnosis from the original details plus all Q&A,
    /// enriched with repair videos
    pub async fn complete_guided(&self, context: FollowUpContext) -> Result<FinalOutcome, DiagnosisError> {
        let FollowUpContext {
            vehicle,
            initial_analysis,
            questions,
            answers,
        } = context;

        let mut session = GuidedSession::resume(vehicle, initial_analysis, questions, answers);

        info!(
            session_id = %session.session_id,
            vehicle = %session.vehicle.display_name(),
            questions = session.questions().len(),
            answers = session.answers.len(),
            "Completing guided diagnosis"
        );

        let request = build_follow_up_prompt(
            &session.vehicle,
            session.initial_summary(),
            session.questions(),
            &session.answers,
        );
        let raw = self.call_provider(session.session_id, &request).await?;

        let parsed = self.parser.parse(&raw);
        if parsed.is_degraded() {
            warn!(
                session_id = %session.session_id,
                "Final diagnosis text had no recognisable structure, returning raw summary"
            );
        }

        let confidence = parsed.confidence;
        let mut result = parsed.result;
        if !result.follow_up_questions.is_empty() {
            debug!(
                session_id = %session.session_id,
                dropped = result.follow_up_questions.len(),
                "Dropping questions from final diagnosis"
            );
            result.follow_up_questions.clear();
        }

        let parts_with_videos = self
            .resolver
            .resolve(&session.vehicle, result.required_parts.clone())
            .await;

        session.transition_to(SessionState::Done);

        info!(
            session_id = %session.session_id,
            parts = parts_with_videos.len(),
            videos = parts_with_videos.iter().filter(|p| p.has_video()).count(),
            elapsed_ms = session.elapsed_ms(),
            "Final diagnosis ready"
        );

        Ok(FinalOutcome {
            session_id: session.session_id,
            result,
            parts_with_videos,
            confidence,
        })
    }

    /// One bounded AI call with at most one retry for transient errors
    async fn call_provider(
        &self,
        session_id: Uuid,
        request: &ProviderRequest,
    ) -> Result<String, ProviderError> {
        let mut attempt = 1;

        loop {
            let outcome =
                match tokio::time::timeout(self.settings.ai_timeout, self.diagnosis.generate(request)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ProviderError::Timeout(self.settings.ai_timeout)),
                };

            let outcome = outcome.and_then(|text| {
                if text.trim().is_empty() {
                    Err(ProviderError::EmptyResponse)
                } else {
                    Ok(text)
                }
            });

            match outcome {
                Ok(text) => {
                    debug!(
                        session_id = %session_id,
                        provider = self.diagnosis.name(),
                        stage = ?request.stage,
                        attempt,
                        chars = text.len(),
                        "Diagnosis provider responded"
                    );
                    return Ok(text);
                }
                Err(e) if attempt == 1 && self.settings.retry_transient && e.is_transient() => {
                    warn!(
                        session_id = %session_id,
                        provider = self.diagnosis.name(),
                        error = %e,
                        "Transient diagnosis provider error, retrying once"
                    );
                    attempt += 1;
                    if !self.settings.retry_backoff.is_zero() {
                        tokio::time::sleep(self.settings.retry_backoff).await;
                    }
                }
                Err(e) => {
                    error!(
                        session_id = %session_id,
                        provider = self.diagnosis.name(),
                        stage = ?request.stage,
                        attempt,
                        error = %e,
                        "Diagnosis provider failed"
                    );
                    return Err(e);
                }
            }
        }
    }
}
