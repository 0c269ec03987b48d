//! Guided diagnosis session state machine
//!
//! A session progresses through three states:
//! START → AWAITING_ANSWERS → DONE
//!
//! Sessions are never stored server-side. The intake call ends in
//! `AwaitingAnswers`; the follow-up call rebuilds the session in that state
//! from what the client echoes back and drives it to `Done`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::diagnosis::{DiagnosisResult, FollowUpAnswer, FollowUpQuestion};
use super::vehicle::VehicleDetails;

/// Guided session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Vehicle details accepted, no AI call yet
    Start,
    /// Initial diagnosis issued, waiting for the user's answers
    AwaitingAnswers,
    /// Final enriched diagnosis produced
    Done,
}

impl SessionState {
    /// Whether `self → next` is a legal step
    pub fn can_transition_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::Start, SessionState::AwaitingAnswers)
                | (SessionState::AwaitingAnswers, SessionState::Done)
        )
    }
}

/// State transition event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: SessionState,
    pub new_state: SessionState,
    pub transitioned_at: DateTime<Utc>,
}

/// Guided diagnosis session (in-memory, lives for one request)
#[derive(Debug, Clone)]
pub struct GuidedSession {
    /// Correlation id for logs
    pub session_id: Uuid,

    pub state: SessionState,

    /// Original vehicle details, reused verbatim on the follow-up call
    pub vehicle: VehicleDetails,

    /// Initial diagnosis (present from `AwaitingAnswers` on)
    pub initial: Option<DiagnosisResult>,

    /// Answers supplied on the follow-up call
    pub answers: Vec<FollowUpAnswer>,

    pub started_at: DateTime<Utc>,
}

impl GuidedSession {
    /// Create a new session at intake
    pub fn new(vehicle: VehicleDetails) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: SessionState::Start,
            vehicle,
            initial: None,
            answers: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Rebuild a session from the client's round-tripped initial analysis
    pub fn resume(
        vehicle: VehicleDetails,
        initial_summary: String,
        questions: Vec<FollowUpQuestion>,
        answers: Vec<FollowUpAnswer>,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: SessionState::AwaitingAnswers,
            vehicle,
            initial: Some(DiagnosisResult {
                summary: initial_summary,
                required_parts: Vec::new(),
                follow_up_questions: questions,
            }),
            answers,
            started_at: Utc::now(),
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: SessionState) -> StateTransition {
        if !self.state.can_transition_to(new_state) {
            tracing::warn!(
                session_id = %self.session_id,
                from = ?self.state,
                to = ?new_state,
                "Unexpected session state transition"
            );
        }

        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        tracing::debug!(
            session_id = %self.session_id,
            from = ?transition.old_state,
            to = ?transition.new_state,
            "Session state transition"
        );

        transition
    }

    /// Record the initial diagnosis and move to `AwaitingAnswers`
    pub fn record_initial(&mut self, result: DiagnosisResult) -> StateTransition {
        self.initial = Some(result);
        self.transition_to(SessionState::AwaitingAnswers)
    }

    /// Initial summary, empty before intake completes
    pub fn initial_summary(&self) -> &str {
        self.initial.as_ref().map(|r| r.summary.as_str()).unwrap_or("")
    }

    /// Questions issued with the initial diagnosis
    pub fn questions(&self) -> &[FollowUpQuestion] {
        self.initial
            .as_ref()
            .map(|r| r.follow_up_questions.as_slice())
            .unwrap_or(&[])
    }

    /// Milliseconds since the session was created
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
            .max(0)
    }
}
