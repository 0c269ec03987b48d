//! Data models for guided diagnosis sessions

pub mod diagnosis;
pub mod guided_session;
pub mod vehicle;

pub use diagnosis::{
    normalize_question_ids, DiagnosisResult, FollowUpAnswer, FollowUpQuestion, QuestionInput,
    RequiredPart, RequiredPartWithVideo,
};
pub use guided_session::{GuidedSession, SessionState, StateTransition};
pub use vehicle::{ValidationError, VehicleDetails, VehicleDetailsInput};
