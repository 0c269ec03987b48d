//! Diagnosis results, follow-up questions and answers

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::VideoHit;

/// Clarifying question issued with the initial diagnosis
///
/// `id` is unique within one question set and echoed back by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpQuestion {
    pub id: String,
    pub question: String,
}

impl FollowUpQuestion {
    pub fn new(id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
        }
    }
}

/// Identifier sent as either a JSON string or number
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdInput {
    Text(String),
    Number(i64),
}

impl IdInput {
    fn into_id(self) -> Option<String> {
        let id = match self {
            IdInput::Text(s) => s.trim().to_string(),
            IdInput::Number(n) => n.to_string(),
        };
        (!id.is_empty()).then_some(id)
    }
}

/// Question as echoed back by the client; the id may be missing
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionInput {
    #[serde(default)]
    pub id: Option<IdInput>,
    pub question: String,
}

/// Rebuild the question set sent back by the client
///
/// Client ids are kept when every question carries one and they are unique;
/// otherwise the whole set is renumbered "1".."n" in display order.
pub fn normalize_question_ids(inputs: Vec<QuestionInput>) -> Vec<FollowUpQuestion> {
    let ids: Vec<Option<String>> = inputs
        .iter()
        .map(|q| q.id.clone().and_then(IdInput::into_id))
        .collect();

    let mut seen = HashSet::new();
    let keep_ids = ids
        .iter()
        .all(|id| id.as_ref().is_some_and(|id| seen.insert(id.clone())));

    inputs
        .into_iter()
        .zip(ids)
        .enumerate()
        .map(|(idx, (input, id))| {
            let id = match id {
                Some(id) if keep_ids => id,
                _ => (idx + 1).to_string(),
            };
            FollowUpQuestion::new(id, input.question)
        })
        .collect()
}

/// User's answer to a follow-up question
///
/// Answers without a `question_id` are paired positionally.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "AnswerInput")]
pub struct FollowUpAnswer {
    pub question_id: Option<String>,
    pub answer: String,
}

impl FollowUpAnswer {
    pub fn keyed(question_id: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question_id: Some(question_id.into()),
            answer: answer.into(),
        }
    }

    pub fn positional(answer: impl Into<String>) -> Self {
        Self {
            question_id: None,
            answer: answer.into(),
        }
    }
}

/// Wire shapes accepted for an answer: `"yes"` or `{ "questionId": "1", "answer": "yes" }`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AnswerInput {
    Text(String),
    Keyed {
        #[serde(rename = "questionId", default)]
        question_id: Option<IdInput>,
        answer: String,
    },
}

impl From<AnswerInput> for FollowUpAnswer {
    fn from(input: AnswerInput) -> Self {
        match input {
            AnswerInput::Text(answer) => FollowUpAnswer::positional(answer),
            AnswerInput::Keyed {
                question_id,
                answer,
            } => FollowUpAnswer {
                question_id: question_id.and_then(IdInput::into_id),
                answer,
            },
        }
    }
}

/// Replacement part extracted from diagnosis text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredPart {
    /// Join key for video resolution
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl RequiredPart {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rationale: None,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// Structured output of one AI diagnosis call
///
/// Never mutated in place; a new result supersedes the old one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisResult {
    pub summary: String,
    pub required_parts: Vec<RequiredPart>,
    pub follow_up_questions: Vec<FollowUpQuestion>,
}

/// Required part enriched with a repair video
///
/// Missing video fields mean no match was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredPartWithVideo {
    #[serde(rename = "part")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_title: Option<String>,
}

impl RequiredPartWithVideo {
    pub fn with_video(part: RequiredPart, hit: VideoHit) -> Self {
        Self {
            name: part.name,
            rationale: part.rationale,
            video_url: Some(hit.url),
            video_title: Some(hit.title),
        }
    }

    pub fn without_video(part: RequiredPart) -> Self {
        Self {
            name: part.name,
            rationale: part.rationale,
            video_url: None,
            video_title: None,
        }
    }

    pub fn has_video(&self) -> bool {
        self.video_url.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_answer_accepts_string_and_object() {
        let answers: Vec<FollowUpAnswer> = serde_json::from_value(json!([
            "only when cold",
            { "questionId": "2", "answer": "yes" },
            { "questionId": 3, "answer": "no" },
            { "answer": "not sure" }
        ]))
        .unwrap();

        assert_eq!(answers[0], FollowUpAnswer::positional("only when cold"));
        assert_eq!(answers[1], FollowUpAnswer::keyed("2", "yes"));
        assert_eq!(answers[2], FollowUpAnswer::keyed("3", "no"));
        assert_eq!(answers[3], FollowUpAnswer::positional("not sure"));
    }

    #[test]
    fn test_question_ids_kept_when_unique() {
        let inputs: Vec<QuestionInput> = serde_json::from_value(json!([
            { "id": "a", "question": "When?" },
            { "id": 7, "question": "Where?" }
        ]))
        .unwrap();

        let questions = normalize_question_ids(inputs);
        assert_eq!(questions[0].id, "a");
        assert_eq!(questions[1].id, "7");
    }

    #[test]
    fn test_question_ids_renumbered_when_missing_or_duplicate() {
        let missing: Vec<QuestionInput> = serde_json::from_value(json!([
            { "question": "When?" },
            { "id": "9", "question": "Where?" }
        ]))
        .unwrap();
        let ids: Vec<String> = normalize_question_ids(missing).into_iter().map(|q| q.id).collect();
        assert_eq!(ids, vec!["1", "2"]);

        let duplicate: Vec<QuestionInput> = serde_json::from_value(json!([
            { "id": "1", "question": "When?" },
            { "id": "1", "question": "Where?" }
        ]))
        .unwrap();
        let ids: Vec<String> = normalize_question_ids(duplicate).into_iter().map(|q| q.id).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_part_with_video_wire_shape() {
        let part = RequiredPart::new("Spark plugs").with_rationale("Worn electrodes");
        let enriched = RequiredPartWithVideo::with_video(
            part.clone(),
            VideoHit {
                url: "https://www.youtube.com/watch?v=abc".to_string(),
                title: "Replace spark plugs".to_string(),
            },
        );
        assert_eq!(
            serde_json::to_value(&enriched).unwrap(),
            json!({
                "part": "Spark plugs",
                "rationale": "Worn electrodes",
                "videoUrl": "https://www.youtube.com/watch?v=abc",
                "videoTitle": "Replace spark plugs"
            })
        );

        let bare = RequiredPartWithVideo::without_video(RequiredPart::new("Gasket"));
        assert_eq!(serde_json::to_value(&bare).unwrap(), json!({ "part": "Gasket" }));
        assert!(!bare.has_video());
    }
}
