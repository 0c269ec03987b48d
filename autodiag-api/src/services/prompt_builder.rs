//! Diagnosis request builder
//!
//! Turns session state into provider-agnostic [`ProviderRequest`]s. Pure: no
//! I/O and no clock, so the same session always yields the same request.
//!
//! The requested layout (`DIAGNOSIS:`, `REQUIRED PARTS:`,
//! `FOLLOW-UP QUESTIONS:`) matches what `response_parser` recognises, but the
//! parser does not depend on the provider honouring it.

use crate::models::{FollowUpAnswer, FollowUpQuestion, VehicleDetails};
use crate::types::{DiagnosisStage, ProviderRequest};

const NO_ANSWER: &str = "(no answer provided)";

const ROLE_INSTRUCTION: &str = "You are an experienced automotive diagnostic technician. \
Diagnose vehicle problems from the owner's description, name the most likely causes first, \
and only list replacement parts that are actually needed for the repair. \
Keep the owner's own words intact when quoting them and answer in the language they wrote in.";

const PARTS_FORMAT: &str = "REQUIRED PARTS:\n\
- <part name> - <why it is needed>\n\
(write \"- None\" if no parts are needed)";

/// Build the intake request asking for a diagnosis and up to `max_questions` questions
pub fn build_initial_prompt(vehicle: &VehicleDetails, max_questions: usize) -> ProviderRequest {
    let max_questions = max_questions.max(1);

    let system_instruction = format!(
        "{}\n\nRespond using exactly these sections:\n\
         DIAGNOSIS:\n<a concise explanation of the most likely causes>\n\
         {}\n\
         FOLLOW-UP QUESTIONS:\n1. <question>\n\n\
         Ask at most {} follow-up questions, one per numbered line.",
        ROLE_INSTRUCTION, PARTS_FORMAT, max_questions
    );

    let mut prompt = vehicle_block(vehicle);
    prompt.push_str(&format!(
        "\nGive an initial diagnosis. Then ask at most {} short follow-up questions \
         whose answers would best narrow down the cause.\n",
        max_questions
    ));

    ProviderRequest {
        stage: DiagnosisStage::Initial,
        system_instruction,
        prompt,
    }
}

/// Build the final-diagnosis request from the original details plus all Q&A
pub fn build_follow_up_prompt(
    vehicle: &VehicleDetails,
    initial_summary: &str,
    questions: &[FollowUpQuestion],
    answers: &[FollowUpAnswer],
) -> ProviderRequest {
    let system_instruction = format!(
        "{}\n\nRespond using exactly these sections:\n\
         DIAGNOSIS:\n<the refined diagnosis>\n\
         {}\n\n\
         This is the final answer: do not ask any further questions.",
        ROLE_INSTRUCTION, PARTS_FORMAT
    );

    let paired = pair_answers(questions, answers);

    let mut prompt = vehicle_block(vehicle);
    prompt.push_str("\nInitial diagnosis:\n");
    prompt.push_str(initial_summary.trim());
    prompt.push('\n');

    if !paired.pairs.is_empty() {
        prompt.push_str("\nFollow-up questions and the owner's answers:\n");
        for (idx, pair) in paired.pairs.iter().enumerate() {
            prompt.push_str(&format!(
                "{}. Q: {}\n   A: {}\n",
                idx + 1,
                pair.question.question.trim(),
                pair.answer.map(str::trim).unwrap_or(NO_ANSWER)
            ));
        }
    }

    if !paired.additional.is_empty() {
        prompt.push_str("\nAdditional information from the owner:\n");
        for extra in &paired.additional {
            prompt.push_str(&format!("- {}\n", extra.trim()));
        }
    }

    prompt.push_str(
        "\nUsing all of the above, give the final diagnosis and the replacement parts required.\n",
    );

    ProviderRequest {
        stage: DiagnosisStage::FollowUp,
        system_instruction,
        prompt,
    }
}

fn vehicle_block(vehicle: &VehicleDetails) -> String {
    let mut block = format!(
        "Vehicle: {} {}\n",
        vehicle.car_type().trim(),
        vehicle.car_model().trim()
    );
    if let Some(year) = vehicle.year() {
        block.push_str(&format!("Model year: {}\n", year));
    }
    block.push_str(&format!("Mileage: {}\n", vehicle.mileage()));
    block.push_str("Problem description:\n");
    block.push_str(vehicle.problem_description());
    block.push('\n');
    block
}

/// A question with the answer matched to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaPair<'a> {
    pub question: &'a FollowUpQuestion,
    pub answer: Option<&'a str>,
}

/// Result of matching answers to questions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedAnswers<'a> {
    /// One entry per question, in display order
    pub pairs: Vec<QaPair<'a>>,
    /// Answers that matched no question, in the order received
    pub additional: Vec<&'a str>,
}

/// Match answers to questions
///
/// Keyed answers match by `question_id` first. Answers without an id then
/// fill the question at their own position if it is still open. Unknown ids,
/// repeated ids and positional answers with no open slot become additional
/// free text. Blank answers are ignored.
pub fn pair_answers<'a>(
    questions: &'a [FollowUpQuestion],
    answers: &'a [FollowUpAnswer],
) -> PairedAnswers<'a> {
    let mut slots: Vec<Option<&'a str>> = vec![None; questions.len()];
    let mut additional: Vec<(usize, &'a str)> = Vec::new();
    let mut positional: Vec<(usize, &'a str)> = Vec::new();

    for (idx, answer) in answers.iter().enumerate() {
        let text = answer.answer.as_str();
        if text.trim().is_empty() {
            continue;
        }

        match &answer.question_id {
            Some(id) => match questions.iter().position(|q| &q.id == id) {
                Some(slot) if slots[slot].is_none() => slots[slot] = Some(text),
                _ => additional.push((idx, text)),
            },
            None => positional.push((idx, text)),
        }
    }

    for (idx, text) in positional {
        match slots.get_mut(idx) {
            Some(slot) if slot.is_none() => *slot = Some(text),
            _ => additional.push((idx, text)),
        }
    }

    additional.sort_by_key(|(idx, _)| *idx);

    PairedAnswers {
        pairs: questions
            .iter()
            .zip(slots)
            .map(|(question, answer)| QaPair { question, answer })
            .collect(),
        additional: additional.into_iter().map(|(_, text)| text).collect(),
    }
}
