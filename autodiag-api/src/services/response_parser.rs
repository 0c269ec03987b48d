//! AI response parser
//!
//! Turns free-form diagnosis text into a [`DiagnosisResult`]. The provider's
//! formatting is not contractual, so parsing is a tolerant two-pass
//! line classification rather than a fixed-format decoder:
//!
//! 1. **Classify** every line as blank, heading, bullet or prose. Headings
//!    are recognised by keyword after stripping markdown (`#`, `**`, `__`),
//!    leading numbering and a trailing colon; bullets by `-`, `*`, `•`, `+`,
//!    dashes, squares/circles or `1.` / `1)` / `(1)` markers.
//! 2. **Interpret** the lines grouped under each section (diagnosis, parts,
//!    questions).
//!
//! Parsing never fails. Text without headings but with list markers is read
//! as a bare list: bullets ending in `?` are questions, the others parts, and
//! the prose before the first bullet is the summary. Text with neither
//! degrades to a raw-text summary with empty lists and
//! [`ParseConfidence::Degraded`].

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::models::{DiagnosisResult, FollowUpQuestion, RequiredPart};
use autodiag_common::config::MAX_FOLLOW_UP_QUESTIONS;

static BULLET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[-*•+–—▪●◦‣·]|\(?\d{1,2}[.)])\s+(.+)$").expect("valid bullet regex")
});

static NUMBERING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(?\d{1,2}[.)]\s*").expect("valid numbering regex"));

static PARENTHETICAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)").expect("valid parenthetical regex"));

static DIAGNOSIS_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:initial|final|refined|preliminary|updated|overall)\s+)?(?:diagnosis|diagnoses|summary|analysis|assessment|overview|(?:most\s+)?(?:likely|possible|probable|potential)\s+causes?)$",
    )
    .expect("valid diagnosis label regex")
});

static PARTS_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:required|recommended|needed|necessary|suggested)\s+)?(?:replacement\s+)?parts?(?:\s+(?:needed|required|list|to\s+replace))?$",
    )
    .expect("valid parts label regex")
});

static QUESTIONS_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:follow[- ]?up|clarifying|additional|diagnostic)\s+)?questions?(?:\s+for\s+(?:you|the\s+owner|the\s+driver))?$",
    )
    .expect("valid questions label regex")
});

static QUESTION_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:q|question)\s*#?\s*(\d{1,2})\s*[:.)-]\s*(.+)$")
        .expect("valid question id regex")
});

/// Separators between a part name and its rationale, first match wins
const PART_SEPARATORS: [&str; 4] = [" - ", " – ", " — ", ": "];

/// How much of the expected structure was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseConfidence {
    /// A known section heading or a list was recognised
    Structured,
    /// No structure found; summary is the raw text
    Degraded,
}

/// Parser output: the result plus an internal confidence flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDiagnosis {
    pub result: DiagnosisResult,
    pub confidence: ParseConfidence,
}

impl ParsedDiagnosis {
    pub fn is_degraded(&self) -> bool {
        self.confidence == ParseConfidence::Degraded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Diagnosis,
    Parts,
    Questions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Blank,
    Heading { section: Section, rest: String },
    Bullet { text: String, raw: String },
    Prose(String),
}

/// Tolerant diagnosis text parser
#[derive(Debug, Clone)]
pub struct ResponseParser {
    max_questions: usize,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new(MAX_FOLLOW_UP_QUESTIONS)
    }
}

impl ResponseParser {
    /// Create a parser keeping at most `max_questions` follow-up questions
    pub fn new(max_questions: usize) -> Self {
        Self { max_questions }
    }

    /// Parse raw provider text; total and deterministic
    pub fn parse(&self, raw: &str) -> ParsedDiagnosis {
        let mut preamble: Vec<Line> = Vec::new();
        let mut diagnosis: Vec<Line> = Vec::new();
        let mut parts: Vec<Line> = Vec::new();
        let mut questions: Vec<Line> = Vec::new();
        let mut current: Option<Section> = None;
        let mut found_heading = false;

        for line in raw.lines().map(classify) {
            let target = match line {
                Line::Heading { section, rest } => {
                    found_heading = true;
                    current = Some(section);
                    if rest.is_empty() {
                        continue;
                    }
                    // Inline content after "Heading:" belongs to the new section
                    let line = classify_content(&rest);
                    section_lines(&mut diagnosis, &mut parts, &mut questions, section).push(line);
                    continue;
                }
                other => other,
            };

            match current {
                Some(section) => {
                    section_lines(&mut diagnosis, &mut parts, &mut questions, section).push(target)
                }
                None => preamble.push(target),
            }
        }

        if !found_heading {
            return self.parse_bare_list(raw, preamble);
        }

        let summary = [join_text(&diagnosis), join_text(&preamble)]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| raw.trim().to_string());

        ParsedDiagnosis {
            result: DiagnosisResult {
                summary,
                required_parts: interpret_parts(&parts),
                follow_up_questions: interpret_questions(&questions, self.max_questions),
            },
            confidence: ParseConfidence::Structured,
        }
    }
}

impl ResponseParser {
    /// Heading-less text: split the list by whether each item asks something
    fn parse_bare_list(&self, raw: &str, lines: Vec<Line>) -> ParsedDiagnosis {
        let first_bullet = lines.iter().position(|l| matches!(l, Line::Bullet { .. }));
        let Some(first_bullet) = first_bullet else {
            return ParsedDiagnosis {
                result: DiagnosisResult {
                    summary: raw.trim().to_string(),
                    required_parts: Vec::new(),
                    follow_up_questions: Vec::new(),
                },
                confidence: ParseConfidence::Degraded,
            };
        };

        let mut parts: Vec<Line> = Vec::new();
        let mut questions: Vec<Line> = Vec::new();
        for line in &lines[first_bullet..] {
            if let Line::Bullet { text, .. } = line {
                if strip_emphasis(text).trim_end().ends_with('?') {
                    questions.push(line.clone());
                } else {
                    parts.push(line.clone());
                }
            }
        }

        let summary = join_text(&lines[..first_bullet]);
        let summary = if summary.is_empty() {
            raw.trim().to_string()
        } else {
            summary
        };

        ParsedDiagnosis {
            result: DiagnosisResult {
                summary,
                required_parts: interpret_parts(&parts),
                follow_up_questions: interpret_questions(&questions, self.max_questions),
            },
            confidence: ParseConfidence::Structured,
        }
    }
}

fn section_lines<'a>(
    diagnosis: &'a mut Vec<Line>,
    parts: &'a mut Vec<Line>,
    questions: &'a mut Vec<Line>,
    section: Section,
) -> &'a mut Vec<Line> {
    match section {
        Section::Diagnosis => diagnosis,
        Section::Parts => parts,
        Section::Questions => questions,
    }
}

// ============================================================================
// Pass 1: line classification
// ============================================================================

fn classify(line: &str) -> Line {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with("```") || is_rule(trimmed) {
        return Line::Blank;
    }
    if let Some((section, rest)) = heading(trimmed) {
        return Line::Heading { section, rest };
    }
    classify_content(trimmed)
}

/// Classify a line already known not to be a heading
fn classify_content(trimmed: &str) -> Line {
    match BULLET_RE.captures(trimmed) {
        Some(caps) => Line::Bullet {
            text: caps[1].trim().to_string(),
            raw: trimmed.to_string(),
        },
        None => Line::Prose(trimmed.to_string()),
    }
}

/// Markdown horizontal rules (`---`, `***`, `___`, `===`)
fn is_rule(line: &str) -> bool {
    line.len() >= 3 && line.chars().all(|c| matches!(c, '-' | '*' | '_' | '=' | ' '))
}

fn strip_emphasis(text: &str) -> String {
    text.replace("**", "").replace("__", "").replace('`', "")
}

/// Recognise a section heading, returning any inline content after its colon
fn heading(line: &str) -> Option<(Section, String)> {
    let unhashed = line.trim_start_matches('#').trim();
    let emphasized = unhashed.contains("**") || unhashed.contains("__");
    let mut text = strip_emphasis(unhashed).trim().to_string();

    // "- **Required parts:**" style headings only count when emphasized
    if emphasized {
        if let Some(caps) = BULLET_RE.captures(&text) {
            text = caps[1].trim().to_string();
        }
    }
    let text = NUMBERING_RE.replace(&text, "").to_string();

    let (label, rest) = match text
        .char_indices()
        .find(|(_, c)| *c == ':' || *c == '：')
    {
        Some((idx, c)) => (&text[..idx], text[idx + c.len_utf8()..].trim()),
        None => (text.as_str(), ""),
    };

    let label = normalize_label(label);
    if label.is_empty() || label.len() > 48 {
        return None;
    }

    let section = if QUESTIONS_LABEL_RE.is_match(&label) {
        Section::Questions
    } else if PARTS_LABEL_RE.is_match(&label) {
        Section::Parts
    } else if DIAGNOSIS_LABEL_RE.is_match(&label) {
        Section::Diagnosis
    } else {
        return None;
    };

    Some((section, rest.to_string()))
}

fn normalize_label(label: &str) -> String {
    let lowered = label.to_lowercase();
    let without_parens = PARENTHETICAL_RE.replace_all(&lowered, " ");
    without_parens
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(|c: char| c == '.' || c == '!')
        .trim()
        .to_string()
}

// ============================================================================
// Pass 2: section interpretation
// ============================================================================

/// Rebuild section text, collapsing runs of blank lines
fn join_text(lines: &[Line]) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut pending_blank = false;

    for line in lines {
        let text = match line {
            Line::Blank => {
                pending_blank = !out.is_empty();
                continue;
            }
            Line::Bullet { raw, .. } => raw.as_str(),
            Line::Prose(text) => text.as_str(),
            Line::Heading { .. } => continue,
        };
        if pending_blank {
            out.push("");
            pending_blank = false;
        }
        out.push(text);
    }

    out.join("\n")
}

struct PartDraft {
    name: String,
    rationale: Vec<String>,
}

fn interpret_parts(lines: &[Line]) -> Vec<RequiredPart> {
    let has_bullets = lines.iter().any(|l| matches!(l, Line::Bullet { .. }));
    let mut drafts: Vec<PartDraft> = Vec::new();

    for line in lines {
        match line {
            Line::Bullet { text, .. } => {
                if let Some(draft) = split_part(text) {
                    drafts.push(draft);
                }
            }
            Line::Prose(text) if text.ends_with(':') => {
                // Intro line such as "You will need the following:"
            }
            Line::Prose(text) if has_bullets => {
                // Continuation of the previous item
                if let Some(last) = drafts.last_mut() {
                    last.rationale.push(strip_emphasis(text).trim().to_string());
                }
            }
            Line::Prose(text) => {
                // Unbulleted list: one part per line
                if let Some(draft) = split_part(text) {
                    drafts.push(draft);
                }
            }
            Line::Blank | Line::Heading { .. } => {}
        }
    }

    let mut seen = HashSet::new();
    let mut parts: Vec<RequiredPart> = Vec::new();
    for draft in drafts {
        let key = draft.name.to_lowercase();
        let rationale = draft.rationale.join(" ").trim().to_string();
        let rationale = (!rationale.is_empty()).then_some(rationale);

        if seen.insert(key.clone()) {
            parts.push(RequiredPart {
                name: draft.name,
                rationale,
            });
        } else if let Some(existing) = parts.iter_mut().find(|p| p.name.to_lowercase() == key) {
            if existing.rationale.is_none() {
                existing.rationale = rationale;
            }
        }
    }

    parts
}

/// Split "Name - why" / "Name: why" / "Name (why)" into a part draft
fn split_part(text: &str) -> Option<PartDraft> {
    let clean = strip_emphasis(text);
    let clean = clean.trim();

    let separator = PART_SEPARATORS
        .iter()
        .filter_map(|sep| clean.find(sep).map(|idx| (idx, sep.len())))
        .min_by_key(|(idx, _)| *idx);

    let (name, rationale) = match separator {
        Some((idx, len)) => (&clean[..idx], Some(clean[idx + len..].trim())),
        None => match clean.rfind(" (") {
            Some(idx) if clean.ends_with(')') => {
                let tail = &clean[idx + 2..clean.len() - 1];
                if is_grade_tag(tail) {
                    (clean, None)
                } else {
                    (&clean[..idx], Some(tail.trim()))
                }
            }
            _ => (clean, None),
        },
    };

    let name = name
        .trim()
        .trim_end_matches(|c: char| c == '.' || c == ',' || c == ';')
        .trim();
    if name.is_empty() || is_placeholder(name) {
        return None;
    }

    Some(PartDraft {
        name: name.to_string(),
        rationale: rationale
            .filter(|r| !r.is_empty())
            .map(|r| vec![r.to_string()])
            .unwrap_or_default(),
    })
}

/// Short grade or size tags such as "5W-30" or "H7" stay in the part name
fn is_grade_tag(tail: &str) -> bool {
    let tail = tail.trim();
    !tail.is_empty()
        && tail.chars().count() <= 16
        && tail.split_whitespace().count() <= 2
        && tail.chars().any(|c| c.is_ascii_digit())
}

/// "None", "N/A", "No parts required" and similar non-items
fn is_placeholder(name: &str) -> bool {
    let lowered = name.to_lowercase();
    let lowered = lowered.trim_matches(|c: char| !c.is_alphanumeric() && c != '/');
    lowered == "none"
        || lowered.starts_with("none ")
        || lowered == "n/a"
        || lowered == "na"
        || lowered == "nothing"
        || lowered.starts_with("no parts")
        || lowered.starts_with("no replacement parts")
        || lowered.starts_with("no additional parts")
        || lowered.starts_with("no questions")
        || lowered.starts_with("no further")
        || lowered.starts_with("no additional questions")
}

struct QuestionDraft {
    explicit_id: Option<String>,
    text: String,
}

fn interpret_questions(lines: &[Line], max_questions: usize) -> Vec<FollowUpQuestion> {
    let mut drafts: Vec<QuestionDraft> = Vec::new();

    for line in lines {
        match line {
            Line::Bullet { text, .. } => drafts.push(question_draft(text)),
            Line::Prose(text) => {
                let draft = question_draft(text);
                let previous_closed = drafts.last().map_or(true, |q| q.text.ends_with('?'));
                if draft.explicit_id.is_some() || (draft.text.ends_with('?') && previous_closed) {
                    drafts.push(draft);
                } else if let Some(last) = drafts.last_mut() {
                    last.text.push(' ');
                    last.text.push_str(&draft.text);
                }
                // Otherwise intro prose before the first question
            }
            Line::Blank | Line::Heading { .. } => {}
        }
    }

    drafts.retain(|q| !q.text.is_empty() && !is_placeholder(&q.text));
    drafts.truncate(max_questions);

    let mut seen = HashSet::new();
    let keep_ids = drafts.iter().all(|q| {
        q.explicit_id
            .as_ref()
            .is_some_and(|id| seen.insert(id.clone()))
    });

    drafts
        .into_iter()
        .enumerate()
        .map(|(idx, draft)| {
            let id = match draft.explicit_id {
                Some(id) if keep_ids => id,
                _ => (idx + 1).to_string(),
            };
            FollowUpQuestion::new(id, draft.text)
        })
        .collect()
}

fn question_draft(text: &str) -> QuestionDraft {
    let clean = strip_emphasis(text);
    let clean = clean.trim();

    match QUESTION_ID_RE.captures(clean) {
        Some(caps) => QuestionDraft {
            explicit_id: Some(caps[1].trim_start_matches('0'))
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            text: caps[2].trim().to_string(),
        },
        None => QuestionDraft {
            explicit_id: None,
            text: clean.to_string(),
        },
    }
}
