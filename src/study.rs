//! Study aids built on the text-generation capability: summaries,
//! translations, and multiple-choice quizzes from digitized notes.
//!
//! These are companions to chapter synthesis, not pipeline stages — each is
//! one capability call with light cleanup. They share the composed-prompt
//! conventions in [`crate::prompts`] so prompt changes stay in one place.

use crate::capability::{CapabilityError, TextGenerator};
use crate::error::ChapterError;
use crate::prompts;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// One multiple-choice quiz question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    /// The question text.
    pub question: String,
    /// Four candidate answers.
    pub options: Vec<String>,
    /// The correct answer, verbatim one of `options`.
    pub answer: String,
}

#[derive(Deserialize)]
struct QuizEnvelope {
    #[serde(default)]
    quiz: Vec<QuizQuestion>,
}

/// Summarize digitized notes into revision key points.
pub async fn summarize(
    notes: &str,
    text_gen: &Arc<dyn TextGenerator>,
) -> Result<String, ChapterError> {
    let response = text_gen
        .generate_text(&prompts::summarize_prompt(notes))
        .await
        .map_err(study_error("summarize the notes"))?;
    Ok(response.trim().to_string())
}

/// Translate digitized notes to `language`, preserving formatting.
pub async fn translate(
    notes: &str,
    language: &str,
    text_gen: &Arc<dyn TextGenerator>,
) -> Result<String, ChapterError> {
    let response = text_gen
        .generate_text(&prompts::translate_prompt(notes, language))
        .await
        .map_err(study_error(&format!("translate the notes to {language}")))?;
    Ok(response.trim().to_string())
}

/// Generate a multiple-choice quiz from digitized notes.
///
/// The model is asked for a bare JSON envelope but frequently wraps it in
/// markdown fences anyway; both forms are accepted. A response that parses
/// but contains no questions is an error — silently returning an empty quiz
/// would read as "these notes have no content worth quizzing".
pub async fn generate_quiz(
    notes: &str,
    text_gen: &Arc<dyn TextGenerator>,
) -> Result<Vec<QuizQuestion>, ChapterError> {
    let response = text_gen
        .generate_text(&prompts::quiz_prompt(notes))
        .await
        .map_err(study_error("generate a quiz"))?;

    let json = extract_json(&response);
    debug!("Quiz response: {} chars of JSON", json.len());

    let envelope: QuizEnvelope =
        serde_json::from_str(json).map_err(|e| ChapterError::StudyAidFailed {
            action: "generate a quiz".into(),
            detail: format!("response was not valid JSON: {e}"),
        })?;

    if envelope.quiz.is_empty() {
        return Err(ChapterError::StudyAidFailed {
            action: "generate a quiz".into(),
            detail: "response contained no questions".into(),
        });
    }
    Ok(envelope.quiz)
}

static RE_JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\n(.*)\n```\s*$").unwrap());

/// Strip a surrounding markdown fence from a JSON response, if present.
fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();
    match RE_JSON_FENCE.captures(trimmed) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(trimmed),
        None => trimmed,
    }
}

fn study_error(action: &str) -> impl Fn(CapabilityError) -> ChapterError + '_ {
    move |e| ChapterError::StudyAidFailed {
        action: action.to_string(),
        detail: e.to_string(),
    }
}
