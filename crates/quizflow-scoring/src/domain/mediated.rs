//! Mediated selection: transcript building and reply parsing.

use quizflow_core::error::DomainError;
use quizflow_core::gateway::TranscriptEntry;
use quizflow_core::quiz::WordMatrix;
use quizflow_core::response::{ArchetypeAlternative, ArchetypeSelection, Decision, Response};
use serde::Deserialize;
use tracing::warn;

/// Builds the transcript sent for selection from base question text and
/// chosen labels.
#[must_use]
pub fn transcript(responses: &[Response]) -> Vec<TranscriptEntry> {
    responses
        .iter()
        .map(|r| TranscriptEntry {
            question: r.question_text.clone(),
            answer: r.selected_label.clone(),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectionReply {
    #[serde(default)]
    decision: Option<String>,
    #[serde(default)]
    first_word: Option<String>,
    #[serde(default)]
    second_word: Option<String>,
    #[serde(default)]
    tagline: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    alternatives: Vec<AlternativeReply>,
    #[serde(default)]
    likelihood: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlternativeReply {
    first_word: String,
    second_word: String,
    #[serde(default)]
    reason: Option<String>,
}

/// Parses the raw selection reply and checks its shape against the word
/// matrix.
///
/// The reply is parsed as JSON; if that fails, the outermost `{…}`
/// substring is parsed once more. Chosen words must belong to their axis
/// (case-insensitively) and are normalized to vocabulary casing.
/// Alternatives outside the vocabulary are dropped.
///
/// # Errors
///
/// Returns `DomainError::Analysis` if the reply cannot be parsed, lacks a
/// decision (gated quizzes) or reasoning, or an approved reply names a word
/// outside the vocabulary.
pub fn parse_selection(raw: &str, matrix: &WordMatrix) -> Result<ArchetypeSelection, DomainError> {
    let reply = decode_reply(raw)?;

    let decision = match reply.decision.as_deref().map(str::trim) {
        Some(d) if d.eq_ignore_ascii_case("APPROVED") => Decision::Approved,
        Some(d) if d.eq_ignore_ascii_case("REJECTED") => {
            if matrix.gated {
                Decision::Rejected
            } else {
                warn!("descriptive quiz received REJECTED, treating as approved");
                Decision::Approved
            }
        }
        None if !matrix.gated => Decision::Approved,
        Some(other) => {
            return Err(DomainError::Analysis(format!(
                "unrecognized decision '{other}'"
            )));
        }
        None => {
            return Err(DomainError::Analysis(
                "selection reply is missing a decision".to_owned(),
            ));
        }
    };

    let reasoning = reply
        .reasoning
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| DomainError::Analysis("selection reply is missing reasoning".to_owned()))?;

    let (first_word, second_word) = match decision {
        Decision::Approved => {
            let first = reply
                .first_word
                .as_deref()
                .and_then(|w| matrix.first_term(w))
                .ok_or_else(|| {
                    DomainError::Analysis(format!(
                        "first word {:?} is not in the vocabulary",
                        reply.first_word
                    ))
                })?;
            let second = reply
                .second_word
                .as_deref()
                .and_then(|w| matrix.second_term(w))
                .ok_or_else(|| {
                    DomainError::Analysis(format!(
                        "second word {:?} is not in the vocabulary",
                        reply.second_word
                    ))
                })?;
            (Some(first.to_owned()), Some(second.to_owned()))
        }
        Decision::Rejected => (None, None),
    };

    let alternatives = reply
        .alternatives
        .into_iter()
        .filter_map(|alt| {
            let first = matrix.first_term(&alt.first_word)?;
            let second = matrix.second_term(&alt.second_word)?;
            Some(ArchetypeAlternative {
                first_word: first.to_owned(),
                second_word: second.to_owned(),
                reason: alt.reason,
            })
        })
        .collect();

    Ok(ArchetypeSelection {
        decision,
        first_word,
        second_word,
        tagline: reply.tagline.filter(|t| !t.trim().is_empty()),
        reasoning,
        alternatives,
        likelihood: reply.likelihood,
    })
}

fn decode_reply(raw: &str) -> Result<SelectionReply, DomainError> {
    match serde_json::from_str(raw) {
        Ok(reply) => Ok(reply),
        Err(first_error) => {
            let Some(candidate) = extract_json_object(raw) else {
                return Err(DomainError::Analysis(format!(
                    "selection reply is not JSON: {first_error}"
                )));
            };
            warn!(error = %first_error, "selection reply is not bare JSON, retrying with extracted object");
            serde_json::from_str(candidate).map_err(|e| {
                DomainError::Analysis(format!("selection reply could not be parsed: {e}"))
            })
        }
    }
}

/// Returns the substring from the first `{` to the last `}`.
#[must_use]
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}
