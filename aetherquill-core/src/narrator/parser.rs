//! Classify raw generated text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length at which a response reaches full confidence.
const FULL_CONFIDENCE_LENGTH: usize = 500;
/// Longest leading clause that still reads as a speaker tag.
const MAX_SPEAKER_LENGTH: usize = 40;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty response")]
    EmptyResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    Scene,
    Dialogue,
    Combat,
    Description,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub content: String,
    pub response_type: ResponseType,
    /// Between 0.0 and 1.0, growing with length.
    pub confidence: f32,
}

/// Classify a completion.
///
/// Bracketed tags win (`[SCENE]`, `[DIALOGUE]`, `[COMBAT]`). Otherwise a
/// short clause ending in a colon on the first line reads as a speaker tag
/// and the text is dialogue. Everything else is description.
pub fn parse_response(raw: &str) -> Result<ParsedResponse, ParseError> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(ParseError::EmptyResponse);
    }

    let response_type = tagged_type(content).unwrap_or_else(|| {
        if looks_like_dialogue(content) {
            ResponseType::Dialogue
        } else {
            ResponseType::Description
        }
    });

    let confidence =
        (content.chars().count() as f32 / FULL_CONFIDENCE_LENGTH as f32).min(1.0);

    Ok(ParsedResponse {
        content: content.to_string(),
        response_type,
        confidence,
    })
}

fn tagged_type(content: &str) -> Option<ResponseType> {
    let upper = content.to_uppercase();
    if upper.contains("[SCENE]") {
        Some(ResponseType::Scene)
    } else if upper.contains("[DIALOGUE]") {
        Some(ResponseType::Dialogue)
    } else if upper.contains("[COMBAT]") {
        Some(ResponseType::Combat)
    } else {
        None
    }
}

fn looks_like_dialogue(content: &str) -> bool {
    let first_line = content.lines().next().unwrap_or_default();
    match first_line.split_once(':') {
        Some((speaker, rest)) => {
            let speaker = speaker.trim();
            !speaker.is_empty()
                && speaker.chars().count() <= MAX_SPEAKER_LENGTH
                && !speaker.contains(['.', '!', '?'])
                && !rest.trim().is_empty()
        }
        None => false,
    }
}
