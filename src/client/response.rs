//! Response envelope parsing and answer extraction.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{error, warn};

use crate::error::AnalysisError;

/// Longest slice of a raw body quoted back in error messages.
const MAX_QUOTED_BODY: usize = 1024;

#[derive(Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

/// Pull the answer text out of a 2xx body.
///
/// A body that is not an envelope, or an envelope without (or with empty)
/// text, is an `EmptyResponse`.
pub fn extract_text(body: &str) -> Result<String, AnalysisError> {
    let envelope: GenerateContentResponse = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Response body is not a generateContent envelope: {}", e);
            return Err(AnalysisError::EmptyResponse);
        }
    };

    match envelope.first_text() {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => {
            warn!("Response envelope carried no text");
            Err(AnalysisError::EmptyResponse)
        }
    }
}

/// Server-provided `error.message` from an error body, if any.
pub fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.message)
        .filter(|m| !m.is_empty())
}

/// Human-readable detail for a failed status: the server message, else the
/// (truncated) body, else the canonical reason phrase.
pub fn describe_failure(status: u16, body: &str) -> String {
    if let Some(message) = error_message(body) {
        return message;
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return truncate(trimmed, MAX_QUOTED_BODY);
    }
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
        .to_string()
}

/// Parse the answer text a second time as the caller's structured shape.
pub fn parse_structured<D: DeserializeOwned>(text: &str) -> Result<D, AnalysisError> {
    let cleaned = strip_markdown_json(text);
    serde_json::from_str(&cleaned).map_err(|e| {
        let reason = format!("response text is not valid structured JSON: {}", e);
        error!("{}", reason);
        AnalysisError::MalformedStructuredResponse {
            reason,
            raw: truncate(text, MAX_QUOTED_BODY),
        }
    })
}

/// Strip markdown code fences from a model answer if present.
pub fn strip_markdown_json(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let after_open = match trimmed.find('\n') {
        Some(pos) => &trimmed[pos + 1..],
        None => {
            let rest = trimmed.trim_start_matches('`');
            rest.strip_prefix("json").unwrap_or(rest)
        }
    };
    let cleaned = after_open.trim_end();
    cleaned
        .strip_suffix("```")
        .unwrap_or(cleaned)
        .trim()
        .to_string()
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
