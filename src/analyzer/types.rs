//! Type definitions for skin photo analysis.
//!
//! A request carries the prompt, the inline image and the desired output
//! shape. The result is either free text or a structured assessment.

use serde::{Deserialize, Serialize};

use super::prompts;
use crate::client::{GenerateContentRequest, InlineData, Part};
use crate::error::AnalysisError;

/// How the caller wants the answer shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputShape {
    /// Markdown-ish prose starting with the condition name in bold.
    #[default]
    Text,
    /// JSON object with condition, confidence, description and disclaimer.
    Structured,
}

/// One analysis submission. Discarded once the response arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub prompt_text: String,
    pub image: Option<InlineData>,
    pub output: OutputShape,
}

impl AnalysisRequest {
    /// Request using the stock prompt for the given shape.
    pub fn for_image(image: InlineData, output: OutputShape) -> Self {
        let prompt_text = match output {
            OutputShape::Text => prompts::TEXT_ANALYSIS_PROMPT,
            OutputShape::Structured => prompts::STRUCTURED_ANALYSIS_PROMPT,
        };
        Self {
            prompt_text: prompt_text.to_string(),
            image: Some(image),
            output,
        }
    }

    /// Wire request. Fails when no image is attached.
    pub fn to_generate_request(&self) -> Result<GenerateContentRequest, AnalysisError> {
        let image = self.image.as_ref().ok_or_else(|| {
            AnalysisError::Precondition("Please upload or capture an image first.".to_string())
        })?;

        let request = GenerateContentRequest::single_turn(vec![
            Part::text(self.prompt_text.clone()),
            Part::inline(image.mime_type.clone(), image.data.clone()),
        ])
        .with_system_instruction(prompts::ANALYSIS_SYSTEM_INSTRUCTION);

        Ok(match self.output {
            OutputShape::Text => request,
            OutputShape::Structured => {
                request.with_response_schema(prompts::skin_assessment_schema())
            }
        })
    }
}

/// Structured answer for the skin-condition prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkinAssessment {
    /// Common name of the visible condition
    pub condition: String,
    /// 0-100
    pub confidence: u8,
    pub description: String,
    pub disclaimer: String,
}

/// Shape the model sends back, before range checks.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawAssessment {
    pub condition: String,
    pub confidence: f64,
    pub description: String,
    pub disclaimer: String,
}

impl TryFrom<RawAssessment> for SkinAssessment {
    type Error = AnalysisError;

    fn try_from(raw: RawAssessment) -> Result<Self, Self::Error> {
        if !raw.confidence.is_finite() || !(0.0..=100.0).contains(&raw.confidence) {
            return Err(AnalysisError::MalformedStructuredResponse {
                reason: format!("confidence {} is outside 0-100", raw.confidence),
                raw: raw.confidence.to_string(),
            });
        }
        if raw.condition.trim().is_empty() {
            return Err(AnalysisError::MalformedStructuredResponse {
                reason: "condition is empty".to_string(),
                raw: String::new(),
            });
        }
        Ok(Self {
            condition: raw.condition.trim().to_string(),
            confidence: raw.confidence.round() as u8,
            description: raw.description,
            disclaimer: raw.disclaimer,
        })
    }
}

/// Outcome of one analysis. Replaces the previous one; never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AnalysisResult {
    Text { text: String },
    Assessment(SkinAssessment),
}

impl AnalysisResult {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnalysisResult::Text { text } => Some(text),
            AnalysisResult::Assessment(_) => None,
        }
    }

    pub fn as_assessment(&self) -> Option<&SkinAssessment> {
        match self {
            AnalysisResult::Assessment(a) => Some(a),
            AnalysisResult::Text { .. } => None,
        }
    }
}
