//! Connectivity check against the configured model and key.
//!
//! Sends a small text-only prompt so a broken key or model name shows up
//! before the user bothers with a photo.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::analyzer::prompts::api_check_prompt;
use crate::client::{GeminiClient, GenerateContentRequest, Part, Transport};
use crate::error::AnalysisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiStatus {
    #[default]
    Untested,
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiCheckReport {
    pub status: ApiStatus,
    pub model: String,
    pub message: String,
}

/// Run the check. Any 2xx counts as success; the answer text is not needed.
pub async fn check_api<T: Transport>(
    client: &GeminiClient<T>,
    cancel: &CancellationToken,
) -> ApiCheckReport {
    let model = client.model().to_string();
    info!("Running API check against model '{}'", model);

    let request = GenerateContentRequest::single_turn(vec![Part::text(api_check_prompt(&model))]);
    let (status, message) = match client.send(&request, cancel).await {
        Ok(_) => (
            ApiStatus::Success,
            "API connection successful! Model and key are working.".to_string(),
        ),
        Err(e) => {
            warn!("API check failed ({}): {}", e.kind(), e);
            (ApiStatus::Failed, describe_check_failure(&e, &model))
        }
    };

    ApiCheckReport {
        status,
        model,
        message,
    }
}

/// Map a failure to advice about what to fix.
pub fn describe_check_failure(err: &AnalysisError, model: &str) -> String {
    match err {
        AnalysisError::Http { status: 404, .. } => format!(
            "HTTP 404: Model not found. Check if '{}' is the correct, current model name, or if the endpoint is correct.",
            model
        ),
        AnalysisError::Http { status: 400, message }
            if message.contains("API_KEY_INVALID") || message.contains("API key not valid") =>
        {
            "HTTP 400: Invalid API key. Please verify the configured key is correct.".to_string()
        }
        AnalysisError::Http { status: 403, .. } => {
            "HTTP 403: Forbidden/Permission denied. Check if the key has the correct permissions."
                .to_string()
        }
        AnalysisError::Http { status, message } => format!(
            "HTTP Error {}: Failed to connect. Details: {}",
            status, message
        ),
        AnalysisError::Network { message, .. } => format!(
            "Network or unknown error: {}. Check your internet connection.",
            message
        ),
        other => other.to_string(),
    }
}
