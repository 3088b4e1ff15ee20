use thiserror::Error;

/// Outcome of a failed request to the vision endpoint.
///
/// Every failure of one orchestrated exchange lands in exactly one of these
/// categories. None of them is fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// Something required was missing before any network call was made.
    #[error("{0}")]
    Precondition(String),

    /// The endpoint kept answering 429 until attempts ran out.
    #[error("Rate limited after {attempts} attempt(s): {message}")]
    RateLimited { attempts: u32, message: String },

    /// Non-2xx, non-429 answer. Never retried.
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// 2xx answer without any extractable text.
    #[error("Received an empty response from the AI service")]
    EmptyResponse,

    /// Text was present but did not match the requested structured shape.
    #[error("Malformed structured response: {reason}")]
    MalformedStructuredResponse { reason: String, raw: String },

    /// Transport-level failure on the final attempt.
    #[error("Network error after {attempts} attempt(s): {message}")]
    Network { attempts: u32, message: String },

    /// The caller abandoned the request.
    #[error("Request cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// Short machine-friendly category name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Precondition(_) => "precondition",
            AnalysisError::RateLimited { .. } => "rate_limited",
            AnalysisError::Http { .. } => "http_error",
            AnalysisError::EmptyResponse => "empty_response",
            AnalysisError::MalformedStructuredResponse { .. } => "malformed_structured_response",
            AnalysisError::Network { .. } => "network_error",
            AnalysisError::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Error)]
pub enum ArogyaError {
    #[error("Keychain error: {0}")]
    Keychain(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl From<ArogyaError> for String {
    fn from(err: ArogyaError) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = AnalysisError::Http {
            status: 403,
            message: "Permission denied".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error 403: Permission denied");
        assert_eq!(err.kind(), "http_error");
    }

    #[test]
    fn test_analysis_error_converts_to_string() {
        let err: ArogyaError = AnalysisError::EmptyResponse.into();
        let msg: String = err.into();
        assert!(msg.contains("empty response"));
    }
}
