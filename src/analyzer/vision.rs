//! Submits an analysis request and shapes the answer.

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::types::{AnalysisRequest, AnalysisResult, OutputShape, RawAssessment, SkinAssessment};
use crate::client::{GeminiClient, Transport};
use crate::error::AnalysisError;

/// Analyze a photo for visible skin conditions.
///
/// A missing image is reported before any network call. In structured mode
/// the answer text is decoded as JSON and range-checked.
pub async fn analyze_image<T: Transport>(
    client: &GeminiClient<T>,
    request: &AnalysisRequest,
    cancel: &CancellationToken,
) -> Result<AnalysisResult, AnalysisError> {
    let generate = request.to_generate_request()?;

    info!(
        "Starting {:?} skin analysis with model '{}'",
        request.output,
        client.model()
    );

    let outcome = match request.output {
        OutputShape::Text => client
            .generate_text(&generate, cancel)
            .await
            .map(|text| AnalysisResult::Text { text }),
        OutputShape::Structured => client
            .generate_structured::<RawAssessment>(&generate, cancel)
            .await
            .and_then(SkinAssessment::try_from)
            .map(AnalysisResult::Assessment),
    };

    match &outcome {
        Ok(AnalysisResult::Assessment(a)) => info!(
            "Analysis complete: '{}' at {}% confidence",
            a.condition, a.confidence
        ),
        Ok(AnalysisResult::Text { text }) => {
            info!("Analysis complete: {} characters of text", text.len())
        }
        Err(e) => error!("Analysis failed ({}): {}", e.kind(), e),
    }

    outcome
}
