use std::path::Path;

use anyhow::{anyhow, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{until_interrupted, AppContext};
use crate::analyzer::{analyze_image, prepare_data_url, prepare_image_file, AnalysisResult, OutputShape};
use crate::cli::AnalyzeArgs;
use crate::flow::{AnalysisFlow, FlowState};

pub async fn run(ctx: &AppContext, args: &AnalyzeArgs) -> Result<()> {
    let output = if args.structured {
        OutputShape::Structured
    } else if args.text {
        OutputShape::Text
    } else {
        ctx.config.response_mode
    };

    let image = if args.image.starts_with("data:") {
        prepare_data_url(&args.image)?
    } else {
        prepare_image_file(Path::new(&args.image))?
    };

    let mut flow = AnalysisFlow::new(output);
    flow.load_image(image)?;
    let request = flow.begin_analysis()?;

    let client = ctx.client()?;
    let cancel = CancellationToken::new();
    if !args.json {
        eprintln!("Analyzing with {}...", client.model());
    }
    let outcome = until_interrupted(analyze_image(&client, &request, &cancel), &cancel).await;
    flow.complete(outcome)?;

    match (flow.state(), flow.result()) {
        (FlowState::ResultReady, Some(result)) => {
            info!("Rendering {:?} result", output);
            if args.json {
                println!("{}", serde_json::to_string_pretty(result)?);
            } else {
                println!("{}", render_result(result));
            }
            Ok(())
        }
        _ => Err(anyhow!(flow
            .error()
            .unwrap_or("Analysis failed")
            .to_string())),
    }
}

/// Human-readable rendering of a result.
pub fn render_result(result: &AnalysisResult) -> String {
    match result {
        AnalysisResult::Text { text } => text.clone(),
        AnalysisResult::Assessment(a) => format!(
            "Condition:  {}\nConfidence: {}%\n\n{}\n\nDisclaimer: {}",
            a.condition, a.confidence, a.description, a.disclaimer
        ),
    }
}
