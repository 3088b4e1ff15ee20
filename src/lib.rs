pub mod analyzer;
pub mod chat;
pub mod cli;
pub mod client;
mod commands;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod flow;

use std::process::ExitCode;

use clap::Parser;

pub use analyzer::{analyze_image, AnalysisRequest, AnalysisResult, OutputShape, SkinAssessment};
pub use chat::{ChatMessage, ChatSession, Speaker};
pub use client::{ClientConfig, GeminiClient, RetryPolicy};
pub use error::{AnalysisError, ArogyaError};
pub use flow::{AnalysisFlow, FlowState};

pub async fn run() -> ExitCode {
    let cli = cli::Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match commands::dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
