use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;

use super::{until_interrupted, AppContext};
use crate::diagnostics::{check_api, ApiStatus};

pub async fn run(ctx: &AppContext) -> Result<()> {
    let client = ctx.client()?;
    let cancel = CancellationToken::new();

    println!("{}", status_line(ApiStatus::Pending, client.model()));
    let report = until_interrupted(check_api(&client, &cancel), &cancel).await;
    println!("{}", status_line(report.status, &report.model));

    match report.status {
        ApiStatus::Success => {
            println!("{}", report.message);
            Ok(())
        }
        _ => bail!("{}", report.message),
    }
}

pub fn status_line(status: ApiStatus, model: &str) -> String {
    match status {
        ApiStatus::Untested => "API Status: Untested".to_string(),
        ApiStatus::Pending => "API Status: Checking...".to_string(),
        ApiStatus::Success => format!("API Status: Connected ({} OK)", model),
        ApiStatus::Failed => "API Status: Failed. See error details.".to_string(),
    }
}
