use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    arogya::run().await
}
