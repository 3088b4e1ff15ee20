use anyhow::{Context, Result};
use tracing::info;

use super::AppContext;
use crate::cli::ConfigCommand;
use crate::config::AppConfig;

pub fn run(ctx: &AppContext, command: &ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let rendered =
                toml::to_string_pretty(&ctx.config).context("Failed to render config")?;
            println!("# {}", ctx.config_path.display());
            print!("{}", rendered);
            let key_source = if ctx.api_key().is_some() { "set" } else { "missing" };
            println!("# api key: {}", key_source);
            Ok(())
        }
        ConfigCommand::Set { key, value } => {
            // Edit the file as stored, not the env-overridden view.
            let mut stored = AppConfig::load(&ctx.config_path)?;
            stored.set(key, value)?;
            stored.save(&ctx.config_path)?;
            info!("Set preference: {} = {}", key, value);
            println!("{} = {}", key, value);
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", ctx.config_path.display());
            Ok(())
        }
    }
}
