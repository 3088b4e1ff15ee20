//! Terminal front-end commands.

pub mod analyze;
pub mod chat;
pub mod check;
pub mod config;
pub mod keychain;

use std::future::Future;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cli::{Cli, Command, KeyCommand};
use crate::client::GeminiClient;
use crate::config::{api_key_from_env, AppConfig};

/// Resolved settings shared by every command.
pub struct AppContext {
    pub config: AppConfig,
    pub config_path: PathBuf,
    explicit_api_key: Option<String>,
}

impl AppContext {
    /// File config, then environment, then command-line overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = match &cli.config {
            Some(path) => path.clone(),
            None => AppConfig::default_path()
                .context("Could not determine the config directory; pass --config")?,
        };
        let mut config = AppConfig::load(&config_path)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        if let Some(model) = &cli.model {
            config.model = model.clone();
        }
        Ok(Self {
            config,
            config_path,
            explicit_api_key: cli.api_key.clone(),
        })
    }

    /// `--api-key`, then environment, then keychain.
    pub fn api_key(&self) -> Option<String> {
        if let Some(key) = self.explicit_api_key.as_deref().map(str::trim) {
            if !key.is_empty() {
                return Some(key.to_string());
            }
        }
        if let Some(key) = api_key_from_env(|name| std::env::var(name).ok()) {
            return Some(key);
        }
        match keychain::get_api_key() {
            Ok(key) => key,
            Err(e) => {
                warn!("Keychain lookup failed: {}", e);
                None
            }
        }
    }

    pub fn client(&self) -> Result<GeminiClient> {
        let client = GeminiClient::connect(
            self.config.client_config(self.api_key()),
            self.config.request_timeout(),
        )?;
        Ok(client)
    }
}

/// Await `fut`; on Ctrl-C cancel `cancel` and let `fut` wind down.
pub async fn until_interrupted<F: Future>(fut: F, cancel: &CancellationToken) -> F::Output {
    tokio::pin!(fut);
    tokio::select! {
        out = &mut fut => out,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling request");
            cancel.cancel();
            fut.await
        }
    }
}

pub async fn dispatch(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Key(KeyCommand::Set { key }) => keychain_set(key.clone()),
        Command::Key(KeyCommand::Get) => {
            match keychain::get_api_key()? {
                Some(key) => println!("{}", keychain::mask_key(&key)),
                None => println!("No API key stored"),
            }
            Ok(())
        }
        Command::Key(KeyCommand::Delete) => {
            keychain::delete_api_key()?;
            println!("API key removed");
            Ok(())
        }
        Command::Analyze(args) => analyze::run(&AppContext::load(&cli)?, args).await,
        Command::Chat(args) => chat::run(&AppContext::load(&cli)?, args).await,
        Command::Check => check::run(&AppContext::load(&cli)?).await,
        Command::Config(cmd) => config::run(&AppContext::load(&cli)?, cmd),
    }
}

fn keychain_set(key: Option<String>) -> Result<()> {
    let key = match key {
        Some(key) => key,
        None => {
            eprint!("API key: ");
            let mut line = String::new();
            std::io::stdin()
                .read_line(&mut line)
                .context("Failed to read API key from stdin")?;
            line
        }
    };
    keychain::set_api_key(&key)?;
    println!("API key stored");
    Ok(())
}
