use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "arogya",
    version,
    about = "Informational, non-diagnostic skin photo analysis and chat"
)]
pub struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API key; overrides AROGYA_API_KEY / GEMINI_API_KEY and the keychain
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Model name, e.g. gemini-2.5-flash
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze a photo for visible skin conditions
    Analyze(AnalyzeArgs),
    /// Chat with the assistant
    Chat(ChatArgs),
    /// Check that the model and key work
    Check,
    /// Manage the API key stored in the OS keychain
    #[command(subcommand)]
    Key(KeyCommand),
    /// Show or change configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Image file, or a `data:image/...;base64,` URL
    pub image: String,

    /// Ask for condition/confidence/description/disclaimer fields
    #[arg(long, conflicts_with = "text")]
    pub structured: bool,

    /// Ask for a free-text answer
    #[arg(long)]
    pub text: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Send one message and exit instead of starting a conversation
    #[arg(short, long)]
    pub message: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum KeyCommand {
    /// Store a key (read from stdin when omitted)
    Set { key: Option<String> },
    /// Show a masked preview of the stored key
    Get,
    /// Remove the stored key
    Delete,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Set one value in the config file
    Set { key: String, value: String },
    /// Print the config file location
    Path,
}
