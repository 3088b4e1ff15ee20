//! User configuration: endpoint, model, retry policy, response mode.
//!
//! Stored as TOML in the platform config dir. Every field has a default so
//! a missing or partial file is fine. Environment variables override the
//! file; the API key is never stored here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analyzer::OutputShape;
use crate::client::{ClientConfig, RetryPolicy, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::error::ArogyaError;

pub const CONFIG_FILE: &str = "config.toml";
pub const APP_DIR: &str = "arogya";

pub const ENV_ENDPOINT: &str = "AROGYA_ENDPOINT";
pub const ENV_MODEL: &str = "AROGYA_MODEL";
pub const ENV_MAX_ATTEMPTS: &str = "AROGYA_MAX_ATTEMPTS";
/// Checked in order when no key is passed explicitly.
pub const ENV_API_KEYS: [&str; 2] = ["AROGYA_API_KEY", "GEMINI_API_KEY"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub endpoint: String,
    pub model: String,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
    pub request_timeout_secs: u64,
    pub response_mode: OutputShape,
}

impl Default for AppConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_attempts: retry.max_attempts,
            base_delay_ms: retry.base_delay.as_millis() as u64,
            max_delay_ms: retry.max_delay.as_millis() as u64,
            jitter_ms: retry.max_jitter.as_millis() as u64,
            request_timeout_secs: 60,
            response_mode: OutputShape::Text,
        }
    }
}

impl AppConfig {
    /// `<config dir>/arogya/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ArogyaError> {
        if !path.exists() {
            info!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ArogyaError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&raw).map_err(|e| {
            ArogyaError::Config(format!("Invalid config in {}: {}", path.display(), e))
        })?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ArogyaError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ArogyaError::Config(format!("Failed to create config dir: {}", e))
            })?;
        }
        let raw = toml::to_string_pretty(self)
            .map_err(|e| ArogyaError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, raw).map_err(|e| {
            ArogyaError::Config(format!("Failed to write {}: {}", path.display(), e))
        })?;
        info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Apply `AROGYA_*` overrides. `lookup` is `std::env::var(..).ok()` in
    /// the binary.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ArogyaError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_ENDPOINT).filter(|v| !v.is_empty()) {
            self.endpoint = endpoint;
        }
        if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.is_empty()) {
            self.model = model;
        }
        if let Some(attempts) = lookup(ENV_MAX_ATTEMPTS) {
            self.set("max_attempts", &attempts)?;
        }
        Ok(())
    }

    /// Set one field by its TOML key, as `arogya config set` does.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ArogyaError> {
        fn number<N: std::str::FromStr>(key: &str, value: &str) -> Result<N, ArogyaError> {
            value.trim().parse().map_err(|_| {
                ArogyaError::Config(format!("'{}' expects a number, got '{}'", key, value))
            })
        }

        match key {
            "endpoint" => self.endpoint = value.to_string(),
            "model" => self.model = value.to_string(),
            "max_attempts" => {
                let attempts: u32 = number(key, value)?;
                if attempts == 0 {
                    return Err(ArogyaError::Config(
                        "max_attempts must be at least 1".to_string(),
                    ));
                }
                self.max_attempts = attempts;
            }
            "base_delay_ms" => self.base_delay_ms = number(key, value)?,
            "max_delay_ms" => self.max_delay_ms = number(key, value)?,
            "jitter_ms" => self.jitter_ms = number(key, value)?,
            "request_timeout_secs" => self.request_timeout_secs = number(key, value)?,
            "response_mode" => {
                self.response_mode = match value.trim() {
                    "text" => OutputShape::Text,
                    "structured" => OutputShape::Structured,
                    other => {
                        return Err(ArogyaError::Config(format!(
                            "response_mode must be 'text' or 'structured', got '{}'",
                            other
                        )))
                    }
                }
            }
            other => {
                warn!("Unknown config key: {}", other);
                return Err(ArogyaError::Config(format!("Unknown config key: {}", other)));
            }
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_jitter: Duration::from_millis(self.jitter_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn client_config(&self, api_key: Option<String>) -> ClientConfig {
        ClientConfig {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            api_key,
            retry: self.retry_policy(),
        }
    }
}

/// First non-empty API key from the environment.
pub fn api_key_from_env<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    ENV_API_KEYS
        .iter()
        .filter_map(|name| lookup(*name))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}
