//! Node configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

/// Runtime configuration of the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// HTTP listen address.
    pub bind_addr: SocketAddr,

    /// Log filter used when `RUST_LOG` is unset.
    pub log_filter: String,

    /// JSON fixture loaded into the store at startup.
    pub seed_file: Option<PathBuf>,

    pub text_service: TextServiceConfig,

    /// Per-call timeout for outreach messages.
    pub message_timeout_ms: u64,

    /// Per-call timeout for evidence validation.
    pub validation_timeout_ms: u64,
}

/// Generative text service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextServiceConfig {
    /// OpenAI-compatible base URL. `None` disables the service.
    pub url: Option<String>,
    pub api_key: Option<String>,
    /// Ordered fallback list of model ids.
    pub models: Vec<String>,
    pub model_ttl_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_filter: "info".to_string(),
            seed_file: None,
            text_service: TextServiceConfig::default(),
            message_timeout_ms: 12_000,
            validation_timeout_ms: 20_000,
        }
    }
}

impl Default for TextServiceConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            models: vec!["gpt-4o-mini".to_string()],
            model_ttl_secs: 600,
        }
    }
}

impl NodeConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    /// Unset or blank variables keep their defaults; malformed ones are errors.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        if let Some(addr) = var("HARVEST_BIND_ADDR") {
            config.bind_addr = parse("HARVEST_BIND_ADDR", &addr)?;
        }
        if let Some(filter) = var("HARVEST_LOG") {
            config.log_filter = filter;
        }
        config.seed_file = var("HARVEST_SEED_FILE").map(PathBuf::from);

        config.text_service.url = var("TEXT_SERVICE_URL");
        config.text_service.api_key = var("TEXT_SERVICE_API_KEY");
        if let Some(models) = var("TEXT_SERVICE_MODELS") {
            let models: Vec<String> = models
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
            if models.is_empty() {
                return Err(anyhow!("TEXT_SERVICE_MODELS lists no model"));
            }
            config.text_service.models = models;
        }
        if let Some(ttl) = var("TEXT_SERVICE_MODEL_TTL_SECS") {
            config.text_service.model_ttl_secs = parse("TEXT_SERVICE_MODEL_TTL_SECS", &ttl)?;
        }

        if let Some(ms) = var("MESSAGE_TIMEOUT_MS") {
            config.message_timeout_ms = parse("MESSAGE_TIMEOUT_MS", &ms)?;
        }
        if let Some(ms) = var("VALIDATION_TIMEOUT_MS") {
            config.validation_timeout_ms = parse("VALIDATION_TIMEOUT_MS", &ms)?;
        }

        Ok(config)
    }

    pub fn message_timeout(&self) -> Duration {
        Duration::from_millis(self.message_timeout_ms)
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_millis(self.validation_timeout_ms)
    }
}

impl TextServiceConfig {
    pub fn model_ttl(&self) -> Duration {
        Duration::from_secs(self.model_ttl_secs)
    }
}

fn parse<T>(key: &str, value: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("invalid value for {}: {:?}", key, value))
}
