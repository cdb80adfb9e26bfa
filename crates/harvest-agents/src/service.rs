//! Contract for the external generative text service.

use async_trait::async_trait;
use harvest_core::{HarvestError, Result};
use serde::{Deserialize, Serialize};

/// Shape the caller would like the answer in. A hint only; output is untrusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// Per-call generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub response_format: ResponseFormat,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerateOptions {
    /// Settings for natural prose.
    pub fn prose() -> Self {
        Self {
            response_format: ResponseFormat::Text,
            temperature: 0.7,
            max_tokens: 400,
        }
    }

    /// Settings for a strict, single-line JSON answer.
    pub fn json() -> Self {
        Self {
            response_format: ResponseFormat::Json,
            temperature: 0.1,
            max_tokens: 800,
        }
    }
}

/// A generative text service.
///
/// Implementations may fail, time out or return empty text. Callers must treat
/// whatever comes back as untrusted.
#[async_trait]
pub trait TextService: Send + Sync {
    async fn generate(&self, system: &str, user: &str, options: &GenerateOptions) -> Result<String>;

    /// False when every call is known to fail without reaching a backend.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Stand-in used when no service is configured. Every call fails.
#[derive(Debug, Clone, Default)]
pub struct DisabledTextService;

#[async_trait]
impl TextService for DisabledTextService {
    async fn generate(&self, _system: &str, _user: &str, _options: &GenerateOptions) -> Result<String> {
        Err(HarvestError::ExternalService(
            "text service is not configured".to_string(),
        ))
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_service_fails() {
        let result = DisabledTextService
            .generate("system", "user", &GenerateOptions::prose())
            .await;
        assert!(matches!(result, Err(HarvestError::ExternalService(_))));
        assert!(!DisabledTextService.is_enabled());
    }

    #[test]
    fn test_option_presets() {
        assert_eq!(GenerateOptions::json().response_format, ResponseFormat::Json);
        assert!(GenerateOptions::prose().temperature > GenerateOptions::json().temperature);
    }
}
