//! HTTP backend speaking the chat-completions wire format.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use harvest_core::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::resolver::ModelResolver;
use crate::service::{GenerateOptions, ResponseFormat, TextService};

/// Text service backed by an OpenAI-compatible `/chat/completions` endpoint.
///
/// Models from the resolver are tried one after another until one answers
/// with non-empty text.
#[derive(Clone)]
pub struct HttpTextService {
    /// Base URL, without a trailing slash.
    base_url: String,

    /// Bearer token, if the endpoint needs one.
    api_key: Option<String>,

    /// HTTP client.
    http_client: reqwest::Client,

    resolver: Arc<ModelResolver>,

    /// Upper bound for a single model attempt.
    attempt_timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormatBody>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormatBody {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl HttpTextService {
    /// Create a client for `base_url`. Each model attempt is bounded by `attempt_timeout`.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        resolver: Arc<ModelResolver>,
        attempt_timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(attempt_timeout)
            .build()
            .map_err(|e| HarvestError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            http_client,
            resolver,
            attempt_timeout,
        })
    }

    /// Per-attempt timeout that lets all `models` be tried within `operation`.
    ///
    /// Keeps a tenth of the budget in reserve so the caller's own timeout
    /// never fires in the middle of the list.
    pub fn attempt_budget(operation: Duration, models: usize) -> Duration {
        operation * 9 / 10 / models.max(1) as u32
    }

    pub fn resolver(&self) -> &Arc<ModelResolver> {
        &self.resolver
    }

    async fn call_model(
        &self,
        model: &str,
        system: &str,
        user: &str,
        options: &GenerateOptions,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatRequest {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: match options.response_format {
                ResponseFormat::Json => Some(ResponseFormatBody { kind: "json_object" }),
                ResponseFormat::Text => None,
            },
        };

        let mut request = self.http_client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.transport_error(model, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(HarvestError::ExternalService(format!(
                "model {} answered {}: {}",
                model,
                status,
                error_text.chars().take(200).collect::<String>()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| HarvestError::ExternalService(format!("model {} sent an unreadable body: {}", model, e)))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }

    async fn attempt(
        &self,
        model: &str,
        system: &str,
        user: &str,
        options: &GenerateOptions,
    ) -> Result<String> {
        tokio::time::timeout(self.attempt_timeout, self.call_model(model, system, user, options))
            .await
            .unwrap_or_else(|_| Err(self.attempt_timed_out(model)))
    }

    fn attempt_timed_out(&self, model: &str) -> HarvestError {
        HarvestError::Timeout {
            duration_ms: self.attempt_timeout.as_millis() as u64,
            message: format!("model {}", model),
        }
    }

    fn transport_error(&self, model: &str, err: reqwest::Error) -> HarvestError {
        if err.is_timeout() {
            self.attempt_timed_out(model)
        } else {
            HarvestError::ExternalService(format!("model {}: {}", model, err))
        }
    }
}

/// Forgets the cached model if an attempt on it is dropped before it finishes.
struct CachedAttempt<'a> {
    resolver: &'a ModelResolver,
    armed: bool,
}

impl CachedAttempt<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CachedAttempt<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.resolver.invalidate_now();
        }
    }
}

#[async_trait]
impl TextService for HttpTextService {
    async fn generate(&self, system: &str, user: &str, options: &GenerateOptions) -> Result<String> {
        let cached = self.resolver.selected().await;
        let mut last_error = None;

        for model in self.resolver.candidates().await {
            let mut guard = CachedAttempt {
                resolver: self.resolver.as_ref(),
                armed: cached.as_deref() == Some(model.as_str()),
            };
            let outcome = self.attempt(&model, system, user, options).await;
            guard.disarm();

            match outcome {
                Ok(text) if !text.trim().is_empty() => {
                    debug!(%model, chars = text.len(), "text service answered");
                    self.resolver.remember(&model).await;
                    return Ok(text);
                }
                Ok(_) => {
                    warn!(%model, "text service returned empty text");
                    last_error = Some(HarvestError::ExternalService(format!(
                        "model {} returned empty text",
                        model
                    )));
                }
                Err(e) => {
                    warn!(%model, error = %e, "text service call failed");
                    last_error = Some(e);
                }
            }

            if cached.as_deref() == Some(model.as_str()) {
                self.resolver.invalidate().await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            HarvestError::ExternalService("no text models configured".to_string())
        }))
    }
}
