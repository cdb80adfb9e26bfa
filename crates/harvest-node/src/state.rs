//! Application state.

use std::sync::Arc;

use anyhow::Context;
use harvest_agents::{DisabledTextService, HttpTextService, ModelResolver, TextService};
use harvest_store::{AuditSink, Store};
use tracing::{info, warn};

use crate::config::NodeConfig;
use crate::coordinator::Coordinator;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The orchestration coordinator.
    pub coordinator: Arc<Coordinator>,
}

impl AppState {
    /// Wrap an already built coordinator.
    pub fn new(coordinator: Coordinator) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
        }
    }

    /// Build the state from configuration and storage collaborators.
    pub fn from_config(
        config: &NodeConfig,
        store: Arc<dyn Store>,
        audit: Arc<dyn AuditSink>,
    ) -> anyhow::Result<Self> {
        let text_service = text_service(config)?;
        let coordinator = Coordinator::new(store, audit, text_service)
            .with_timeouts(config.message_timeout(), config.validation_timeout());
        Ok(Self::new(coordinator))
    }
}

fn text_service(config: &NodeConfig) -> anyhow::Result<Arc<dyn TextService>> {
    let settings = &config.text_service;

    let Some(url) = settings.url.as_deref() else {
        warn!("TEXT_SERVICE_URL is not set, messages and validations use deterministic fallbacks");
        return Ok(Arc::new(DisabledTextService));
    };

    let resolver = Arc::new(ModelResolver::new(settings.models.clone(), settings.model_ttl()));
    // Every model in the list must get its turn before the shorter operation
    // timeout cancels the call.
    let operation = config.message_timeout().min(config.validation_timeout());
    let per_attempt = HttpTextService::attempt_budget(operation, settings.models.len());
    let service = HttpTextService::new(url, settings.api_key.clone(), resolver, per_attempt)
        .context("building text service client")?;

    info!(url = %url, models = ?settings.models, "🤖 Text service configured");
    Ok(Arc::new(service))
}
