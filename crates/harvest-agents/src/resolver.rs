//! Model selection for the text service backend.

use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

/// Ordered list of candidate models plus the one that last worked.
///
/// The last working model is tried first while it is younger than `ttl`.
/// After that, candidates are tried in configured order again.
#[derive(Debug)]
pub struct ModelResolver {
    models: Vec<String>,
    ttl: Duration,
    selected: RwLock<Option<(String, Instant)>>,
}

impl ModelResolver {
    pub fn new(models: Vec<String>, ttl: Duration) -> Self {
        Self {
            models,
            ttl,
            selected: RwLock::new(None),
        }
    }

    /// Configured models, in order.
    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Models to try, in order.
    pub async fn candidates(&self) -> Vec<String> {
        let mut ordered = Vec::with_capacity(self.models.len());

        if let Some(model) = self.selected().await {
            ordered.push(model);
        }

        for model in &self.models {
            if !ordered.contains(model) {
                ordered.push(model.clone());
            }
        }

        ordered
    }

    /// The last working model, if still fresh.
    pub async fn selected(&self) -> Option<String> {
        let selected = self.selected.read().await;
        selected
            .as_ref()
            .filter(|(_, at)| at.elapsed() < self.ttl)
            .map(|(model, _)| model.clone())
    }

    /// Record `model` as the one that last produced text.
    pub async fn remember(&self, model: &str) {
        let mut selected = self.selected.write().await;
        debug!(%model, "selected text model");
        *selected = Some((model.to_string(), Instant::now()));
    }

    /// Forget the cached selection.
    pub async fn invalidate(&self) {
        let mut selected = self.selected.write().await;
        *selected = None;
    }

    /// Forget the cached selection without waiting. Skipped if the lock is busy.
    pub fn invalidate_now(&self) {
        if let Ok(mut selected) = self.selected.try_write() {
            *selected = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(ttl: Duration) -> ModelResolver {
        ModelResolver::new(
            vec!["primary".to_string(), "secondary".to_string(), "tertiary".to_string()],
            ttl,
        )
    }

    #[tokio::test]
    async fn test_configured_order_without_selection() {
        let resolver = resolver(Duration::from_secs(600));
        assert_eq!(resolver.candidates().await, vec!["primary", "secondary", "tertiary"]);
    }

    #[tokio::test]
    async fn test_remembered_model_goes_first() {
        let resolver = resolver(Duration::from_secs(600));
        resolver.remember("tertiary").await;

        assert_eq!(resolver.selected().await.as_deref(), Some("tertiary"));
        assert_eq!(resolver.candidates().await, vec!["tertiary", "primary", "secondary"]);

        resolver.invalidate().await;
        assert_eq!(resolver.candidates().await[0], "primary");
    }

    #[tokio::test]
    async fn test_selection_expires() {
        let resolver = resolver(Duration::ZERO);
        resolver.remember("secondary").await;

        assert_eq!(resolver.selected().await, None);
        assert_eq!(resolver.candidates().await[0], "primary");
    }
}
