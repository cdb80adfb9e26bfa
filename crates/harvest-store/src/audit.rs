//! Audit sink contract.
//!
//! Audit recording is best-effort: a failing sink must never abort the
//! operation being audited. Callers go through [`record_best_effort`], which
//! logs and swallows sink errors.

use std::sync::Arc;

use async_trait::async_trait;
use harvest_core::{AuditEntry, Result};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Receives audit entries.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> Result<()>;
}

/// Record `entry`, logging a warning instead of failing.
pub async fn record_best_effort(sink: &dyn AuditSink, entry: AuditEntry) {
    let action = entry.action.clone();
    let entity_id = entry.entity_id;

    if let Err(e) = sink.record(entry).await {
        warn!(
            action = %action,
            entity_id = %entity_id,
            error = %e,
            "audit entry dropped"
        );
    }
}

/// Keeps entries in memory and mirrors them to the log.
#[derive(Clone, Default)]
pub struct InMemoryAuditLog {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries, oldest first.
    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }

    /// Entries with the given action.
    pub async fn with_action(&self, action: &str) -> Vec<AuditEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        info!(
            target: "audit",
            actor_id = %entry.actor_id,
            action = %entry.action,
            entity_type = %entry.entity_type,
            entity_id = %entry.entity_id,
            "📝 {}",
            entry.action
        );
        self.entries.write().await.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::audit::actions;
    use harvest_core::HarvestError;
    use serde_json::json;
    use uuid::Uuid;

    struct BrokenSink;

    #[async_trait]
    impl AuditSink for BrokenSink {
        async fn record(&self, _entry: AuditEntry) -> Result<()> {
            Err(HarvestError::persistence("audit table locked"))
        }
    }

    fn entry(action: &str) -> AuditEntry {
        AuditEntry::new(Uuid::new_v4(), action, "Request", Uuid::new_v4(), json!({}))
    }

    #[tokio::test]
    async fn test_log_keeps_order() {
        let log = InMemoryAuditLog::new();
        log.record(entry(actions::OFFER_CREATED)).await.unwrap();
        log.record(entry(actions::REQUEST_ORCHESTRATED)).await.unwrap();

        let entries = log.entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, actions::OFFER_CREATED);
        assert_eq!(log.with_action(actions::REQUEST_ORCHESTRATED).await.len(), 1);
    }

    #[tokio::test]
    async fn test_best_effort_swallows_errors() {
        record_best_effort(&BrokenSink, entry(actions::OFFER_CREATED)).await;
    }
}
