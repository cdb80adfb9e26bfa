//! Audit trail entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known audit action names.
pub mod actions {
    pub const OFFER_CREATED: &str = "offer.created";
    pub const REQUEST_ORCHESTRATED: &str = "request.orchestrated";
    pub const REQUEST_NEEDS_REVIEW: &str = "request.needs_review";
    pub const EVIDENCE_VALIDATED: &str = "evidence.validated";
}

/// Reason recorded when no farmer can serve a request.
pub const NO_CANDIDATES_REASON: &str = "no compatible farmer found";

/// A single audit record. Write-only from the core's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub details: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor_id: Uuid,
        action: &str,
        entity_type: &str,
        entity_id: Uuid,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            details,
            recorded_at: Utc::now(),
        }
    }
}
