//! Error types for request fulfillment orchestration.

use thiserror::Error;
use uuid::Uuid;

use crate::types::RequestStatus;

/// Main error type for orchestration operations.
#[derive(Error, Debug, Clone)]
pub enum HarvestError {
    /// Resource not found.
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    /// The request is not in the status the operation requires.
    #[error("Request {request_id} is {actual}, expected {expected}")]
    InvalidStatus {
        request_id: Uuid,
        expected: RequestStatus,
        actual: RequestStatus,
    },

    /// An agent configuration cannot be used for this operation.
    #[error("Agent config {config_id} rejected: {reason}")]
    AgentConfigRejected { config_id: Uuid, reason: String },

    /// Caller-supplied input is unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The generative text service call failed.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Operation timed out.
    #[error("Operation timed out after {duration_ms}ms: {message}")]
    Timeout { duration_ms: u64, message: String },

    /// Storage collaborator failure.
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error (should not happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HarvestError {
    /// Shorthand for a [`HarvestError::NotFound`].
    pub fn not_found(resource_type: &str, id: impl ToString) -> Self {
        HarvestError::NotFound {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        }
    }

    /// Shorthand for a [`HarvestError::Persistence`].
    pub fn persistence(message: impl Into<String>) -> Self {
        HarvestError::Persistence {
            message: message.into(),
        }
    }

    /// Returns true for errors caused by the caller's input. These are never retried.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            HarvestError::NotFound { .. }
                | HarvestError::InvalidStatus { .. }
                | HarvestError::AgentConfigRejected { .. }
                | HarvestError::InvalidInput(_)
        )
    }

    /// Stable snake_case name of the error kind, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            HarvestError::NotFound { .. } => "not_found",
            HarvestError::InvalidStatus { .. } => "invalid_status",
            HarvestError::AgentConfigRejected { .. } => "agent_config_rejected",
            HarvestError::InvalidInput(_) => "invalid_input",
            HarvestError::ExternalService(_) => "external_service",
            HarvestError::Timeout { .. } => "timeout",
            HarvestError::Persistence { .. } => "persistence",
            HarvestError::SerializationError(_) => "serialization",
            HarvestError::Internal(_) => "internal",
        }
    }
}

/// Convenience Result type for orchestration operations.
pub type Result<T> = std::result::Result<T, HarvestError>;

impl From<serde_json::Error> for HarvestError {
    fn from(err: serde_json::Error) -> Self {
        HarvestError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors() {
        let err = HarvestError::not_found("Request", Uuid::nil());
        assert!(err.is_input_error());
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_external_errors_are_not_input_errors() {
        let err = HarvestError::Timeout {
            duration_ms: 12_000,
            message: "generate".to_string(),
        };
        assert!(!err.is_input_error());
        assert_eq!(err.kind(), "timeout");
        assert!(!HarvestError::persistence("disk full").is_input_error());
    }

    #[test]
    fn test_invalid_status_message() {
        let request_id = Uuid::new_v4();
        let err = HarvestError::InvalidStatus {
            request_id,
            expected: RequestStatus::Validated,
            actual: RequestStatus::Draft,
        };
        assert!(err.to_string().contains(&request_id.to_string()));
        assert!(err.to_string().contains("DRAFT"));
        assert!(err.to_string().contains("VALIDATED"));
    }
}
