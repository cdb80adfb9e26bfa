//! Common enums shared across the orchestration crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Procurement program a request is funded by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Program {
    /// School meal supply.
    SchoolFeeding,
    /// Direct public purchase from family farming.
    PublicProcurement,
    /// Any other program.
    Other,
}

impl Program {
    /// Human-readable label in the user-facing language.
    pub fn label(&self) -> &'static str {
        match self {
            Program::SchoolFeeding => "Alimentação Escolar (PNAE)",
            Program::PublicProcurement => "Aquisição de Alimentos (PAA)",
            Program::Other => "Outro programa",
        }
    }
}

/// Status of a request in the fulfillment workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Being edited by the institution.
    Draft,
    /// Submitted, waiting for validation.
    Submitted,
    /// Validated and ready for orchestration.
    Validated,
    /// An orchestration run currently owns the request.
    Orchestrating,
    /// Offers were created and sent to farmers.
    ProposalsSent,
    /// No automatic outcome; a manager has to look at it.
    NeedsReview,
    /// Fulfilled.
    Completed,
    /// Cancelled by the institution.
    Cancelled,
}

impl RequestStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }

    /// Returns true if the request may be orchestrated from this state.
    pub fn accepts_orchestration(&self) -> bool {
        matches!(self, RequestStatus::Validated)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestStatus::Draft => "DRAFT",
            RequestStatus::Submitted => "SUBMITTED",
            RequestStatus::Validated => "VALIDATED",
            RequestStatus::Orchestrating => "ORCHESTRATING",
            RequestStatus::ProposalsSent => "PROPOSALS_SENT",
            RequestStatus::NeedsReview => "NEEDS_REVIEW",
            RequestStatus::Completed => "COMPLETED",
            RequestStatus::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

/// Farmer compliance with the rural-producer registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Active,
    Pending,
    Inactive,
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegistrationStatus::Active => "ACTIVE",
            RegistrationStatus::Pending => "PENDING",
            RegistrationStatus::Inactive => "INACTIVE",
        };
        f.write_str(name)
    }
}

/// Status of an offer sent to a farmer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStatus {
    /// Sent to the farmer, awaiting an answer.
    Sent,
    /// Accepted by the farmer.
    Accepted,
    /// Declined by the farmer.
    Declined,
    /// Not answered in time.
    Expired,
    /// Approved by the institution's manager.
    Approved,
    /// Rejected by the institution's manager.
    Rejected,
}

impl OfferStatus {
    /// Returns true if `next` is a legal transition from this status.
    pub fn can_transition_to(&self, next: OfferStatus) -> bool {
        matches!(
            (self, next),
            (
                OfferStatus::Sent,
                OfferStatus::Accepted | OfferStatus::Declined | OfferStatus::Expired
            ) | (OfferStatus::Accepted, OfferStatus::Approved | OfferStatus::Rejected)
        )
    }
}

/// Category of an uploaded piece of evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidenceScope {
    /// Proof of delivery or of the institution's need.
    Proof,
    /// Scanned document.
    Document,
    /// Photo.
    Photo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_validated_accepts_orchestration() {
        assert!(RequestStatus::Validated.accepts_orchestration());
        assert!(!RequestStatus::Submitted.accepts_orchestration());
        assert!(!RequestStatus::ProposalsSent.accepts_orchestration());
        assert!(!RequestStatus::Orchestrating.accepts_orchestration());
    }

    #[test]
    fn test_offer_transitions() {
        assert!(OfferStatus::Sent.can_transition_to(OfferStatus::Accepted));
        assert!(OfferStatus::Accepted.can_transition_to(OfferStatus::Approved));
        assert!(!OfferStatus::Sent.can_transition_to(OfferStatus::Approved));
        assert!(!OfferStatus::Declined.can_transition_to(OfferStatus::Accepted));
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&RequestStatus::NeedsReview).unwrap();
        assert_eq!(json, "\"NEEDS_REVIEW\"");
        assert_eq!(RequestStatus::ProposalsSent.to_string(), "PROPOSALS_SENT");
    }
}
