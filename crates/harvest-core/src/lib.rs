//! # Harvest Core
//!
//! Core domain types for request fulfillment orchestration.
//!
//! This crate provides the shared vocabulary:
//! - [`Request`] - An institution's food supply request
//! - [`Farmer`] - A candidate supplier
//! - [`Offer`] - A priced proposal to a farmer
//! - [`AgentConfig`] - Negotiator and validator settings
//! - [`ValidationAnalysis`] - Evidence checklist verdict
//! - [`HarvestError`] - Error taxonomy

pub mod agent;
pub mod analysis;
pub mod audit;
pub mod error;
pub mod geo;
pub mod offer;
pub mod request;
pub mod types;

// Re-exports for convenience
pub use agent::{AgentConfig, AgentKind, NegotiatorConfig, PricingMode, ValidatorConfig};
pub use analysis::{ChecklistOutcome, ChecklistStatus, ValidationAnalysis, Verdict};
pub use audit::AuditEntry;
pub use error::{HarvestError, Result};
pub use geo::GeoPoint;
pub use offer::{Conversation, Message, MessageAuthor, Offer, OfferItem};
pub use request::{Evidence, Farmer, Municipality, Request, RequestItem};
pub use types::*;
