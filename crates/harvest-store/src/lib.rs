//! # Harvest Store
//!
//! Collaborator contracts the orchestration core persists through, and
//! in-memory implementations of them.

pub mod audit;
pub mod fixture;
pub mod store;

pub use audit::{record_best_effort, AuditSink, InMemoryAuditLog};
pub use fixture::Fixture;
pub use store::{InMemoryStore, Store};
