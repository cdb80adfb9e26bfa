//! # Harvest Agents
//!
//! The two agents that talk to the external generative text service:
//! - [`MessageGenerator`] - outreach messages for selected farmers
//! - [`EvidenceValidator`] - checklist verdicts over request evidence
//!
//! Both degrade to deterministic output when the service misbehaves.

pub mod evidence;
pub mod extract;
pub mod http;
pub mod message;
pub mod resolver;
pub mod service;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use evidence::{EvidenceValidator, ValidationOutcome};
pub use extract::ResponseDefect;
pub use http::HttpTextService;
pub use message::{GeneratedMessage, MessageGenerator, MessageSource, OfferContext};
pub use resolver::ModelResolver;
pub use service::{DisabledTextService, GenerateOptions, ResponseFormat, TextService};
