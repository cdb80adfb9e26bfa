//! # Harvest Match
//!
//! Candidate ranking and offer valuation.
//!
//! Both engines are synchronous and side-effect free; the coordinator owns
//! every read and write around them.

pub mod ranker;
pub mod valuation;

pub use ranker::{CandidateExplanation, CandidateRanker, Explainability, RankedCandidate, RankerConfig, Ranking};
pub use valuation::{OfferValuator, Valuation, ValuationConfig, ValuationMethod};
