//! Candidate ranking of farmers against a request.

use std::cmp::Ordering;

use harvest_core::{Farmer, GeoPoint, RegistrationStatus, Request};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Configuration for the ranker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankerConfig {
    /// Score per matched product.
    pub overlap_weight: f64,

    /// Distance (km) beyond which proximity adds nothing.
    pub distance_horizon_km: f64,

    /// Bonus for an ACTIVE registration.
    pub active_bonus: f64,

    /// Bonus for a PENDING registration.
    pub pending_bonus: f64,

    /// Maximum number of candidates selected for offers.
    pub max_selected: usize,

    /// Number of candidates in the explainability projection.
    pub explain_top: usize,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            overlap_weight: 30.0,
            distance_horizon_km: 20.0,
            active_bonus: 10.0,
            pending_bonus: 5.0,
            max_selected: 3,
            explain_top: 5,
        }
    }
}

/// A farmer that can serve at least one requested product.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub farmer: Farmer,

    /// Number of the farmer's products matching a requested product.
    pub overlap: usize,

    /// The farmer's products that matched, in catalog order.
    pub matched_products: Vec<String>,

    /// Great-circle distance to the request point, if both points are known.
    pub distance_km: Option<f64>,

    pub registration_bonus: f64,

    pub proximity_bonus: f64,

    pub score: f64,
}

/// Ordered candidates for one request. Never contains a zero-overlap farmer.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    candidates: Vec<RankedCandidate>,
    requested_products: usize,
}

impl Ranking {
    /// Candidates in descending score order.
    pub fn candidates(&self) -> &[RankedCandidate] {
        &self.candidates
    }

    /// True when no farmer can serve the request.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }
}

/// Read-only ranked summary of the top candidates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Explainability {
    pub candidates: Vec<CandidateExplanation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateExplanation {
    pub farmer_id: Uuid,
    pub name: String,
    pub score: f64,
    pub distance_km: Option<f64>,
    pub reasons: Vec<String>,
    pub products: Vec<String>,
}

/// Scores and filters farmers for a request.
#[derive(Debug, Clone, Default)]
pub struct CandidateRanker {
    config: RankerConfig,
}

impl CandidateRanker {
    /// Create a ranker with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ranker with custom configuration.
    pub fn with_config(config: RankerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Rank `farmers` for `request`.
    ///
    /// `reference` is the point distances are measured from (the request's own
    /// location or its municipality centroid). Farmers with no matching product
    /// are dropped. Ties keep farmer id order.
    pub fn rank(&self, request: &Request, reference: Option<GeoPoint>, farmers: &[Farmer]) -> Ranking {
        let requested: Vec<String> = request
            .items
            .iter()
            .map(|item| normalize(&item.product_name))
            .collect();

        let mut roster: Vec<&Farmer> = farmers.iter().collect();
        roster.sort_by_key(|farmer| farmer.id);

        let mut candidates: Vec<RankedCandidate> = roster
            .into_iter()
            .filter_map(|farmer| self.score_farmer(farmer, &requested, reference))
            .collect();

        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        debug!(
            request_id = %request.id,
            roster = farmers.len(),
            candidates = candidates.len(),
            "ranked farmers"
        );

        Ranking {
            candidates,
            requested_products: request.items.len(),
        }
    }

    /// Score a single farmer, or `None` if it grows nothing requested.
    fn score_farmer(
        &self,
        farmer: &Farmer,
        requested: &[String],
        reference: Option<GeoPoint>,
    ) -> Option<RankedCandidate> {
        let matched_products: Vec<String> = farmer
            .products
            .iter()
            .filter(|product| requested.contains(&normalize(product)))
            .cloned()
            .collect();

        let overlap = matched_products.len();
        if overlap == 0 {
            return None;
        }

        let distance_km = match (reference, farmer.location) {
            (Some(from), Some(to)) => Some(from.distance_km(&to)),
            _ => None,
        };
        let registration_bonus = self.registration_bonus(farmer.registration);
        let proximity_bonus = self.proximity_bonus(distance_km);

        Some(RankedCandidate {
            farmer: farmer.clone(),
            overlap,
            matched_products,
            distance_km,
            registration_bonus,
            proximity_bonus,
            score: self.score(overlap, farmer.registration, distance_km),
        })
    }

    /// `overlap * weight + registration bonus + max(0, horizon - distance)`.
    pub fn score(&self, overlap: usize, registration: RegistrationStatus, distance_km: Option<f64>) -> f64 {
        overlap as f64 * self.config.overlap_weight
            + self.registration_bonus(registration)
            + self.proximity_bonus(distance_km)
    }

    fn registration_bonus(&self, registration: RegistrationStatus) -> f64 {
        match registration {
            RegistrationStatus::Active => self.config.active_bonus,
            RegistrationStatus::Pending => self.config.pending_bonus,
            RegistrationStatus::Inactive => 0.0,
        }
    }

    fn proximity_bonus(&self, distance_km: Option<f64>) -> f64 {
        distance_km
            .map(|d| (self.config.distance_horizon_km - d).max(0.0))
            .unwrap_or(0.0)
    }

    /// Candidates to create offers for.
    ///
    /// With `farmer_ids`, keeps only ranked candidates whose id is listed
    /// (ranking order is preserved). Capped at `max_selected`.
    pub fn select<'a>(&self, ranking: &'a Ranking, farmer_ids: Option<&[Uuid]>) -> Vec<&'a RankedCandidate> {
        ranking
            .candidates
            .iter()
            .filter(|candidate| match farmer_ids {
                Some(ids) if !ids.is_empty() => ids.contains(&candidate.farmer.id),
                _ => true,
            })
            .take(self.config.max_selected)
            .collect()
    }

    /// Top candidates with human-readable reasons.
    pub fn explain(&self, ranking: &Ranking) -> Explainability {
        let candidates = ranking
            .candidates
            .iter()
            .take(self.config.explain_top)
            .map(|candidate| CandidateExplanation {
                farmer_id: candidate.farmer.id,
                name: candidate.farmer.name.clone(),
                score: candidate.score,
                distance_km: candidate.distance_km,
                reasons: self.reasons(candidate, ranking.requested_products),
                products: candidate.farmer.products.clone(),
            })
            .collect();

        Explainability { candidates }
    }

    fn reasons(&self, candidate: &RankedCandidate, requested_products: usize) -> Vec<String> {
        let mut reasons = vec![format!(
            "Grows {} of {} requested products ({})",
            candidate.overlap,
            requested_products,
            candidate.matched_products.join(", ")
        )];

        reasons.push(format!(
            "Registration {} (+{:.0})",
            candidate.farmer.registration, candidate.registration_bonus
        ));

        match candidate.distance_km {
            Some(d) => reasons.push(format!(
                "{:.1} km from the delivery point (+{:.1})",
                d, candidate.proximity_bonus
            )),
            None => reasons.push("Distance unknown (no proximity bonus)".to_string()),
        }

        reasons
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
