//! Orchestration coordinator.
//!
//! Sequences ranking, valuation and message generation for a request,
//! persists the offers and their conversations, and runs evidence validation
//! on demand.

use std::sync::Arc;
use std::time::Duration;

use harvest_agents::{
    EvidenceValidator, GeneratedMessage, MessageGenerator, OfferContext, TextService,
};
use harvest_core::audit::{actions, NO_CANDIDATES_REASON};
use harvest_core::{
    AgentConfig, AuditEntry, Conversation, HarvestError, NegotiatorConfig, Offer, OfferStatus,
    Request, RequestStatus, Result, ValidationAnalysis,
};
use harvest_match::{CandidateRanker, Explainability, OfferValuator, RankedCandidate, Ranking};
use harvest_store::{record_best_effort, AuditSink, Store};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Outcome of an orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub offers: Vec<Offer>,
    pub explainability: Explainability,
    /// Absent when no farmer could serve the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
}

/// Drives a request from VALIDATED to PROPOSALS_SENT or NEEDS_REVIEW.
pub struct Coordinator {
    store: Arc<dyn Store>,
    audit: Arc<dyn AuditSink>,
    ranker: CandidateRanker,
    valuator: OfferValuator,
    messages: MessageGenerator,
    validator: EvidenceValidator,
    text_service_enabled: bool,
}

impl Coordinator {
    /// Create a coordinator with default ranking, pricing and timeouts.
    pub fn new(
        store: Arc<dyn Store>,
        audit: Arc<dyn AuditSink>,
        text_service: Arc<dyn TextService>,
    ) -> Self {
        Self {
            store,
            audit,
            ranker: CandidateRanker::new(),
            valuator: OfferValuator::new(),
            text_service_enabled: text_service.is_enabled(),
            messages: MessageGenerator::new(text_service.clone()),
            validator: EvidenceValidator::new(text_service),
        }
    }

    /// Whether messages and validations can reach a text service at all.
    pub fn text_service_enabled(&self) -> bool {
        self.text_service_enabled
    }

    /// Per-call timeouts for message generation and evidence validation.
    pub fn with_timeouts(mut self, message: Duration, validation: Duration) -> Self {
        self.messages = self.messages.with_timeout(message);
        self.validator = self.validator.with_timeout(validation);
        self
    }

    /// Create offers for the best candidates of a VALIDATED request.
    ///
    /// When `farmer_ids` is given, only ranked candidates in that list are
    /// offered. A request nobody can serve moves to NEEDS_REVIEW and yields an
    /// empty result.
    pub async fn orchestrate(
        &self,
        request_id: Uuid,
        started_by: Uuid,
        agent_config_id: Option<Uuid>,
        farmer_ids: Option<&[Uuid]>,
    ) -> Result<OrchestrationResult> {
        let request = self.load_request(request_id).await?;

        if !request.status.accepts_orchestration() {
            return Err(HarvestError::InvalidStatus {
                request_id,
                expected: RequestStatus::Validated,
                actual: request.status,
            });
        }

        let negotiator = match agent_config_id {
            Some(config_id) => {
                let config = self.usable_agent_config(config_id, &request).await?;
                let negotiator = config.as_negotiator().cloned().ok_or_else(|| {
                    HarvestError::AgentConfigRejected {
                        config_id,
                        reason: format!("is a {} agent, expected NEGOTIATOR", config.kind.name()),
                    }
                })?;
                Some(negotiator)
            }
            None => None,
        };

        let ranking = self.rank(&request).await?;

        if ranking.is_empty() {
            return self.mark_needs_review(&request, started_by).await;
        }

        let selected = self.ranker.select(&ranking, farmer_ids);
        if selected.is_empty() {
            return Err(HarvestError::InvalidInput(
                "none of the requested farmers is a compatible candidate".to_string(),
            ));
        }

        let explainability = self.ranker.explain(&ranking);

        if !self
            .store
            .transition_request_status(request_id, RequestStatus::Validated, RequestStatus::Orchestrating)
            .await?
        {
            return Err(self.status_conflict(request_id).await);
        }

        let run_id = Uuid::new_v4();
        info!(
            request_id = %request_id,
            run_id = %run_id,
            candidates = ranking.len(),
            selected = selected.len(),
            "🧺 Orchestration started"
        );

        let offers = match self
            .create_offers(&request, &selected, negotiator.as_ref(), run_id, started_by)
            .await
        {
            Ok(offers) => offers,
            Err(e) => {
                error!(request_id = %request_id, run_id = %run_id, error = %e, "❌ Orchestration failed");
                self.release(request_id, run_id).await;
                return Err(e);
            }
        };

        info!(
            request_id = %request_id,
            run_id = %run_id,
            offers = offers.len(),
            "✅ Proposals sent"
        );

        Ok(OrchestrationResult {
            offers,
            explainability,
            run_id: Some(run_id),
        })
    }

    /// Ranking preview. Changes nothing.
    pub async fn analyze(&self, request_id: Uuid) -> Result<Explainability> {
        let request = self.load_request(request_id).await?;
        let ranking = self.rank(&request).await?;
        Ok(self.ranker.explain(&ranking))
    }

    /// Validate a request's evidence with a VALIDATOR agent configuration.
    /// Advisory only: the request status is left untouched.
    pub async fn validate_evidence(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
        agent_config_id: Uuid,
    ) -> Result<ValidationAnalysis> {
        let request = self.load_request(request_id).await?;
        let config = self.usable_agent_config(agent_config_id, &request).await?;
        let validator = config.as_validator().ok_or_else(|| HarvestError::AgentConfigRejected {
            config_id: agent_config_id,
            reason: format!("is a {} agent, expected VALIDATOR", config.kind.name()),
        })?;

        let checklist = validator.effective_checklist();
        let outcome = self.validator.validate(&request, &checklist).await;

        info!(
            request_id = %request_id,
            verdict = ?outcome.analysis.verdict,
            confidence = outcome.analysis.confidence,
            fallback = outcome.analysis.fallback,
            "🔎 Evidence validated"
        );

        self.audit(AuditEntry::new(
            actor_id,
            actions::EVIDENCE_VALIDATED,
            "Request",
            request_id,
            json!({
                "agent_config_id": agent_config_id,
                "verdict": outcome.analysis.verdict,
                "confidence": outcome.analysis.confidence,
                "fallback": outcome.analysis.fallback,
                "attempts": outcome.attempts,
                "diagnostic": outcome.diagnostic,
            }),
        ))
        .await;

        Ok(outcome.analysis)
    }

    /// Offers created for a request, oldest first.
    pub async fn offers(&self, request_id: Uuid) -> Result<Vec<Offer>> {
        self.load_request(request_id).await?;
        self.store.offers_for_request(request_id).await
    }

    async fn create_offers(
        &self,
        request: &Request,
        selected: &[&RankedCandidate],
        negotiator: Option<&NegotiatorConfig>,
        run_id: Uuid,
        started_by: Uuid,
    ) -> Result<Vec<Offer>> {
        let mut offers = Vec::with_capacity(selected.len());
        let mut sources = Vec::with_capacity(selected.len());

        // One external call per farmer, one at a time.
        for candidate in selected {
            let (offer, message) = self
                .create_offer(request, candidate, negotiator, run_id, started_by)
                .await?;
            sources.push(message.source);
            offers.push(offer);
        }

        self.store
            .update_request_status(request.id, RequestStatus::ProposalsSent)
            .await?;

        self.audit(AuditEntry::new(
            started_by,
            actions::REQUEST_ORCHESTRATED,
            "Request",
            request.id,
            json!({
                "run_id": run_id,
                "offer_ids": offers.iter().map(|o| o.id).collect::<Vec<_>>(),
                "message_sources": sources,
            }),
        ))
        .await;

        Ok(offers)
    }

    async fn create_offer(
        &self,
        request: &Request,
        candidate: &RankedCandidate,
        negotiator: Option<&NegotiatorConfig>,
        run_id: Uuid,
        started_by: Uuid,
    ) -> Result<(Offer, GeneratedMessage)> {
        let farmer = &candidate.farmer;
        let valuation = self
            .valuator
            .value(&request.items, negotiator.map(|n| &n.pricing));

        let message = self
            .messages
            .generate(&OfferContext {
                farmer,
                request,
                market_value: valuation.market_value,
                proposed_value: valuation.proposed_value,
                negotiator,
            })
            .await;

        let offer = Offer::new(request.id, farmer.id, run_id, &request.items)
            .with_values(valuation.market_value, valuation.proposed_value)
            .with_distance(candidate.distance_km);

        let offer = self.store.create_offer(offer).await?;
        self.store
            .create_conversation(Conversation::seeded(&offer, message.text.clone()))
            .await?;

        info!(
            request_id = %request.id,
            farmer_id = %farmer.id,
            offer_id = %offer.id,
            proposed_value = offer.proposed_value,
            "📨 Offer sent"
        );

        self.audit(AuditEntry::new(
            started_by,
            actions::OFFER_CREATED,
            "Offer",
            offer.id,
            json!({
                "request_id": request.id,
                "farmer_id": farmer.id,
                "run_id": run_id,
                "market_value": valuation.market_value,
                "proposed_value": valuation.proposed_value,
                "valuation_method": valuation.method,
                "message_source": message.source,
            }),
        ))
        .await;

        Ok((offer, message))
    }

    async fn mark_needs_review(
        &self,
        request: &Request,
        started_by: Uuid,
    ) -> Result<OrchestrationResult> {
        if !self
            .store
            .transition_request_status(request.id, RequestStatus::Validated, RequestStatus::NeedsReview)
            .await?
        {
            return Err(self.status_conflict(request.id).await);
        }

        warn!(request_id = %request.id, "⚠️ No compatible farmer, request needs review");

        self.audit(AuditEntry::new(
            started_by,
            actions::REQUEST_NEEDS_REVIEW,
            "Request",
            request.id,
            json!({ "reason": NO_CANDIDATES_REASON }),
        ))
        .await;

        Ok(OrchestrationResult {
            offers: Vec::new(),
            explainability: Explainability::default(),
            run_id: None,
        })
    }

    async fn rank(&self, request: &Request) -> Result<Ranking> {
        let municipality = self.store.municipality(request.municipality_id).await?;
        let farmers = self
            .store
            .farmers_in_municipality(request.municipality_id)
            .await?;
        let reference = request.reference_point(municipality.as_ref());

        Ok(self.ranker.rank(request, reference, &farmers))
    }

    async fn load_request(&self, request_id: Uuid) -> Result<Request> {
        self.store
            .request(request_id)
            .await?
            .ok_or_else(|| HarvestError::not_found("Request", request_id))
    }

    /// An existing, active configuration owned by the request's institution.
    async fn usable_agent_config(&self, config_id: Uuid, request: &Request) -> Result<AgentConfig> {
        let config = self
            .store
            .agent_config(config_id)
            .await?
            .ok_or_else(|| HarvestError::not_found("AgentConfig", config_id))?;

        let reason = if !config.active {
            Some("is inactive")
        } else if config.institution_id != request.institution_id {
            Some("belongs to another institution")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(HarvestError::AgentConfigRejected {
                config_id,
                reason: reason.to_string(),
            }),
            None => Ok(config),
        }
    }

    /// Error for a lost compare-and-set on the request status.
    async fn status_conflict(&self, request_id: Uuid) -> HarvestError {
        let actual = match self.store.request(request_id).await {
            Ok(Some(request)) => request.status,
            _ => RequestStatus::Orchestrating,
        };
        HarvestError::InvalidStatus {
            request_id,
            expected: RequestStatus::Validated,
            actual,
        }
    }

    /// Best-effort cleanup after a failed run: expires the offers the run
    /// already wrote and returns the request to VALIDATED.
    async fn release(&self, request_id: Uuid, run_id: Uuid) {
        match self.store.offers_for_request(request_id).await {
            Ok(offers) => {
                for offer in offers.iter().filter(|o| o.run_id == run_id && o.status == OfferStatus::Sent) {
                    if let Err(e) = self.store.update_offer_status(offer.id, OfferStatus::Expired).await {
                        error!(offer_id = %offer.id, run_id = %run_id, error = %e, "could not expire offer");
                    }
                }
            }
            Err(e) => {
                error!(request_id = %request_id, run_id = %run_id, error = %e, "could not list offers of failed run");
            }
        }

        if let Err(e) = self
            .store
            .transition_request_status(request_id, RequestStatus::Orchestrating, RequestStatus::Validated)
            .await
        {
            error!(request_id = %request_id, error = %e, "could not release request");
        }
    }

    async fn audit(&self, entry: AuditEntry) {
        record_best_effort(self.audit.as_ref(), entry).await;
    }
}
