//! Request orchestration endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use harvest_core::{Offer, ValidationAnalysis};
use harvest_match::Explainability;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::coordinator::OrchestrationResult;
use crate::state::AppState;

/// Body of an orchestration call.
#[derive(Debug, Serialize, Deserialize)]
pub struct OrchestrateBody {
    /// User starting the run.
    pub started_by: Uuid,

    /// NEGOTIATOR configuration to use.
    #[serde(default)]
    pub agent_config_id: Option<Uuid>,

    /// Restrict offers to these farmers.
    #[serde(default)]
    pub farmer_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateEvidenceBody {
    pub actor_id: Uuid,
    pub agent_config_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub explainability: Explainability,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub analysis: ValidationAnalysis,
}

/// Run orchestration for a request.
pub async fn orchestrate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<OrchestrateBody>,
) -> ApiResult<Json<OrchestrationResult>> {
    let result = state
        .coordinator
        .orchestrate(
            id,
            body.started_by,
            body.agent_config_id,
            body.farmer_ids.as_deref(),
        )
        .await?;

    Ok(Json(result))
}

/// Ranking preview for a request.
pub async fn analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AnalysisResponse>> {
    let explainability = state.coordinator.analyze(id).await?;
    Ok(Json(AnalysisResponse { explainability }))
}

/// Validate the evidence attached to a request.
pub async fn validate_evidence(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ValidateEvidenceBody>,
) -> ApiResult<Json<ValidationResponse>> {
    let analysis = state
        .coordinator
        .validate_evidence(id, body.actor_id, body.agent_config_id)
        .await?;

    Ok(Json(ValidationResponse { analysis }))
}

/// List the offers created for a request.
pub async fn list_offers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Offer>>> {
    let offers = state.coordinator.offers(id).await?;
    Ok(Json(offers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum_test::TestServer;
    use chrono::NaiveDate;
    use harvest_agents::DisabledTextService;
    use harvest_core::{
        AgentConfig, Farmer, Program, Request, RequestItem, RequestStatus, ValidatorConfig,
        Verdict,
    };
    use harvest_store::{InMemoryAuditLog, InMemoryStore, Store};
    use serde_json::json;

    use crate::api::error::ErrorResponse;
    use harvest_agents::testing::{ScriptedReply, ScriptedTextService};
    use crate::coordinator::Coordinator;

    async fn server() -> (TestServer, Arc<InMemoryStore>, Request) {
        let store = Arc::new(InMemoryStore::new());
        let municipality_id = Uuid::new_v4();
        let request = Request::new(
            Uuid::new_v4(),
            municipality_id,
            Program::SchoolFeeding,
            NaiveDate::from_ymd_opt(2026, 11, 20).unwrap(),
            vec![RequestItem::new("Alface", 50.0, "kg")],
        );
        store.insert_request(request.clone()).await;
        store
            .insert_farmer(Farmer::new(municipality_id, "Sítio Boa Vista", &["Alface"]))
            .await;
        store
            .insert_farmer(Farmer::new(municipality_id, "Chácara Primavera", &["Alface", "Couve"]))
            .await;

        let coordinator = Coordinator::new(
            store.clone(),
            Arc::new(InMemoryAuditLog::new()),
            Arc::new(DisabledTextService),
        );
        let app = crate::create_router(AppState::new(coordinator));

        (TestServer::new(app).unwrap(), store, request)
    }

    #[tokio::test]
    async fn test_health() {
        let (server, _, _) = server().await;

        let response = server.get("/health").await;
        response.assert_status_ok();
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["text_service"], "disabled");
    }

    #[tokio::test]
    async fn test_health_reports_configured_text_service() {
        let coordinator = Coordinator::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryAuditLog::new()),
            Arc::new(ScriptedTextService::new([ScriptedReply::text("olá")])),
        );
        let server = TestServer::new(crate::create_router(AppState::new(coordinator))).unwrap();

        let body = server.get("/health").await.json::<serde_json::Value>();
        assert_eq!(body["text_service"], "configured");
    }

    #[tokio::test]
    async fn test_orchestrate_then_list_offers() {
        let (server, store, request) = server().await;

        let response = server
            .post(&format!("/api/v1/requests/{}/orchestrate", request.id))
            .json(&json!({ "started_by": Uuid::new_v4() }))
            .await;
        response.assert_status_ok();
        let result = response.json::<OrchestrationResult>();
        assert_eq!(result.offers.len(), 2);
        assert!(result.run_id.is_some());

        let offers = server
            .get(&format!("/api/v1/requests/{}/offers", request.id))
            .await
            .json::<Vec<Offer>>();
        assert_eq!(offers.len(), 2);

        let stored = store.request(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::ProposalsSent);

        let again = server
            .post(&format!("/api/v1/requests/{}/orchestrate", request.id))
            .json(&json!({ "started_by": Uuid::new_v4() }))
            .await;
        again.assert_status(StatusCode::CONFLICT);
        assert_eq!(again.json::<ErrorResponse>().kind, "invalid_status");
    }

    #[tokio::test]
    async fn test_analysis_preview() {
        let (server, _, request) = server().await;

        let response = server
            .get(&format!("/api/v1/requests/{}/analysis", request.id))
            .await;
        response.assert_status_ok();

        let analysis = response.json::<AnalysisResponse>();
        assert_eq!(analysis.explainability.candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_request_is_404() {
        let (server, _, _) = server().await;

        let response = server
            .get(&format!("/api/v1/requests/{}/offers", Uuid::new_v4()))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<ErrorResponse>().kind, "not_found");
    }

    #[tokio::test]
    async fn test_validate_evidence_endpoint() {
        let (server, store, request) = server().await;
        let config = AgentConfig::validator(request.institution_id, ValidatorConfig::default());
        store.insert_agent_config(config.clone()).await;

        let response = server
            .post(&format!("/api/v1/requests/{}/evidence/validate", request.id))
            .json(&json!({ "actor_id": Uuid::new_v4(), "agent_config_id": config.id }))
            .await;
        response.assert_status_ok();

        let analysis = response.json::<ValidationResponse>().analysis;
        assert!(analysis.fallback);
        assert_eq!(analysis.verdict, Verdict::Reject);
    }

    #[tokio::test]
    async fn test_foreign_agent_config_is_400() {
        let (server, store, request) = server().await;
        let config = AgentConfig::validator(Uuid::new_v4(), ValidatorConfig::default());
        store.insert_agent_config(config.clone()).await;

        let response = server
            .post(&format!("/api/v1/requests/{}/evidence/validate", request.id))
            .json(&json!({ "actor_id": Uuid::new_v4(), "agent_config_id": config.id }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<ErrorResponse>().kind, "agent_config_rejected");
    }
}
