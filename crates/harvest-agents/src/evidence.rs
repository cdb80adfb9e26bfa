//! Checklist-based validation of request evidence.
//!
//! The engine runs a small state machine over at most two service calls:
//!
//! ```text
//! Call ─fail─────────────────────────────────────────────► Fallback
//!  │
//!  ▼
//! Extract ─no object─────────────────────────────────────► Fallback
//!  │
//!  ▼
//! Parse ─invalid, first attempt─► Call (retry, once)
//!  │    ─invalid, after retry────────────────────────────► Fallback
//!  ▼
//! Validate ─schema violation─────────────────────────────► Fallback
//!  │
//!  ▼
//! Done
//! ```
//!
//! Every terminal state yields a well-formed [`ValidationAnalysis`].

use std::sync::Arc;
use std::time::Duration;

use harvest_core::{Evidence, HarvestError, Request, Result, ValidationAnalysis};
use serde_json::Value;
use tracing::{info, warn};

use crate::extract::{extract_json_object, parse_json, validate_analysis};
use crate::service::{GenerateOptions, TextService};

/// Default per-call timeout for evidence validation.
pub const DEFAULT_VALIDATION_TIMEOUT: Duration = Duration::from_secs(20);

/// Longest evidence text embedded in the prompt, per item.
const EVIDENCE_TEXT_LIMIT: usize = 600;

/// Longest raw-response excerpt kept in a diagnostic.
const DIAGNOSTIC_EXCERPT_LIMIT: usize = 300;

const RETRY_INSTRUCTION: &str = "Your previous response was invalid or truncated. \
Resend only the JSON object, on a single line, with no other text.";

/// What the engine returns: the public analysis plus internal details for the audit trail.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub analysis: ValidationAnalysis,

    /// Why the fallback was taken. Not part of the public analysis.
    pub diagnostic: Option<String>,

    /// Service calls made (1 or 2).
    pub attempts: u8,
}

enum Stage {
    Call,
    Extract(String),
    Parse { raw: String, candidate: String },
    Validate(Value),
    Fallback(String),
}

/// Validates a request's evidence against a checklist through the text service.
#[derive(Clone)]
pub struct EvidenceValidator {
    service: Arc<dyn TextService>,
    timeout: Duration,
}

impl EvidenceValidator {
    pub fn new(service: Arc<dyn TextService>) -> Self {
        Self {
            service,
            timeout: DEFAULT_VALIDATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate `request.evidence` against `checklist`. Never fails.
    pub async fn validate(&self, request: &Request, checklist: &[String]) -> ValidationOutcome {
        let system = system_instruction();
        let user = user_instruction(request, checklist);

        let mut attempts: u8 = 0;
        let mut stage = Stage::Call;

        loop {
            stage = match stage {
                Stage::Call => {
                    attempts += 1;
                    let prompt = if attempts > 1 {
                        format!("{}\n\n{}", user, RETRY_INSTRUCTION)
                    } else {
                        user.clone()
                    };
                    match self.call(&system, &prompt).await {
                        Ok(raw) => Stage::Extract(raw),
                        Err(e) => Stage::Fallback(format!("call failed: {}", e)),
                    }
                }
                Stage::Extract(raw) => match extract_json_object(&raw).map(str::to_string) {
                    Ok(candidate) => Stage::Parse { raw, candidate },
                    Err(defect) => Stage::Fallback(format!("{}: {}", defect, excerpt(&raw))),
                },
                Stage::Parse { raw, candidate } => match parse_json(&candidate) {
                    Ok(value) => Stage::Validate(value),
                    Err(defect) if attempts < 2 => {
                        warn!(request_id = %request.id, %defect, "unparseable validation response, retrying");
                        Stage::Call
                    }
                    Err(defect) => Stage::Fallback(format!("{} after retry: {}", defect, excerpt(&raw))),
                },
                Stage::Validate(value) => match validate_analysis(&value) {
                    Ok(analysis) => {
                        info!(
                            request_id = %request.id,
                            verdict = ?analysis.verdict,
                            confidence = analysis.confidence,
                            attempts,
                            "evidence validated"
                        );
                        return ValidationOutcome {
                            analysis,
                            diagnostic: None,
                            attempts,
                        };
                    }
                    Err(defect) => Stage::Fallback(format!("{}: {}", defect, excerpt(&value.to_string()))),
                },
                Stage::Fallback(reason) => {
                    warn!(request_id = %request.id, %reason, attempts, "evidence validation fell back");
                    return ValidationOutcome {
                        analysis: ValidationAnalysis::fallback(checklist, !request.evidence.is_empty()),
                        diagnostic: Some(reason),
                        attempts,
                    };
                }
            };
        }
    }

    async fn call(&self, system: &str, user: &str) -> Result<String> {
        tokio::time::timeout(
            self.timeout,
            self.service.generate(system, user, &GenerateOptions::json()),
        )
        .await
        .map_err(|_| HarvestError::Timeout {
            duration_ms: self.timeout.as_millis() as u64,
            message: "evidence validation".to_string(),
        })?
    }
}

fn system_instruction() -> String {
    "You audit evidence uploaded for public food procurement requests. \
     Compare the evidence with the checklist and answer with exactly one line of JSON and nothing else, \
     matching this schema: \
     {\"verdict\":\"APPROVE|REVIEW|REJECT\",\"confidence\":<number 0..1>,\
     \"checklist\":[{\"item\":\"<checklist item>\",\"status\":\"PASS|FAIL|MISSING\",\"reason\":\"<short reason>\"}],\
     \"missing\":[\"<checklist item>\"]}"
        .to_string()
}

fn user_instruction(request: &Request, checklist: &[String]) -> String {
    let mut text = format!(
        "Request {} ({:?}), needed by {}.\n\nChecklist:\n",
        request.id, request.program, request.need_by
    );
    for (index, item) in checklist.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", index + 1, item));
    }

    text.push_str("\nEvidence:\n");
    if request.evidence.is_empty() {
        text.push_str("(none uploaded)\n");
    }
    for evidence in &request.evidence {
        text.push_str(&describe_evidence(evidence));
    }

    text
}

fn describe_evidence(evidence: &Evidence) -> String {
    let body = evidence
        .extracted_text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.chars().take(EVIDENCE_TEXT_LIMIT).collect::<String>())
        .unwrap_or_else(|| "(no extracted text)".to_string());

    format!(
        "- [{:?}] {}: {}\n",
        evidence.scope,
        evidence.created_at.format("%Y-%m-%d"),
        body
    )
}

fn excerpt(raw: &str) -> String {
    let mut text: String = raw.chars().take(DIAGNOSTIC_EXCERPT_LIMIT).collect();
    if raw.chars().count() > DIAGNOSTIC_EXCERPT_LIMIT {
        text.push('…');
    }
    text
}
