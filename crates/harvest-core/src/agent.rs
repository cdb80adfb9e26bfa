//! Agent configurations owned by institutions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Checklist used when a validator agent has none configured.
pub const DEFAULT_CHECKLIST: [&str; 3] = [
    "Exterior photo of the institution",
    "Interior photo of the kitchen or storage area",
    "Institutional identification document",
];

/// An institution's configuration for one of the orchestration agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub name: String,
    pub active: bool,
    pub kind: AgentKind,
}

/// The agent variant and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentKind {
    /// Writes outreach messages to farmers.
    Negotiator(NegotiatorConfig),
    /// Checks request evidence against a checklist.
    Validator(ValidatorConfig),
}

impl AgentKind {
    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::Negotiator(_) => "NEGOTIATOR",
            AgentKind::Validator(_) => "VALIDATOR",
        }
    }
}

/// Negotiator settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NegotiatorConfig {
    /// Persona the messages are written in.
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub pricing: PricingMode,
    /// Free-text extra instructions.
    #[serde(default)]
    pub instructions: String,
}

/// How the proposed value is derived from the market value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingMode {
    /// Percentage discount per product name. An empty map means the flat discount.
    FixedPerProduct {
        #[serde(default)]
        discounts: HashMap<String, f64>,
    },
    /// Per-farmer formula. Stored as given; never evaluated.
    CustomPerFarmer { formula: String },
}

impl Default for PricingMode {
    fn default() -> Self {
        PricingMode::FixedPerProduct {
            discounts: HashMap::new(),
        }
    }
}

/// Validator settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Ordered required evidence descriptions.
    #[serde(default)]
    pub checklist: Vec<String>,
}

impl ValidatorConfig {
    /// The configured checklist, or [`DEFAULT_CHECKLIST`] when empty.
    pub fn effective_checklist(&self) -> Vec<String> {
        let configured: Vec<String> = self
            .checklist
            .iter()
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();

        if configured.is_empty() {
            DEFAULT_CHECKLIST.iter().map(|s| s.to_string()).collect()
        } else {
            configured
        }
    }
}

impl AgentConfig {
    pub fn negotiator(institution_id: Uuid, config: NegotiatorConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            institution_id,
            name: "Negotiator".to_string(),
            active: true,
            kind: AgentKind::Negotiator(config),
        }
    }

    pub fn validator(institution_id: Uuid, config: ValidatorConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            institution_id,
            name: "Validator".to_string(),
            active: true,
            kind: AgentKind::Validator(config),
        }
    }

    pub fn as_negotiator(&self) -> Option<&NegotiatorConfig> {
        match &self.kind {
            AgentKind::Negotiator(config) => Some(config),
            AgentKind::Validator(_) => None,
        }
    }

    pub fn as_validator(&self) -> Option<&ValidatorConfig> {
        match &self.kind {
            AgentKind::Validator(config) => Some(config),
            AgentKind::Negotiator(_) => None,
        }
    }
}
