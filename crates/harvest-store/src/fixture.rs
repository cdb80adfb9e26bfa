//! Seed data for the in-memory store.

use harvest_core::{AgentConfig, Farmer, Municipality, Request, Result};
use serde::{Deserialize, Serialize};

/// Records loaded into an [`InMemoryStore`](crate::InMemoryStore) at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub municipalities: Vec<Municipality>,
    pub farmers: Vec<Farmer>,
    pub requests: Vec<Request>,
    pub agent_configs: Vec<AgentConfig>,
}

impl Fixture {
    /// Parse a fixture from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.municipalities.len() + self.farmers.len() + self.requests.len() + self.agent_configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryStore, Store};
    use harvest_core::{PricingMode, RequestStatus};

    const FIXTURE: &str = r#"{
        "municipalities": [
            {"id": "7f2c1a52-2d49-4c59-9a59-3c1a0f1f7a01", "name": "Campinas", "state": "SP",
             "centroid": {"lat": -22.9056, "lng": -47.0608}}
        ],
        "farmers": [
            {"id": "0b8e4f0e-5b7a-4a8e-8a0e-9c7d3c9b1a11",
             "municipality_id": "7f2c1a52-2d49-4c59-9a59-3c1a0f1f7a01",
             "name": "Sítio Boa Vista", "products": ["Alface", "Tomate"],
             "registration": "ACTIVE", "weekly_capacity": "300 kg"}
        ],
        "requests": [
            {"id": "c3a7d2a4-1f1b-4a3e-b7c5-2e9f8d6a4b21",
             "institution_id": "5d1e9c8b-7a6f-4e3d-9c2b-1a0f9e8d7c31",
             "municipality_id": "7f2c1a52-2d49-4c59-9a59-3c1a0f1f7a01",
             "program": "SCHOOL_FEEDING", "status": "VALIDATED", "urgency": 4,
             "need_by": "2026-11-20",
             "items": [{"product_name": "Alface", "quantity": 50, "unit": "kg"}],
             "created_at": "2026-10-01T12:00:00Z"}
        ],
        "agent_configs": [
            {"id": "9e8d7c6b-5a4f-4e3d-8c2b-1a0f9e8d7c41",
             "institution_id": "5d1e9c8b-7a6f-4e3d-9c2b-1a0f9e8d7c31",
             "name": "Negociador", "active": true,
             "kind": {"type": "NEGOTIATOR", "personality": "cordial",
                      "pricing": {"mode": "FIXED_PER_PRODUCT", "discounts": {"alface": 20}}}}
        ]
    }"#;

    #[tokio::test]
    async fn test_fixture_loads_into_store() {
        let fixture = Fixture::from_json(FIXTURE).unwrap();
        assert_eq!(fixture.len(), 4);

        let request_id = fixture.requests[0].id;
        let municipality_id = fixture.municipalities[0].id;
        let config_id = fixture.agent_configs[0].id;

        let store = InMemoryStore::new();
        store.load(fixture).await;

        let request = store.request(request_id).await.unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::Validated);
        assert!(request.evidence.is_empty());

        let farmers = store.farmers_in_municipality(municipality_id).await.unwrap();
        assert_eq!(farmers[0].products, vec!["Alface", "Tomate"]);

        let config = store.agent_config(config_id).await.unwrap().unwrap();
        let negotiator = config.as_negotiator().unwrap();
        assert!(matches!(
            &negotiator.pricing,
            PricingMode::FixedPerProduct { discounts } if discounts["alface"] == 20.0
        ));
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let fixture = Fixture::from_json("{}").unwrap();
        assert!(fixture.is_empty());
    }

    #[test]
    fn test_malformed_fixture_is_an_error() {
        assert!(Fixture::from_json("{\"farmers\": 3}").is_err());
    }
}
