//! Storage contract and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use harvest_core::{
    AgentConfig, Conversation, Farmer, HarvestError, Municipality, Offer, OfferStatus, Request,
    RequestStatus, Result,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::fixture::Fixture;

/// Storage collaborator.
///
/// Creating an offer stores it together with its items, and creating a
/// conversation stores it together with its messages; each is all-or-nothing.
/// Implementations must give read-your-writes within one caller.
#[async_trait]
pub trait Store: Send + Sync {
    /// Get a request by id.
    async fn request(&self, id: Uuid) -> Result<Option<Request>>;

    /// Get a municipality by id.
    async fn municipality(&self, id: Uuid) -> Result<Option<Municipality>>;

    /// Farmers registered in a municipality, in id order.
    async fn farmers_in_municipality(&self, municipality_id: Uuid) -> Result<Vec<Farmer>>;

    /// Get an agent configuration by id.
    async fn agent_config(&self, id: Uuid) -> Result<Option<AgentConfig>>;

    /// Offers created for a request, oldest first.
    async fn offers_for_request(&self, request_id: Uuid) -> Result<Vec<Offer>>;

    /// The conversation opened for an offer.
    async fn conversation_for_offer(&self, offer_id: Uuid) -> Result<Option<Conversation>>;

    /// Store an offer with its items.
    async fn create_offer(&self, offer: Offer) -> Result<Offer>;

    /// Store a conversation with its messages.
    async fn create_conversation(&self, conversation: Conversation) -> Result<Conversation>;

    /// Set the request status to `to` only if it is currently `from`.
    /// Returns false when the request was not in `from`.
    async fn transition_request_status(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<bool>;

    /// Set the request status unconditionally.
    async fn update_request_status(&self, id: Uuid, status: RequestStatus) -> Result<()>;

    /// Move an offer to `status` if the transition is legal.
    async fn update_offer_status(&self, id: Uuid, status: OfferStatus) -> Result<()>;
}

/// In-memory implementation of [`Store`].
#[derive(Clone, Default)]
pub struct InMemoryStore {
    requests: Arc<RwLock<HashMap<Uuid, Request>>>,
    municipalities: Arc<RwLock<HashMap<Uuid, Municipality>>>,
    farmers: Arc<RwLock<HashMap<Uuid, Farmer>>>,
    agent_configs: Arc<RwLock<HashMap<Uuid, AgentConfig>>>,
    /// Offers in creation order.
    offers: Arc<RwLock<Vec<Offer>>>,
    conversations: Arc<RwLock<HashMap<Uuid, Conversation>>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_request(&self, request: Request) {
        self.requests.write().await.insert(request.id, request);
    }

    pub async fn insert_municipality(&self, municipality: Municipality) {
        self.municipalities
            .write()
            .await
            .insert(municipality.id, municipality);
    }

    pub async fn insert_farmer(&self, farmer: Farmer) {
        self.farmers.write().await.insert(farmer.id, farmer);
    }

    pub async fn insert_agent_config(&self, config: AgentConfig) {
        self.agent_configs.write().await.insert(config.id, config);
    }

    /// Load every record of a fixture.
    pub async fn load(&self, fixture: Fixture) {
        for municipality in fixture.municipalities {
            self.insert_municipality(municipality).await;
        }
        for farmer in fixture.farmers {
            self.insert_farmer(farmer).await;
        }
        for request in fixture.requests {
            self.insert_request(request).await;
        }
        for config in fixture.agent_configs {
            self.insert_agent_config(config).await;
        }
    }

    /// Number of conversations stored.
    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn request(&self, id: Uuid) -> Result<Option<Request>> {
        Ok(self.requests.read().await.get(&id).cloned())
    }

    async fn municipality(&self, id: Uuid) -> Result<Option<Municipality>> {
        Ok(self.municipalities.read().await.get(&id).cloned())
    }

    async fn farmers_in_municipality(&self, municipality_id: Uuid) -> Result<Vec<Farmer>> {
        let farmers = self.farmers.read().await;
        let mut found: Vec<Farmer> = farmers
            .values()
            .filter(|f| f.municipality_id == municipality_id)
            .cloned()
            .collect();
        found.sort_by_key(|f| f.id);
        Ok(found)
    }

    async fn agent_config(&self, id: Uuid) -> Result<Option<AgentConfig>> {
        Ok(self.agent_configs.read().await.get(&id).cloned())
    }

    async fn offers_for_request(&self, request_id: Uuid) -> Result<Vec<Offer>> {
        let offers = self.offers.read().await;
        Ok(offers
            .iter()
            .filter(|o| o.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn conversation_for_offer(&self, offer_id: Uuid) -> Result<Option<Conversation>> {
        let conversations = self.conversations.read().await;
        Ok(conversations
            .values()
            .find(|c| c.offer_id == offer_id)
            .cloned())
    }

    async fn create_offer(&self, offer: Offer) -> Result<Offer> {
        if !self.requests.read().await.contains_key(&offer.request_id) {
            return Err(HarvestError::persistence(format!(
                "offer references unknown request {}",
                offer.request_id
            )));
        }

        let mut offers = self.offers.write().await;

        if offers.iter().any(|o| {
            o.id == offer.id
                || (o.request_id == offer.request_id
                    && o.farmer_id == offer.farmer_id
                    && o.run_id == offer.run_id)
        }) {
            return Err(HarvestError::persistence(format!(
                "offer for farmer {} already exists in run {}",
                offer.farmer_id, offer.run_id
            )));
        }

        offers.push(offer.clone());
        Ok(offer)
    }

    async fn create_conversation(&self, conversation: Conversation) -> Result<Conversation> {
        if !self
            .offers
            .read()
            .await
            .iter()
            .any(|o| o.id == conversation.offer_id)
        {
            return Err(HarvestError::persistence(format!(
                "conversation references unknown offer {}",
                conversation.offer_id
            )));
        }

        let mut conversations = self.conversations.write().await;
        if conversations.contains_key(&conversation.id) {
            return Err(HarvestError::persistence(format!(
                "conversation {} already exists",
                conversation.id
            )));
        }

        conversations.insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn transition_request_status(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<bool> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(&id)
            .ok_or_else(|| HarvestError::persistence(format!("request {} vanished", id)))?;

        if request.status != from {
            return Ok(false);
        }

        request.status = to;
        Ok(true)
    }

    async fn update_request_status(&self, id: Uuid, status: RequestStatus) -> Result<()> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(&id)
            .ok_or_else(|| HarvestError::persistence(format!("request {} vanished", id)))?;
        request.status = status;
        Ok(())
    }

    async fn update_offer_status(&self, id: Uuid, status: OfferStatus) -> Result<()> {
        let mut offers = self.offers.write().await;
        let offer = offers
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| HarvestError::not_found("Offer", id))?;

        if !offer.status.can_transition_to(status) {
            return Err(HarvestError::InvalidInput(format!(
                "offer {} cannot move from {:?} to {:?}",
                id, offer.status, status
            )));
        }

        offer.status = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use harvest_core::{Program, RequestItem};

    fn request() -> Request {
        Request::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Program::SchoolFeeding,
            NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            vec![RequestItem::new("Alface", 10.0, "kg")],
        )
    }

    #[tokio::test]
    async fn test_compare_and_set_status() {
        let store = InMemoryStore::new();
        let request = request();
        let id = request.id;
        store.insert_request(request).await;

        assert!(store
            .transition_request_status(id, RequestStatus::Validated, RequestStatus::Orchestrating)
            .await
            .unwrap());
        assert!(!store
            .transition_request_status(id, RequestStatus::Validated, RequestStatus::Orchestrating)
            .await
            .unwrap());

        let current = store.request(id).await.unwrap().unwrap();
        assert_eq!(current.status, RequestStatus::Orchestrating);
    }

    #[tokio::test]
    async fn test_offer_and_conversation_roundtrip() {
        let store = InMemoryStore::new();
        let request = request();
        store.insert_request(request.clone()).await;

        let offer = Offer::new(request.id, Uuid::new_v4(), Uuid::new_v4(), &request.items);
        store.create_offer(offer.clone()).await.unwrap();
        let conversation = Conversation::seeded(&offer, "Olá");
        store.create_conversation(conversation.clone()).await.unwrap();

        let offers = store.offers_for_request(request.id).await.unwrap();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].items.len(), 1);

        let stored = store.conversation_for_offer(offer.id).await.unwrap().unwrap();
        assert_eq!(stored.id, conversation.id);
        assert_eq!(stored.farmer_unread, 1);
    }

    #[tokio::test]
    async fn test_duplicate_offer_in_same_run_is_rejected() {
        let store = InMemoryStore::new();
        let request = request();
        store.insert_request(request.clone()).await;

        let farmer_id = Uuid::new_v4();
        let run_id = Uuid::new_v4();
        store
            .create_offer(Offer::new(request.id, farmer_id, run_id, &request.items))
            .await
            .unwrap();

        let result = store
            .create_offer(Offer::new(request.id, farmer_id, run_id, &request.items))
            .await;
        assert!(matches!(result, Err(HarvestError::Persistence { .. })));

        // A later run may offer to the same farmer again.
        store
            .create_offer(Offer::new(request.id, farmer_id, Uuid::new_v4(), &request.items))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_conversation_requires_offer() {
        let store = InMemoryStore::new();
        let orphan = Offer::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), &[]);

        let result = store.create_conversation(Conversation::seeded(&orphan, "x")).await;
        assert!(matches!(result, Err(HarvestError::Persistence { .. })));
        assert_eq!(store.conversation_count().await, 0);
    }

    #[tokio::test]
    async fn test_offer_status_transitions() {
        let store = InMemoryStore::new();
        let request = request();
        store.insert_request(request.clone()).await;
        let offer = store
            .create_offer(Offer::new(request.id, Uuid::new_v4(), Uuid::new_v4(), &[]))
            .await
            .unwrap();

        assert!(store
            .update_offer_status(offer.id, OfferStatus::Approved)
            .await
            .is_err());
        store
            .update_offer_status(offer.id, OfferStatus::Accepted)
            .await
            .unwrap();
        store
            .update_offer_status(offer.id, OfferStatus::Approved)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_farmers_by_municipality() {
        let store = InMemoryStore::new();
        let municipality_id = Uuid::new_v4();
        for name in ["A", "B", "C"] {
            store
                .insert_farmer(Farmer::new(municipality_id, name, &["Alface"]))
                .await;
        }
        store
            .insert_farmer(Farmer::new(Uuid::new_v4(), "Elsewhere", &["Alface"]))
            .await;

        let farmers = store.farmers_in_municipality(municipality_id).await.unwrap();
        assert_eq!(farmers.len(), 3);
        assert!(farmers.windows(2).all(|w| w[0].id < w[1].id));
    }
}
