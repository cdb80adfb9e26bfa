//! Offers sent to farmers and the conversations they open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::request::RequestItem;
use crate::types::OfferStatus;

/// An offer from an institution's request to a single farmer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    /// Unique ID for this offer.
    pub id: Uuid,

    /// The request being fulfilled.
    pub request_id: Uuid,

    /// The farmer receiving the offer.
    pub farmer_id: Uuid,

    /// The orchestration run that created this offer.
    pub run_id: Uuid,

    /// Current status.
    pub status: OfferStatus,

    /// Catalog value of the requested items.
    pub market_value: f64,

    /// Negotiated value offered.
    pub proposed_value: f64,

    /// Distance between the request point and the farmer, if both are known.
    pub distance_km: Option<f64>,

    /// Line items, mirroring the request.
    pub items: Vec<OfferItem>,

    /// When the offer was created.
    pub created_at: DateTime<Utc>,
}

/// A product line in an offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferItem {
    pub product_name: String,
    pub quantity: f64,
    pub unit: String,
}

impl From<&RequestItem> for OfferItem {
    fn from(item: &RequestItem) -> Self {
        Self {
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit: item.unit.clone(),
        }
    }
}

impl Offer {
    /// Create a new offer in the `SENT` state.
    pub fn new(request_id: Uuid, farmer_id: Uuid, run_id: Uuid, items: &[RequestItem]) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            farmer_id,
            run_id,
            status: OfferStatus::Sent,
            market_value: 0.0,
            proposed_value: 0.0,
            distance_km: None,
            items: items.iter().map(OfferItem::from).collect(),
            created_at: Utc::now(),
        }
    }

    /// Set the market and proposed values.
    pub fn with_values(mut self, market_value: f64, proposed_value: f64) -> Self {
        self.market_value = market_value;
        self.proposed_value = proposed_value;
        self
    }

    /// Set the distance to the farmer.
    pub fn with_distance(mut self, distance_km: Option<f64>) -> Self {
        self.distance_km = distance_km;
        self
    }
}

/// Who wrote a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageAuthor {
    System,
    Farmer,
    Institution,
}

/// A single conversation message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub author: MessageAuthor,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Conversation thread between an institution and a farmer about an offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub request_id: Uuid,
    pub farmer_id: Uuid,
    pub messages: Vec<Message>,
    /// Messages the farmer has not read yet.
    pub farmer_unread: u32,
    /// Messages the institution has not read yet.
    pub institution_unread: u32,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Open a conversation for `offer`, seeded with a system-authored message
    /// the farmer has not read yet.
    pub fn seeded(offer: &Offer, body: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            offer_id: offer.id,
            request_id: offer.request_id,
            farmer_id: offer.farmer_id,
            messages: vec![Message {
                id: Uuid::new_v4(),
                author: MessageAuthor::System,
                body: body.into(),
                created_at: now,
            }],
            farmer_unread: 1,
            institution_unread: 0,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_mirrors_request_items() {
        let items = vec![
            RequestItem::new("Alface", 50.0, "kg"),
            RequestItem::new("Tomate", 30.0, "kg"),
        ];
        let offer = Offer::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), &items)
            .with_values(430.0, 365.5)
            .with_distance(Some(4.2));

        assert_eq!(offer.status, OfferStatus::Sent);
        assert_eq!(offer.items.len(), 2);
        assert_eq!(offer.items[1].product_name, "Tomate");
        assert_eq!(offer.proposed_value, 365.5);
    }

    #[test]
    fn test_seeded_conversation() {
        let offer = Offer::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), &[]);
        let conversation = Conversation::seeded(&offer, "Olá!");

        assert_eq!(conversation.offer_id, offer.id);
        assert_eq!(conversation.farmer_unread, 1);
        assert_eq!(conversation.institution_unread, 0);
        assert_eq!(conversation.messages.len(), 1);
        assert_eq!(conversation.messages[0].author, MessageAuthor::System);
    }
}
