//! Institutional requests and the roster they are matched against.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::types::{EvidenceScope, Program, RegistrationStatus, RequestStatus};

/// A food supply request raised by an institution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique identifier for this request.
    pub id: Uuid,

    /// Owning institution.
    pub institution_id: Uuid,

    /// Municipality the request is served from.
    pub municipality_id: Uuid,

    /// Funding program.
    pub program: Program,

    /// Workflow status.
    pub status: RequestStatus,

    /// Urgency from 1 (low) to 5 (critical).
    pub urgency: u8,

    /// Date the food is needed by.
    pub need_by: NaiveDate,

    /// Delivery point, if the institution provided one.
    #[serde(default)]
    pub location: Option<GeoPoint>,

    /// Requested products.
    pub items: Vec<RequestItem>,

    /// Uploaded proof evidence.
    #[serde(default)]
    pub evidence: Vec<Evidence>,

    /// When the request was created.
    pub created_at: DateTime<Utc>,
}

/// A single requested product line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestItem {
    pub product_name: String,
    pub quantity: f64,
    pub unit: String,
}

impl RequestItem {
    pub fn new(product_name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            quantity,
            unit: unit.into(),
        }
    }
}

/// An uploaded piece of evidence attached to a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub id: Uuid,
    pub scope: EvidenceScope,
    /// Text produced by the extraction collaborator, when available.
    #[serde(default)]
    pub extracted_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Evidence {
    pub fn new(scope: EvidenceScope, extracted_text: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            scope,
            extracted_text,
            created_at: Utc::now(),
        }
    }
}

impl Request {
    /// Create a validated request with no location and no evidence.
    pub fn new(
        institution_id: Uuid,
        municipality_id: Uuid,
        program: Program,
        need_by: NaiveDate,
        items: Vec<RequestItem>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            institution_id,
            municipality_id,
            program,
            status: RequestStatus::Validated,
            urgency: 3,
            need_by,
            location: None,
            items,
            evidence: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Set the delivery point.
    pub fn with_location(mut self, point: GeoPoint) -> Self {
        self.location = Some(point);
        self
    }

    /// Set the workflow status.
    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach a piece of evidence.
    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence.push(evidence);
        self
    }

    /// The point used for distance scoring: the request's own location,
    /// otherwise the municipality centroid.
    pub fn reference_point(&self, municipality: Option<&Municipality>) -> Option<GeoPoint> {
        self.location
            .or_else(|| municipality.and_then(|m| m.centroid))
    }
}

/// A municipality, used as the fallback reference point for requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Municipality {
    pub id: Uuid,
    pub name: String,
    pub state: String,
    #[serde(default)]
    pub centroid: Option<GeoPoint>,
}

/// A smallholder farmer, read-only to the orchestration core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Farmer {
    pub id: Uuid,
    pub municipality_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    /// Catalog of product names the farmer grows.
    pub products: Vec<String>,
    pub registration: RegistrationStatus,
    /// Free-text weekly capacity, e.g. "200 kg".
    #[serde(default)]
    pub weekly_capacity: String,
}

impl Farmer {
    pub fn new(municipality_id: Uuid, name: impl Into<String>, products: &[&str]) -> Self {
        Self {
            id: Uuid::new_v4(),
            municipality_id,
            name: name.into(),
            location: None,
            products: products.iter().map(|p| p.to_string()).collect(),
            registration: RegistrationStatus::Active,
            weekly_capacity: String::new(),
        }
    }

    pub fn with_location(mut self, point: GeoPoint) -> Self {
        self.location = Some(point);
        self
    }

    pub fn with_registration(mut self, registration: RegistrationStatus) -> Self {
        self.registration = registration;
        self
    }

    pub fn with_capacity(mut self, capacity: impl Into<String>) -> Self {
        self.weekly_capacity = capacity.into();
        self
    }
}
