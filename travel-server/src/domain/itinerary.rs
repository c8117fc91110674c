//! Itinerary plan types.
//!
//! `PlanFields` and `DestinationInput` hold client input before validation.
//! `ItineraryPlan` and `Destination` hold normalized values and are what
//! gets persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::time::RawInstant;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(alias = "lat")]
    pub latitude: f64,

    #[serde(alias = "lng")]
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when both coordinates are finite and within range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A scheduled stop within a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub name: String,
    pub location: GeoPoint,
    pub visit_time: DateTime<Utc>,
}

/// A destination as submitted by a client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationInput {
    pub name: String,
    pub location: GeoPoint,
    pub visit_time: RawInstant,
}

/// Plan fields from a create or update request. Any subset may be present.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanFields {
    pub title: Option<String>,
    pub city: Option<String>,
    pub start_date: Option<RawInstant>,
    pub end_date: Option<RawInstant>,
    pub destinations: Option<Vec<DestinationInput>>,
}

impl PlanFields {
    /// The title, unless absent or empty.
    pub fn title(&self) -> Option<&str> {
        non_empty(&self.title)
    }

    /// The city, unless absent or empty.
    pub fn city(&self) -> Option<&str> {
        non_empty(&self.city)
    }

    /// The start date, unless absent or blank.
    pub fn start_date(&self) -> Option<&RawInstant> {
        self.start_date.as_ref().filter(|raw| !raw.is_blank())
    }

    /// The end date, unless absent or blank.
    pub fn end_date(&self) -> Option<&RawInstant> {
        self.end_date.as_ref().filter(|raw| !raw.is_blank())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// A validated itinerary plan, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryPlan {
    pub user_id: String,
    pub title: String,
    pub city: String,
    pub start_date: DateTime<Utc>,

    /// Absent on plans written without an end date; such plans skip
    /// window and overlap checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub destinations: Vec<Destination>,
}

/// A plan together with its store-assigned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPlan {
    pub id: String,
    pub plan: ItineraryPlan,
}

/// The normalized date window and destinations of a new plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub destinations: Vec<Destination>,
}
