//! Data transfer objects for web requests and responses.
//!
//! Request bodies deserialize straight into the domain input types
//! ([`PlanFields`](crate::domain::PlanFields),
//! [`ProfileFields`](crate::domain::ProfileFields)); only responses need
//! their own shapes.

use serde::Serialize;

use crate::domain::{Destination, StoredPlan, UserProfile, format_date};

/// Response carrying the id of a newly written record.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// Plain confirmation message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// An itinerary plan as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub city: String,

    /// `YYYY-MM-DD`
    pub start_date: String,

    /// `YYYY-MM-DD`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,

    /// Visit times are RFC 3339.
    pub destinations: Vec<Destination>,
}

impl From<StoredPlan> for PlanResponse {
    fn from(stored: StoredPlan) -> Self {
        let plan = stored.plan;
        Self {
            id: stored.id,
            user_id: plan.user_id,
            title: plan.title,
            city: plan.city,
            start_date: format_date(&plan.start_date),
            end_date: plan.end_date.as_ref().map(format_date),
            destinations: plan.destinations,
        }
    }
}

/// Response to a successful plan update.
#[derive(Debug, Serialize)]
pub struct UpdatedPlanResponse {
    pub message: String,
    pub plan: PlanResponse,
}

/// A user profile as returned to clients.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: String,

    #[serde(flatten)]
    pub profile: UserProfile,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
