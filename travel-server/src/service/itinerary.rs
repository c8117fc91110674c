//! Itinerary plan operations.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::ServiceError;
use super::{Listing, missing};
use crate::auth::Principal;
use crate::domain::{
    DestinationInput, ItineraryPlan, PlanFields, RawInstant, StoredPlan, ValidationError,
    validate_new_plan, validate_update,
};
use crate::store::{Document, DocumentStore, encode};

/// Collection holding itinerary plans.
pub const COLLECTION: &str = "ItineraryPlans";

/// Field holding the owner's uid.
const OWNER_FIELD: &str = "userId";

const KIND: &str = "itinerary plan";

/// Policy knobs for new plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanRules {
    /// Reject new plans without an end date. When off, such plans are
    /// stored without window or overlap checks.
    pub require_end_date: bool,
}

impl Default for PlanRules {
    fn default() -> Self {
        Self {
            require_end_date: true,
        }
    }
}

/// Create, read, update and delete itinerary plans.
#[derive(Clone)]
pub struct ItineraryService {
    store: Arc<dyn DocumentStore>,
    rules: PlanRules,
}

/// The fields a new plan cannot do without.
struct Required<'a> {
    title: &'a str,
    city: &'a str,
    start: &'a RawInstant,
    end: Option<&'a RawInstant>,
    destinations: &'a [DestinationInput],
}

impl ItineraryService {
    pub fn new(store: Arc<dyn DocumentStore>, rules: PlanRules) -> Self {
        Self { store, rules }
    }

    /// Validate and store a new plan owned by `principal`. Returns the new id.
    pub async fn create(
        &self,
        principal: &Principal,
        fields: &PlanFields,
    ) -> Result<String, ServiceError> {
        let required = self.required(fields).inspect_err(|e| {
            warn!(uid = principal.uid(), "rejecting plan: {e}");
        })?;

        let schedule = validate_new_plan(required.start, required.end, required.destinations)?;
        let plan = ItineraryPlan {
            user_id: principal.uid().to_string(),
            title: required.title.to_string(),
            city: required.city.to_string(),
            start_date: schedule.start_date,
            end_date: schedule.end_date,
            destinations: schedule.destinations,
        };

        let id = self.store.add(COLLECTION, encode(&plan)?).await?;
        info!(
            plan_id = %id,
            uid = principal.uid(),
            destinations = plan.destinations.len(),
            "created itinerary plan"
        );
        Ok(id)
    }

    /// Fetch one of the caller's plans.
    pub async fn get(&self, principal: &Principal, id: &str) -> Result<StoredPlan, ServiceError> {
        self.fetch_owned(principal, id).await
    }

    /// All plans owned by the caller.
    pub async fn list(&self, principal: &Principal) -> Result<Listing<StoredPlan>, ServiceError> {
        let documents = self
            .store
            .query_eq(COLLECTION, OWNER_FIELD, &Value::from(principal.uid()))
            .await?;

        let plans = documents
            .iter()
            .map(stored_plan)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(uid = principal.uid(), count = plans.len(), "listed itinerary plans");
        Ok(Listing::from_vec(plans))
    }

    /// Merge `patch` over one of the caller's plans and store the result.
    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        patch: &PlanFields,
    ) -> Result<StoredPlan, ServiceError> {
        let current = self.fetch_owned(principal, id).await?;
        let plan = validate_update(&current.plan, patch)?;

        self.store
            .update(COLLECTION, id, encode(&plan)?)
            .await
            .map_err(missing(KIND))?;

        info!(plan_id = id, uid = principal.uid(), "updated itinerary plan");
        Ok(StoredPlan {
            id: id.to_string(),
            plan,
        })
    }

    /// Delete one of the caller's plans.
    pub async fn delete(&self, principal: &Principal, id: &str) -> Result<(), ServiceError> {
        self.fetch_owned(principal, id).await?;

        self.store
            .delete(COLLECTION, id)
            .await
            .map_err(missing(KIND))?;

        info!(plan_id = id, uid = principal.uid(), "deleted itinerary plan");
        Ok(())
    }

    fn required<'a>(&self, fields: &'a PlanFields) -> Result<Required<'a>, ValidationError> {
        let mut absent = Vec::new();
        if fields.title().is_none() {
            absent.push("title");
        }
        if fields.city().is_none() {
            absent.push("city");
        }
        if fields.start_date().is_none() {
            absent.push("startDate");
        }
        if self.rules.require_end_date && fields.end_date().is_none() {
            absent.push("endDate");
        }
        if fields.destinations.is_none() {
            absent.push("destinations");
        }

        match (
            fields.title(),
            fields.city(),
            fields.start_date(),
            fields.destinations.as_deref(),
        ) {
            (Some(title), Some(city), Some(start), Some(destinations)) if absent.is_empty() => {
                Ok(Required {
                    title,
                    city,
                    start,
                    end: fields.end_date(),
                    destinations,
                })
            }
            _ => Err(ValidationError::MissingFields(absent)),
        }
    }

    async fn fetch_owned(&self, principal: &Principal, id: &str) -> Result<StoredPlan, ServiceError> {
        let document = self
            .store
            .get(COLLECTION, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound {
                kind: KIND,
                id: id.to_string(),
            })?;

        let stored = stored_plan(&document)?;
        if stored.plan.user_id != principal.uid() {
            warn!(plan_id = id, uid = principal.uid(), "plan owned by another user");
            return Err(ServiceError::Forbidden {
                kind: KIND,
                id: id.to_string(),
            });
        }

        Ok(stored)
    }
}

fn stored_plan(document: &Document) -> Result<StoredPlan, ServiceError> {
    Ok(StoredPlan {
        id: document.id.clone(),
        plan: document.decode()?,
    })
}
