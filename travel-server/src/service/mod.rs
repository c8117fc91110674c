//! Itinerary and profile operations.
//!
//! Services sit between the HTTP layer and the document store. They take
//! the authenticated [`Principal`](crate::auth::Principal) as a parameter,
//! enforce ownership, and run all validation before touching the store.

mod error;
mod itinerary;
mod profile;

pub use error::ServiceError;
pub use itinerary::{ItineraryService, PlanRules};
pub use profile::ProfileService;

use crate::store::StoreError;

/// Result of a list operation.
///
/// An empty result is a normal outcome, not an error; callers decide how
/// to present it.
#[derive(Debug, Clone, PartialEq)]
pub enum Listing<T> {
    Empty,
    Items(Vec<T>),
}

impl<T> Listing<T> {
    pub fn from_vec(items: Vec<T>) -> Self {
        if items.is_empty() {
            Listing::Empty
        } else {
            Listing::Items(items)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Listing::Empty => 0,
            Listing::Items(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Listing::Empty)
    }
}

/// Map a store-level missing document to the service-level error.
fn missing(kind: &'static str) -> impl Fn(StoreError) -> ServiceError {
    move |err| match err {
        StoreError::NotFound { id, .. } => ServiceError::NotFound { kind, id },
        other => ServiceError::Store(other),
    }
}
