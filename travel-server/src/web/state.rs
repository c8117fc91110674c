//! Application state for the web layer.

use std::sync::Arc;

use crate::auth::IdentityVerifier;
use crate::service::{ItineraryService, PlanRules, ProfileService};
use crate::store::DocumentStore;

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// Itinerary plan operations
    pub itineraries: Arc<ItineraryService>,

    /// User profile operations
    pub profiles: Arc<ProfileService>,

    /// Bearer token verification
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl AppState {
    /// Create a new app state over one document store.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        verifier: Arc<dyn IdentityVerifier>,
        rules: PlanRules,
    ) -> Self {
        Self {
            itineraries: Arc::new(ItineraryService::new(store.clone(), rules)),
            profiles: Arc::new(ProfileService::new(store)),
            verifier,
        }
    }
}
