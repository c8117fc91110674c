//! Web layer for the travel planner.
//!
//! Provides the authenticated JSON API for itinerary plans and user profiles.

mod auth;
mod dto;
mod error;
mod routes;
mod state;

pub use auth::require_auth;
pub use dto::*;
pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;
