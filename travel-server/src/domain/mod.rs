//! Domain types for the travel planner.
//!
//! Everything here is pure: parsing, validation and merging of itinerary
//! plans and user profiles, with no I/O. Persisted types only hold values
//! that have passed validation.

mod category;
mod error;
mod itinerary;
mod profile;
mod time;
mod validate;

pub use category::{PlaceCategory, UnknownCategory};
pub use error::{ProfileError, ValidationError};
pub use itinerary::{
    Destination, DestinationInput, GeoPoint, ItineraryPlan, PlanFields, Schedule, StoredPlan,
};
pub use profile::{Gender, ProfileChanges, ProfileFields, ProfilePatch, UserProfile};
pub use time::{RawInstant, TimeError, format_date, parse_instant, second_key};
pub use validate::{validate_new_plan, validate_update};
