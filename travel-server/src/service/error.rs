//! Service error types.

use crate::domain::{ProfileError, ValidationError};
use crate::store::StoreError;

/// Errors from itinerary and profile operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Plan input was rejected
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Profile input was rejected
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// No record with this id
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// The record belongs to someone else
    #[error("{kind} {id} is not owned by the caller")]
    Forbidden { kind: &'static str, id: String },

    /// The document store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
