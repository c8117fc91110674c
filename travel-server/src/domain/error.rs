//! Domain error types.
//!
//! These errors describe why client-supplied plan or profile data was
//! rejected. They carry no I/O concerns; the service layer wraps them.

use chrono::{DateTime, Utc};

/// Why an itinerary plan was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Required fields absent on create
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// A field could not be parsed
    #[error("malformed {field}: {reason}")]
    MalformedInput { field: String, reason: String },

    /// Start date is not strictly before the end date
    #[error("start date {start} must be before end date {end}")]
    Ordering {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// A visit time falls outside `[startDate, endDate]`
    #[error("destination {index} visit time {visit_time} is outside the trip window")]
    Window {
        index: usize,
        visit_time: DateTime<Utc>,
    },

    /// Two destinations share a visit time (to the second)
    #[error("destination {index} visit time {visit_time} overlaps destination {earlier}")]
    Overlap {
        index: usize,
        earlier: usize,
        visit_time: DateTime<Utc>,
    },
}

impl ValidationError {
    pub(crate) fn malformed(field: impl Into<String>, reason: impl ToString) -> Self {
        ValidationError::MalformedInput {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}

/// Why a user profile write was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("Name can not contain numbers or symbols")]
    InvalidName,

    #[error("Invalid input! Please choose Male, Female, or Other")]
    InvalidGender,

    #[error("Birth date must be a valid date and cannot be in the future")]
    InvalidBirthDate,

    #[error("Invalid destination preferences format")]
    InvalidPreferencesFormat,

    #[error("Invalid destination preferences categories: {0}")]
    UnknownCategory(String),
}
