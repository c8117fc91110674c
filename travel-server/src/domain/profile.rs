//! User profile types and field validation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::category::PlaceCategory;
use super::error::ProfileError;
use super::time::{RawInstant, parse_instant};

/// Self-declared gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Parse the exact spelling `Male`, `Female` or `Other`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Male" => Some(Gender::Male),
            "Female" => Some(Gender::Female),
            "Other" => Some(Gender::Other),
            _ => None,
        }
    }
}

/// A user profile, as persisted. The document id is the owner's uid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,

    #[serde(default)]
    pub destination_preferences: Vec<PlaceCategory>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields from a create or update request.
///
/// `destinationPreferences` is kept as raw JSON so a non-array value can be
/// reported as a format error rather than a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<RawInstant>,
    pub destination_preferences: Option<serde_json::Value>,
}

/// The fields an upsert writes over a stored profile. Absent fields are
/// left as they are.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_preferences: Option<Vec<PlaceCategory>>,

    /// Only written when the profile is new.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    pub updated_at: DateTime<Utc>,
}

/// Validated profile changes. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
    pub destination_preferences: Option<Vec<PlaceCategory>>,
}

impl ProfileFields {
    /// Check every present field. Empty strings count as absent.
    ///
    /// `now` bounds the birth date.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<ProfileChanges, ProfileError> {
        let name = non_empty(&self.name)
            .map(|name| {
                if is_plain_name(name) {
                    Ok(name.to_string())
                } else {
                    Err(ProfileError::InvalidName)
                }
            })
            .transpose()?;

        let gender = non_empty(&self.gender)
            .map(|g| Gender::parse(g).ok_or(ProfileError::InvalidGender))
            .transpose()?;

        let birth_date = self
            .birth_date
            .as_ref()
            .filter(|raw| !raw.is_blank())
            .map(|raw| match parse_instant(raw) {
                Ok(born) if born <= now => Ok(born.date_naive()),
                _ => Err(ProfileError::InvalidBirthDate),
            })
            .transpose()?;

        let destination_preferences = self
            .destination_preferences
            .as_ref()
            .map(parse_preferences)
            .transpose()?;

        Ok(ProfileChanges {
            name,
            gender,
            birth_date,
            destination_preferences,
        })
    }
}

impl ProfileChanges {
    /// The partial write for an upsert. A new profile also gets
    /// `createdAt` and an empty preference list.
    pub fn into_patch(self, exists: bool, now: DateTime<Utc>) -> ProfilePatch {
        let destination_preferences = match self.destination_preferences {
            Some(prefs) => Some(prefs),
            None if exists => None,
            None => Some(Vec::new()),
        };

        ProfilePatch {
            name: self.name,
            gender: self.gender,
            birth_date: self.birth_date,
            destination_preferences,
            created_at: (!exists).then_some(now),
            updated_at: now,
        }
    }

    /// Merge over an existing profile, or start a new one.
    ///
    /// `created_at` is kept from `current`; `updated_at` is always `now`.
    pub fn apply(self, current: Option<&UserProfile>, now: DateTime<Utc>) -> UserProfile {
        match current {
            Some(current) => UserProfile {
                name: self.name.or_else(|| current.name.clone()),
                gender: self.gender.or(current.gender),
                birth_date: self.birth_date.or(current.birth_date),
                destination_preferences: self
                    .destination_preferences
                    .unwrap_or_else(|| current.destination_preferences.clone()),
                created_at: current.created_at,
                updated_at: now,
            },
            None => UserProfile {
                name: self.name,
                gender: self.gender,
                birth_date: self.birth_date,
                destination_preferences: self.destination_preferences.unwrap_or_default(),
                created_at: now,
                updated_at: now,
            },
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Letters and whitespace only.
fn is_plain_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphabetic() || c.is_whitespace())
}

fn parse_preferences(value: &serde_json::Value) -> Result<Vec<PlaceCategory>, ProfileError> {
    let items = value
        .as_array()
        .ok_or(ProfileError::InvalidPreferencesFormat)?;

    items
        .iter()
        .map(|item| match item.as_str() {
            Some(tag) => PlaceCategory::parse(tag)
                .map_err(|_| ProfileError::UnknownCategory(tag.to_string())),
            None => Err(ProfileError::UnknownCategory(item.to_string())),
        })
        .collect()
}
