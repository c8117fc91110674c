//! User profile operations.
//!
//! Profiles are keyed by the owner's uid. Anyone signed in may read a
//! profile; only its owner may change or delete it.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::error::ServiceError;
use super::missing;
use crate::auth::Principal;
use crate::domain::{ProfileFields, UserProfile};
use crate::store::{DocumentStore, encode};

/// Collection holding user profiles.
pub const COLLECTION: &str = "users";

const KIND: &str = "user";

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create or merge the caller's own profile. Returns its id.
    pub async fn upsert(
        &self,
        principal: &Principal,
        fields: &ProfileFields,
    ) -> Result<String, ServiceError> {
        let now = Utc::now();
        let changes = fields.validate(now).inspect_err(|e| {
            warn!(uid = principal.uid(), "rejecting profile: {e}");
        })?;

        let uid = principal.uid();
        let created = self.store.get(COLLECTION, uid).await?.is_none();
        let patch = changes.into_patch(!created, now);

        self.store
            .set(COLLECTION, uid, encode(&patch)?, true)
            .await?;

        info!(uid, created, "saved user profile");
        Ok(uid.to_string())
    }

    /// Fetch any user's profile.
    pub async fn get(&self, _principal: &Principal, id: &str) -> Result<UserProfile, ServiceError> {
        self.load(id).await?.ok_or_else(|| ServiceError::NotFound {
            kind: KIND,
            id: id.to_string(),
        })
    }

    /// Merge `fields` over the caller's existing profile.
    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        fields: &ProfileFields,
    ) -> Result<UserProfile, ServiceError> {
        ensure_owner(principal, id)?;

        let now = Utc::now();
        let changes = fields.validate(now)?;

        let current = self.load(id).await?.ok_or_else(|| ServiceError::NotFound {
            kind: KIND,
            id: id.to_string(),
        })?;
        let profile = changes.apply(Some(&current), now);

        self.store
            .update(COLLECTION, id, encode(&profile)?)
            .await
            .map_err(missing(KIND))?;

        info!(uid = id, "updated user profile");
        Ok(profile)
    }

    /// Delete the caller's profile.
    pub async fn delete(&self, principal: &Principal, id: &str) -> Result<(), ServiceError> {
        ensure_owner(principal, id)?;

        self.store
            .delete(COLLECTION, id)
            .await
            .map_err(missing(KIND))?;

        info!(uid = id, "deleted user profile");
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<UserProfile>, ServiceError> {
        match self.store.get(COLLECTION, id).await? {
            Some(document) => Ok(Some(document.decode()?)),
            None => Ok(None),
        }
    }
}

fn ensure_owner(principal: &Principal, id: &str) -> Result<(), ServiceError> {
    if principal.uid() == id {
        return Ok(());
    }

    warn!(uid = principal.uid(), target = id, "profile owned by another user");
    Err(ServiceError::Forbidden {
        kind: KIND,
        id: id.to_string(),
    })
}
