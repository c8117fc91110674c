//! Caching layer for token verification.
//!
//! Every protected request carries a bearer token, and the same token is
//! typically reused for an hour. Remembering successful verifications for
//! a short TTL avoids a provider round trip per request. Failures are not
//! cached, so a fixed token takes effect immediately.
//!
//! An entry never outlives the token itself: when the token is a JWT its
//! `exp` claim caps the entry's lifetime. A token revoked or an account
//! disabled at the provider is still accepted until its entry expires.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use moka::Expiry;
use moka::future::Cache as MokaCache;
use serde::Deserialize;
use tracing::debug;

use super::error::AuthError;
use super::{IdentityVerifier, Principal};

/// Configuration for the verification cache.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifierCacheConfig {
    /// Longest time a verification is remembered.
    pub ttl: Duration,

    /// Maximum number of cached tokens.
    pub max_capacity: u64,
}

impl Default for VerifierCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_capacity: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedPrincipal {
    principal: Principal,
    ttl: Duration,
}

/// Expires each entry after its own TTL.
struct PerEntryTtl;

impl Expiry<String, CachedPrincipal> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _token: &String,
        value: &CachedPrincipal,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// A verifier that remembers successful verifications of its inner verifier.
pub struct CachedVerifier<V> {
    inner: V,
    ttl: Duration,
    principals: MokaCache<String, CachedPrincipal>,
}

impl<V: IdentityVerifier> CachedVerifier<V> {
    /// Wrap a verifier with a cache built from `config`.
    pub fn new(inner: V, config: &VerifierCacheConfig) -> Self {
        let principals = MokaCache::builder()
            .expire_after(PerEntryTtl)
            .max_capacity(config.max_capacity)
            .build();

        Self {
            inner,
            ttl: config.ttl,
            principals,
        }
    }
}

#[async_trait]
impl<V: IdentityVerifier> IdentityVerifier for CachedVerifier<V> {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        if let Some(cached) = self.principals.get(token).await {
            return Ok(cached.principal);
        }

        let principal = self.inner.verify(token).await?;

        match entry_ttl(self.ttl, token_expiry(token), Utc::now()) {
            Some(ttl) => {
                debug!(uid = principal.uid(), ttl_secs = ttl.as_secs(), "caching verified token");
                self.principals
                    .insert(
                        token.to_string(),
                        CachedPrincipal {
                            principal: principal.clone(),
                            ttl,
                        },
                    )
                    .await;
            }
            None => debug!(uid = principal.uid(), "token expires now, not caching"),
        }

        Ok(principal)
    }
}

#[derive(Deserialize)]
struct Claims {
    exp: i64,
}

/// The `exp` claim of a JWT, or `None` if `token` is not one.
fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let &[_header, payload, _signature] = token.split('.').collect::<Vec<_>>().as_slice() else {
        return None;
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.exp, 0)
}

/// How long to remember a verification made at `now`. `None` when the
/// token has already expired.
fn entry_ttl(max: Duration, expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<Duration> {
    let Some(expires_at) = expires_at else {
        return Some(max);
    };

    let remaining = (expires_at - now).to_std().ok()?;
    if remaining.is_zero() {
        return None;
    }
    Some(remaining.min(max))
}
