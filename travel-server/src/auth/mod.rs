//! Bearer-token authentication.
//!
//! Token verification is delegated to an external identity provider. The
//! rest of the crate only sees the [`Principal`] it returns.

mod cache;
mod error;
mod identity_toolkit;

use std::collections::HashMap;

use async_trait::async_trait;

pub use cache::{CachedVerifier, VerifierCacheConfig};
pub use error::AuthError;
pub use identity_toolkit::{IdentityToolkitConfig, IdentityToolkitVerifier};

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    uid: String,
}

impl Principal {
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into() }
    }

    /// The identity provider's user id.
    pub fn uid(&self) -> &str {
        &self.uid
    }
}

/// Turns a bearer token into a principal.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError>;
}

/// Extract the token from an `Authorization` header value.
///
/// # Examples
///
/// ```
/// use travel_server::auth::bearer_token;
///
/// assert_eq!(bearer_token("Bearer abc").unwrap(), "abc");
/// assert!(bearer_token("Basic abc").is_err());
/// assert!(bearer_token("Bearer ").is_err());
/// ```
pub fn bearer_token(header: &str) -> Result<&str, AuthError> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Verifier backed by a fixed token → uid table.
///
/// For local development and tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticVerifier {
    tokens: HashMap<String, String>,
}

impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as `uid`.
    pub fn with_token(mut self, token: impl Into<String>, uid: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), uid.into());
        self
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        self.tokens
            .get(token)
            .map(Principal::new)
            .ok_or(AuthError::InvalidToken)
    }
}
