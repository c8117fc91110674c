//! Firebase Identity Toolkit client.
//!
//! Verifies Firebase ID tokens with the `accounts:lookup` endpoint: the
//! provider checks the token signature and expiry and returns the account
//! it belongs to.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::error::AuthError;
use super::{IdentityVerifier, Principal};

/// Default base URL for the Identity Toolkit API.
const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Configuration for the Identity Toolkit client.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityToolkitConfig {
    /// Firebase Web API key
    pub api_key: String,
    /// Base URL for the API (defaults to production)
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl IdentityToolkitConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
        }
    }

    /// Set a custom base URL (auth emulator or testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    disabled: bool,
}

/// Verifies ID tokens against Firebase Identity Toolkit.
#[derive(Debug, Clone)]
pub struct IdentityToolkitVerifier {
    http: reqwest::Client,
    lookup_url: String,
    api_key: String,
}

impl IdentityToolkitVerifier {
    /// Create a new client with the given configuration.
    pub fn new(config: IdentityToolkitConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            lookup_url: format!(
                "{}/accounts:lookup",
                config.base_url.trim_end_matches('/')
            ),
            api_key: config.api_key,
        })
    }
}

#[async_trait]
impl IdentityVerifier for IdentityToolkitVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let response = self
            .http
            .post(&self.lookup_url)
            .query(&[("key", &self.api_key)])
            .json(&json!({ "idToken": token }))
            .send()
            .await?;

        let status = response.status();

        // INVALID_ID_TOKEN, TOKEN_EXPIRED, USER_NOT_FOUND...
        if status == StatusCode::BAD_REQUEST {
            return Err(AuthError::InvalidToken);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Provider {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        let lookup: LookupResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::Provider {
                status: status.as_u16(),
                message: format!("unexpected lookup response: {e}"),
            })?;

        principal_from(lookup)
    }
}

fn principal_from(lookup: LookupResponse) -> Result<Principal, AuthError> {
    let user = lookup
        .users
        .into_iter()
        .next()
        .ok_or(AuthError::InvalidToken)?;

    if user.disabled {
        warn!(uid = %user.local_id, "rejecting token of disabled account");
        return Err(AuthError::InvalidToken);
    }

    Ok(Principal::new(user.local_id))
}
