//! Server configuration from environment variables.

use std::env;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::auth::{IdentityToolkitConfig, StaticVerifier, VerifierCacheConfig};
use crate::service::PlanRules;
use crate::store::FirestoreConfig;

/// Errors from reading the configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but cannot be used
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// A variable the chosen backend needs is not set
    #[error("{key} must be set when {needed_by}")]
    Missing {
        key: &'static str,
        needed_by: &'static str,
    },
}

/// Where documents are kept.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    /// In-process store, optionally mirrored to a JSON file
    Memory { snapshot: Option<PathBuf> },
    Firestore(FirestoreConfig),
}

/// How bearer tokens are verified.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthBackend {
    Firebase(IdentityToolkitConfig),
    /// Fixed token table, for development
    Static(StaticVerifier),
}

/// Everything `main` needs to start the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub store: StoreBackend,
    pub auth: AuthBackend,
    pub token_cache: VerifierCacheConfig,
    pub rules: PlanRules,
}

impl ServerConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = parse_or(&var, "HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?;
        let port = parse_or(&var, "PORT", 3000)?;
        // Upper bound on how long a revoked token or disabled account keeps
        // working; JWT expiry still caps each entry.
        let ttl_secs: u64 = parse_or(&var, "TOKEN_CACHE_TTL_SECS", 300)?;
        let require_end_date = match var("REQUIRE_END_DATE") {
            Some(value) => parse_bool("REQUIRE_END_DATE", &value)?,
            None => true,
        };

        Ok(Self {
            host,
            port,
            store: store_backend(&var)?,
            auth: auth_backend(&var)?,
            token_cache: VerifierCacheConfig {
                ttl: Duration::from_secs(ttl_secs),
                ..VerifierCacheConfig::default()
            },
            rules: PlanRules { require_end_date },
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

fn store_backend(var: &impl Fn(&str) -> Option<String>) -> Result<StoreBackend, ConfigError> {
    let kind = match var("STORE") {
        Some(kind) => kind.trim().to_ascii_lowercase(),
        None if var("FIRESTORE_PROJECT_ID").is_some() => "firestore".to_string(),
        None => "memory".to_string(),
    };

    match kind.as_str() {
        "memory" => Ok(StoreBackend::Memory {
            snapshot: var("MEMORY_STORE_PATH").map(PathBuf::from),
        }),
        "firestore" => {
            let project_id = var("FIRESTORE_PROJECT_ID").ok_or(ConfigError::Missing {
                key: "FIRESTORE_PROJECT_ID",
                needed_by: "STORE=firestore",
            })?;

            let mut config = FirestoreConfig::new(project_id);
            if let Some(url) = var("FIRESTORE_BASE_URL") {
                config = config.with_base_url(url);
            }
            if let Some(token) = var("FIRESTORE_ACCESS_TOKEN") {
                config = config.with_access_token(token);
            }
            Ok(StoreBackend::Firestore(config))
        }
        _ => Err(ConfigError::Invalid {
            key: "STORE",
            value: kind,
            reason: "expected memory or firestore".to_string(),
        }),
    }
}

fn auth_backend(var: &impl Fn(&str) -> Option<String>) -> Result<AuthBackend, ConfigError> {
    let kind = match var("AUTH") {
        Some(kind) => kind.trim().to_ascii_lowercase(),
        None if var("FIREBASE_API_KEY").is_some() => "firebase".to_string(),
        None => "static".to_string(),
    };

    match kind.as_str() {
        "firebase" => {
            let api_key = var("FIREBASE_API_KEY").ok_or(ConfigError::Missing {
                key: "FIREBASE_API_KEY",
                needed_by: "AUTH=firebase",
            })?;
            Ok(AuthBackend::Firebase(IdentityToolkitConfig::new(api_key)))
        }
        "static" => {
            let tokens = var("STATIC_TOKENS").unwrap_or_default();
            Ok(AuthBackend::Static(parse_static_tokens(&tokens)?))
        }
        _ => Err(ConfigError::Invalid {
            key: "AUTH",
            value: kind,
            reason: "expected firebase or static".to_string(),
        }),
    }
}

/// Parse `token=uid,token=uid`.
fn parse_static_tokens(pairs: &str) -> Result<StaticVerifier, ConfigError> {
    pairs.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .try_fold(StaticVerifier::new(), |verifier, pair| {
            match pair.split_once('=') {
                Some((token, uid)) if !token.trim().is_empty() && !uid.trim().is_empty() => {
                    Ok(verifier.with_token(token.trim(), uid.trim()))
                }
                _ => Err(ConfigError::Invalid {
                    key: "STATIC_TOKENS",
                    value: pair.to_string(),
                    reason: "expected token=uid".to_string(),
                }),
            }
        })
}
