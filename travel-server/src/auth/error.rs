//! Authentication error types.

/// Errors from bearer-token verification.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization: Bearer ...` header
    #[error("missing bearer token")]
    MissingToken,

    /// The identity provider rejected the token
    #[error("invalid or expired token")]
    InvalidToken,

    /// HTTP request to the identity provider failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The identity provider answered with an unexpected status or body
    #[error("identity provider error {status}: {message}")]
    Provider { status: u16, message: String },
}
