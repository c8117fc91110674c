//! Bearer-token middleware.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use super::error::AppError;
use super::state::AppState;
use crate::auth::{AuthError, bearer_token};

/// Verify the bearer token and attach the [`Principal`](crate::auth::Principal)
/// to the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let principal = state.verifier.verify(bearer_token(header)?).await?;
    debug!(uid = principal.uid(), "authenticated request");

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}
