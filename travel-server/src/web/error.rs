//! Application error type and its HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use super::dto::ErrorResponse;
use crate::auth::AuthError;
use crate::service::ServiceError;

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    Unauthorized { message: String },
    Forbidden { message: String },
    NotFound { message: String },
    /// Detail is logged, never sent to the client.
    Internal { message: String },
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(_) | ServiceError::Profile(_) => AppError::BadRequest {
                message: e.to_string(),
            },
            ServiceError::NotFound { .. } => AppError::NotFound {
                message: e.to_string(),
            },
            ServiceError::Forbidden { .. } => AppError::Forbidden {
                message: "Forbidden".to_string(),
            },
            ServiceError::Store(_) => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken | AuthError::InvalidToken => AppError::Unauthorized {
                message: "Unauthorized".to_string(),
            },
            // Could not reach a verdict; still refuse the request
            AuthError::Http(_) | AuthError::Provider { .. } => {
                error!("token verification failed: {e}");
                AppError::Unauthorized {
                    message: "Unauthorized".to_string(),
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::Unauthorized { message } => (StatusCode::UNAUTHORIZED, message),
            AppError::Forbidden { message } => (StatusCode::FORBIDDEN, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Internal { message } => {
                error!("internal error: {message}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        if status.is_client_error() {
            warn!(%status, "{message}");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
