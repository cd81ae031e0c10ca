//! API error types with structured JSON responses, plus the auth-flow
//! outcome taxonomy used by the redirect handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::api::route_class::{COMPLETE_PROFILE_PATH, ERROR_PATH};
use crate::db::DatabaseError;
use crate::identity::ProviderError;
use crate::session::SessionError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Identity provider unavailable")]
    ProviderUnavailable,
    #[error("Identity provider rejected the request: {0}")]
    UpstreamRejected(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required".to_string(),
            ),
            ApiError::Forbidden(detail) => (StatusCode::FORBIDDEN, "FORBIDDEN", detail.clone()),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::ProviderUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "PROVIDER_UNAVAILABLE",
                "Sign-in service is temporarily unavailable".to_string(),
            ),
            ApiError::UpstreamRejected(detail) => {
                tracing::warn!(detail, "identity provider rejected request");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_REJECTED",
                    "Sign-in service rejected the request".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        if err.is_unavailable() {
            tracing::warn!(error = %err, "identity provider unavailable");
            ApiError::ProviderUnavailable
        } else {
            ApiError::UpstreamRejected(err.to_string())
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Provider(e) => e.into(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Auth flow outcomes
// ═══════════════════════════════════════════════════════════

/// Failure classes of the sign-in flow.
///
/// Routing: `MissingCredential` and `ExchangeFailure` end on the error page;
/// `EnrichmentFailure` is logged and the flow continues; `UnresolvedRole`
/// goes to profile completion; `Transport` fails open at the edge and ends
/// on the error page as `callback_error` inside the callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthFlowError {
    #[error("No authorization code or session present")]
    MissingCredential,
    #[error("Authorization code rejected: {0}")]
    ExchangeFailure(String),
    #[error("Account metadata update failed: {0}")]
    EnrichmentFailure(String),
    #[error("Identity carries no valid role")]
    UnresolvedRole,
    #[error("Identity provider unavailable: {0}")]
    Transport(String),
}

impl AuthFlowError {
    /// Classify a failed code exchange.
    pub fn from_exchange(err: ProviderError) -> Self {
        if err.is_unavailable() {
            Self::Transport(err.to_string())
        } else {
            Self::ExchangeFailure(err.to_string())
        }
    }

    /// Tag shown on the error page (`/auth/error?error=<tag>`).
    pub fn error_tag(&self) -> Option<&'static str> {
        match self {
            Self::MissingCredential => Some("missing_code"),
            Self::ExchangeFailure(_) => Some("exchange_error"),
            Self::Transport(_) => Some("callback_error"),
            Self::EnrichmentFailure(_) | Self::UnresolvedRole => None,
        }
    }

    /// Where a terminal outcome sends the browser. `None` means the flow continues.
    pub fn redirect_target(&self) -> Option<String> {
        match self {
            Self::UnresolvedRole => Some(COMPLETE_PROFILE_PATH.to_string()),
            other => other
                .error_tag()
                .map(|tag| format!("{ERROR_PATH}?error={tag}")),
        }
    }
}
