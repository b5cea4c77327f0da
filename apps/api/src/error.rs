//! # API Error Types
//!
//! Every failure leaves the server as the same JSON envelope:
//!
//! ```text
//! { "message": "Cart is empty", "status": false, "error": "BUSINESS_RULE" }
//! ```
//!
//! ## Status Mapping
//! ```text
//! ┌───────────────────────────────┬────────┬───────────────────┐
//! │ Source                        │ Status │ error             │
//! ├───────────────────────────────┼────────┼───────────────────┤
//! │ ValidationError, bad JSON     │ 400    │ VALIDATION_ERROR  │
//! │ missing / invalid bearer      │ 401    │ UNAUTHORIZED      │
//! │ non-admin on /admin           │ 403    │ FORBIDDEN         │
//! │ *NotFound                     │ 404    │ NOT_FOUND         │
//! │ UniqueViolation, Conflict     │ 409    │ CONFLICT          │
//! │ coupon, negotiation, cart     │ 422    │ BUSINESS_RULE     │
//! │ distance provider             │ 502    │ UPSTREAM_ERROR    │
//! │ anything else                 │ 500    │ INTERNAL_ERROR    │
//! └───────────────────────────────┴────────┴───────────────────┘
//! ```
//! Internal details are logged, never returned.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use bazaar_core::{CoreError, ValidationError};
use bazaar_db::DbError;

use crate::auth::AuthError;
use crate::distance::DistanceError;

/// Category of an API failure. Decides the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    BusinessRule,
    Upstream,
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::Validation => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::BusinessRule => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::Upstream => StatusCode::BAD_GATEWAY,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Validation => "VALIDATION_ERROR",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::BusinessRule => "BUSINESS_RULE",
            ErrorCode::Upstream => "UPSTREAM_ERROR",
            ErrorCode::Internal => "INTERNAL_ERROR",
        }
    }
}

/// A failed request.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    status: bool,
    error: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: &self.message,
            status: false,
            error: self.code.as_str(),
        };
        (self.code.status(), Json(body)).into_response()
    }
}

/// Result type for handlers and services.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            e if e.is_not_found() => ErrorCode::NotFound,
            CoreError::LineNotInCart(_) | CoreError::OfferItemNotFound(_) => ErrorCode::NotFound,

            CoreError::Validation(_)
            | CoreError::CartTooLarge { .. }
            | CoreError::QuantityTooLarge { .. } => ErrorCode::Validation,

            CoreError::OfferItemExists(_) => ErrorCode::Conflict,

            _ => ErrorCode::BusinessRule,
        };

        // Validation(..) would otherwise read "Validation error: quantity must be positive"
        let message = match err {
            CoreError::Validation(inner) => inner.to_string(),
            other => other.to_string(),
        };
        ApiError::new(code, message)
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::not_found(err.to_string()),
            DbError::UniqueViolation { .. } | DbError::Conflict { .. } => {
                ApiError::new(ErrorCode::Conflict, err.to_string())
            }
            DbError::ForeignKeyViolation { .. } => {
                warn!(error = %err, "Foreign key violation");
                ApiError::validation("Referenced record does not exist")
            }
            other => {
                error!(error = %other, "Database error");
                ApiError::internal("A database error occurred")
            }
        }
    }
}

impl From<DistanceError> for ApiError {
    fn from(err: DistanceError) -> Self {
        warn!(error = %err, "Distance lookup failed");
        ApiError::new(ErrorCode::Upstream, "Could not compute the delivery route")
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let code = match err {
            AuthError::Forbidden => ErrorCode::Forbidden,
            AuthError::TokenCreation(_) => {
                error!(error = %err, "Token creation failed");
                return ApiError::internal("Could not issue token");
            }
            _ => ErrorCode::Unauthorized,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_statuses() {
        let cases = [
            (CoreError::ProductNotFound("p".into()), StatusCode::NOT_FOUND),
            (CoreError::EmptyCart, StatusCode::UNPROCESSABLE_ENTITY),
            (
                CoreError::NegotiationExhausted {
                    product_id: "p".into(),
                    max: 3,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                CoreError::QuantityTooLarge {
                    requested: 1000,
                    max: 999,
                },
                StatusCode::BAD_REQUEST,
            ),
            (CoreError::OfferItemExists("p".into()), StatusCode::CONFLICT),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_validation_message_is_unwrapped() {
        let err: ApiError = CoreError::Validation(ValidationError::MustBePositive {
            field: "amount".into(),
        })
        .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "amount must be positive");
    }

    #[test]
    fn test_db_errors_hide_internals() {
        let err: ApiError = DbError::QueryFailed("no such column: secret".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("secret"));

        let err: ApiError = DbError::conflict("Cart", "c-1").into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_auth_errors() {
        assert_eq!(
            ApiError::from(AuthError::MissingToken).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::Forbidden).status(),
            StatusCode::FORBIDDEN
        );
    }
}
