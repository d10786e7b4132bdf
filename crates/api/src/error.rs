//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side
//! errors to Sentry before responding to the client. All route
//! handlers return `Result<T, AppError>`.
//!
//! The mapping implements the pipeline's taxonomy: validation and
//! not-found errors return immediately with detail; payment-provider
//! errors are classified before they reach the client; raw provider
//! and database detail never leaks.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::payment::PaymentError;
use crate::store::StoreError;

/// One violated input field, for collect-all validation errors.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    /// Convenience constructor.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Input validation failed; every violation is listed.
    #[error("validation failed ({} field(s))", .0.len())]
    Validation(Vec<FieldViolation>),

    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Payment provider operation failed.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing or invalid bearer token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Valid token, insufficient role.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error body returned to clients.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<FieldViolation>>,
}

impl AppError {
    fn is_server_error(&self) -> bool {
        match self {
            Self::Internal(_) => true,
            Self::Store(err) => matches!(
                err,
                StoreError::Database(_) | StoreError::DataCorruption(_)
            ),
            Self::Payment(err) => matches!(
                err,
                PaymentError::Api(_)
                    | PaymentError::Connection(_)
                    | PaymentError::Auth(_)
                    | PaymentError::Other(_)
            ),
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(err) => match err {
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                StoreError::Conflict(_) => StatusCode::CONFLICT,
                StoreError::Cart(_)
                | StoreError::AlreadyPaid(_)
                | StoreError::AlreadyDelivered(_) => StatusCode::BAD_REQUEST,
                StoreError::Database(_) | StoreError::DataCorruption(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Payment(err) => match err {
                PaymentError::Card(_) => StatusCode::PAYMENT_REQUIRED,
                PaymentError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                PaymentError::Auth(_) => StatusCode::FORBIDDEN,
                PaymentError::Api(_) | PaymentError::Connection(_) => StatusCode::BAD_GATEWAY,
                PaymentError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// The message exposed to clients. Server-side detail stays in
    /// the logs.
    fn client_message(&self) -> String {
        match self {
            Self::Validation(_) => "validation failed".to_owned(),
            Self::Internal(_) => "internal server error".to_owned(),
            Self::Store(err) => match err {
                StoreError::Database(_) | StoreError::DataCorruption(_) => {
                    "internal server error".to_owned()
                }
                other => other.to_string(),
            },
            Self::Payment(err) => match err {
                // User-fixable; the provider's message is safe to show.
                PaymentError::Card(message) => message.clone(),
                PaymentError::InvalidRequest(message) => message.clone(),
                PaymentError::Api(_) | PaymentError::Connection(_) => {
                    "payment provider unavailable, please try again".to_owned()
                }
                PaymentError::Auth(_) => "payment configuration error".to_owned(),
                PaymentError::Other(_) => "internal server error".to_owned(),
            },
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server-class errors to Sentry; everything else is
        // client error noise.
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "request error"
            );
        }

        let fields = match &self {
            Self::Validation(violations) => Some(violations.clone()),
            _ => None,
        };

        let body = ErrorBody {
            error: self.client_message(),
            fields,
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
