//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use domain::DomainError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// No valid identity on the request.
    Unauthorized(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Store or domain failure.
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Store(err) => store_error_to_response(err),
        };

        let body = serde_json::json!({ "message": message });
        (status, axum::Json(body)).into_response()
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, String) {
    match &err {
        StoreError::Domain(domain_err) => match domain_err {
            DomainError::EmptyCart
            | DomainError::IllegalTransition { .. }
            | DomainError::CancelNotAllowed { .. }
            | DomainError::Validation(_)
            | DomainError::UnknownStatus(_)
            | DomainError::InvalidRating { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
            // An inactive medicine is hidden from the catalog, so it
            // surfaces the same way as a missing one.
            DomainError::MedicineUnavailable { .. } => (StatusCode::NOT_FOUND, err.to_string()),
            DomainError::InsufficientStock { .. } => (StatusCode::CONFLICT, err.to_string()),
            DomainError::Forbidden(_) | DomainError::ReviewNotAllowed => {
                (StatusCode::FORBIDDEN, err.to_string())
            }
        },
        StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        StoreError::DuplicateReview => (StatusCode::CONFLICT, err.to_string()),
        StoreError::Database(_) | StoreError::Migration(_) => {
            tracing::error!(error = %err, "store failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Store(StoreError::Domain(err))
    }
}
