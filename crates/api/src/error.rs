//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use route_store::StoreError;
use routing::{DomainError, TemplateError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Routing error.
    Domain(DomainError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match &err {
        DomainError::Route(route_err) if route_err.is_state_conflict() => StatusCode::CONFLICT,
        DomainError::Route(_) => StatusCode::BAD_REQUEST,
        DomainError::Template(TemplateError::NoMatchingTemplate { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        DomainError::Template(_) => StatusCode::BAD_REQUEST,
        DomainError::RouteNotFound(_) | DomainError::Store(StoreError::RouteNotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        DomainError::Store(
            StoreError::ConcurrencyConflict { .. } | StoreError::DuplicateRoute(_),
        ) => StatusCode::CONFLICT,
        DomainError::Store(_)
        | DomainError::IncompleteOutboxMessage { .. }
        | DomainError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}
