//! Error types for pvr-vr HTTP handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::valuation::ResolveError;

/// Message returned when the address parameter is missing or blank
pub const ADDRESS_REQUIRED: &str = "address query param is required";

const INTERNAL_ERROR: &str = "Internal error while fetching values";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Method other than GET/OPTIONS (405)
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Resolution failure
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Resolve(ResolveError::EmptyAddress) => {
                (StatusCode::BAD_REQUEST, json!({ "error": ADDRESS_REQUIRED }))
            }
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                json!({ "error": "Method not allowed" }),
            ),
            ApiError::Resolve(ref err @ ResolveError::Internal(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": INTERNAL_ERROR, "details": err.to_string() }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
