use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ndvi_core::{RemoteError, ValidationError};
use serde_json::json;
use std::any::Any;

/// Every failure a handler can report. Always rendered as JSON.
#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    Remote(RemoteError),
    NotReady(String),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<RemoteError> for ApiError {
    fn from(err: RemoteError) -> Self {
        ApiError::Remote(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": ValidationError::MESSAGE })),
            )
                .into_response(),
            ApiError::Remote(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to compute NDVI", "details": err.to_string() })),
            )
                .into_response(),
            ApiError::NotReady(reason) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "Service not ready", "details": reason })),
            )
                .into_response(),
        }
    }
}

/// Converts a handler panic into the generic `Server error` body.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!(%details, "handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Server error", "details": details })),
    )
        .into_response()
}
