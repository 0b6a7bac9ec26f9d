use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ndvi_core::{NdviReport, validate};
use serde_json::Value;

use crate::{
    app::{AppState, Readiness},
    error::ApiError,
};

/// GET / — liveness.
pub async fn root() -> &'static str {
    "Backend is running!"
}

/// GET /ready — 200 once the imagery session is established.
pub async fn ready(State(state): State<AppState>) -> Response {
    match state.readiness() {
        Readiness::Ready(_) => (StatusCode::OK, "ready").into_response(),
        Readiness::NotReady(reason) => ApiError::NotReady(reason.clone()).into_response(),
    }
}

/// POST /get-ndvi
///
/// An unparseable body is treated like one without coordinates.
pub async fn get_ndvi(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<NdviReport>, ApiError> {
    let body = match body {
        Ok(Json(value)) => value,
        Err(rejection) => {
            tracing::debug!(%rejection, "unreadable request body");
            Value::Null
        }
    };

    let coordinate = validate(&body, state.zero_coordinates()).inspect_err(|err| {
        tracing::debug!(%err, "rejected request");
    })?;

    let evaluator = match state.readiness() {
        Readiness::Ready(evaluator) => evaluator,
        Readiness::NotReady(reason) => {
            tracing::warn!(%reason, "request refused, imagery session unavailable");
            return Err(ApiError::NotReady(reason.clone()));
        }
    };

    let report = evaluator.evaluate(&coordinate).await.inspect_err(|err| {
        tracing::error!(
            lat = %coordinate.lat(),
            lon = %coordinate.lon(),
            error = %err,
            "NDVI lookup failed"
        );
    })?;

    Ok(Json(report))
}
