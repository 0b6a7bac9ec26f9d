use axum::{
    Router,
    routing::{get, post},
};
use ndvi_core::{Evaluator, ZeroCoordinates};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{error, routes};

/// Outcome of the startup session attempt. Decided once, never mutated.
#[derive(Debug)]
pub enum Readiness {
    Ready(Evaluator),
    NotReady(String),
}

/// Shared, read-only state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    readiness: Arc<Readiness>,
    zero_coordinates: ZeroCoordinates,
}

impl AppState {
    pub fn ready(evaluator: Evaluator, zero_coordinates: ZeroCoordinates) -> Self {
        Self {
            readiness: Arc::new(Readiness::Ready(evaluator)),
            zero_coordinates,
        }
    }

    pub fn not_ready(reason: impl Into<String>, zero_coordinates: ZeroCoordinates) -> Self {
        Self {
            readiness: Arc::new(Readiness::NotReady(reason.into())),
            zero_coordinates,
        }
    }

    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    pub fn zero_coordinates(&self) -> ZeroCoordinates {
        self.zero_coordinates
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/ready", get(routes::ready))
        .route("/get-ndvi", post(routes::get_ndvi))
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
