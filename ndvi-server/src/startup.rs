//! One attempt at an Earth Engine session, turned into the router's state.

use ndvi_core::{
    Config, Evaluator, SessionError,
    platform::{EarthEngine, auth::ServiceAccount},
};
use std::sync::Arc;
use tracing::error;

use crate::AppState;

/// A failed session still yields a serving process; lookups are refused
/// with 503 instead of attempting doomed remote calls.
///
/// `service_account` is the raw `SERVICE_ACCOUNT` value, if set.
pub async fn build_state(config: &Config, service_account: Option<String>) -> AppState {
    let zeros = config.validation.zero_coordinates;

    match connect(config, service_account).await {
        Ok(session) => {
            let evaluator = Evaluator::new(
                Arc::new(session),
                config.imagery.clone(),
                config.earth_engine.timeout(),
            );
            AppState::ready(evaluator, zeros)
        }
        Err(err) => {
            error!(error = %err, "Earth Engine initialization failed, NDVI requests will be refused");
            AppState::not_ready(err.to_string(), zeros)
        }
    }
}

/// Bounded by the configured deadline, like every lookup.
pub async fn connect(config: &Config, service_account: Option<String>) -> Result<EarthEngine, SessionError> {
    let account = ServiceAccount::load(&config.earth_engine, service_account)?;
    let deadline = config.earth_engine.timeout();

    tokio::time::timeout(deadline, EarthEngine::connect(&config.earth_engine, &account))
        .await
        .map_err(|_| SessionError::Timeout(deadline))?
}
