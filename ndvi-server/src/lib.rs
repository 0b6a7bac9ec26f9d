//! HTTP surface of the vegetation health service.
//!
//! The binary in `main.rs` wires configuration and logging; this library
//! holds the router and the startup session attempt, so both can be driven in
//! tests with any [`ndvi_core::ImageryPlatform`] or a local token endpoint.

pub mod app;
pub mod error;
pub mod routes;
pub mod startup;

pub use app::{AppState, Readiness, router};
pub use error::ApiError;
pub use startup::build_state;
