//! Core library for the `ndvi-server` service.
//!
//! This crate defines:
//! - Configuration & service-account credentials handling
//! - Coordinate validation and the vegetation index contract
//! - Abstraction over imagery platforms, with an Earth Engine client
//!
//! It is used by `ndvi-server`, but the evaluator can be driven by any
//! [`ImageryPlatform`] implementation.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod ndvi;
pub mod platform;
pub mod validate;

pub use config::{Config, EarthEngineConfig, ImageryConfig, ServerConfig};
pub use error::{RemoteError, SessionError, ValidationError};
pub use evaluator::Evaluator;
pub use model::{BandSample, Coordinate, GeoPoint};
pub use ndvi::{NdviReport, VegetationCategory, VegetationIndex};
pub use platform::{ImageHandle, ImageQuery, ImageryPlatform, SampleRequest};
pub use validate::{ZeroCoordinates, validate};
