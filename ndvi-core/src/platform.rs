use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

use crate::model::{BandSample, GeoPoint};

pub mod auth;
pub mod earthengine;

pub use earthengine::EarthEngine;

/// Image search: one collection, one point, one acquisition window.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageQuery {
    pub collection: String,
    pub point: GeoPoint,
    /// Inclusive.
    pub start: DateTime<Utc>,
    /// Exclusive.
    pub end: DateTime<Utc>,
    /// Image property ranking candidates, lowest first.
    pub cloud_property: String,
}

/// A selected image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageHandle {
    pub id: String,
    pub cloud_cover: Option<f64>,
}

/// Point sample of two bands, reduced with "first value" at a fixed scale.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRequest {
    pub image_id: String,
    pub nir_band: String,
    pub red_band: String,
    pub point: GeoPoint,
    /// Nominal pixel size in meters.
    pub scale: f64,
    pub max_pixels: f64,
}

/// Remote imagery backend.
///
/// Both operations report "nothing there" as `Ok(None)`; `Err` is reserved
/// for communication, authentication and protocol failures.
#[async_trait]
pub trait ImageryPlatform: Send + Sync + Debug {
    /// The image with the lowest cloud cover matching `query`, if any.
    async fn least_cloudy_image(&self, query: &ImageQuery) -> anyhow::Result<Option<ImageHandle>>;

    /// NIR and red values at the requested point; `None` if masked or empty.
    async fn sample_bands(&self, request: &SampleRequest) -> anyhow::Result<Option<BandSample>>;
}

/// Pick the lowest cloud cover; images without the property rank last and
/// ties keep the earlier image.
pub fn least_cloudy<I>(images: I) -> Option<ImageHandle>
where
    I: IntoIterator<Item = ImageHandle>,
{
    images.into_iter().fold(None, |best, candidate| match best {
        None => Some(candidate),
        Some(best) => {
            if cloud_rank(&candidate) < cloud_rank(&best) {
                Some(candidate)
            } else {
                Some(best)
            }
        }
    })
}

fn cloud_rank(image: &ImageHandle) -> f64 {
    image.cloud_cover.filter(|c| !c.is_nan()).unwrap_or(f64::INFINITY)
}
