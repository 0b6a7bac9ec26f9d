use std::{sync::Arc, time::Duration};

use crate::{
    config::ImageryConfig,
    error::RemoteError,
    model::Coordinate,
    ndvi::NdviReport,
    platform::ImageryPlatform,
};

/// Turns a validated coordinate into an [`NdviReport`].
///
/// Holds no per-request state; clones share the same platform session.
#[derive(Debug, Clone)]
pub struct Evaluator {
    platform: Arc<dyn ImageryPlatform>,
    imagery: ImageryConfig,
    deadline: Duration,
}

impl Evaluator {
    pub fn new(platform: Arc<dyn ImageryPlatform>, imagery: ImageryConfig, deadline: Duration) -> Self {
        Self {
            platform,
            imagery,
            deadline,
        }
    }

    /// One lookup, bounded by the deadline. Never retried.
    #[tracing::instrument(skip_all, fields(lat = %coordinate.lat(), lon = %coordinate.lon()))]
    pub async fn evaluate(&self, coordinate: &Coordinate) -> Result<NdviReport, RemoteError> {
        let report = tokio::time::timeout(self.deadline, self.lookup(coordinate))
            .await
            .map_err(|_| RemoteError::Timeout(self.deadline))?
            .map_err(RemoteError::Platform)?;

        match &report {
            NdviReport::Available { ndvi, status, .. } => {
                tracing::info!(ndvi = %ndvi, status = %status, "vegetation index computed");
            }
            NdviReport::Unavailable { .. } => tracing::info!("no usable sample"),
        }

        Ok(report)
    }

    async fn lookup(&self, coordinate: &Coordinate) -> anyhow::Result<NdviReport> {
        let point = coordinate.point();
        let query = self.imagery.query_for(point);

        let Some(image) = self.platform.least_cloudy_image(&query).await? else {
            tracing::debug!(collection = %query.collection, "no image intersects the point");
            return Ok(NdviReport::unavailable(coordinate));
        };

        tracing::debug!(image = %image.id, cloud_cover = ?image.cloud_cover, "selected image");

        let request = self.imagery.sample_for(&image, point);
        let sample = self.platform.sample_bands(&request).await?;

        Ok(NdviReport::from_sample(coordinate, sample))
    }
}
