//! Normalized difference vegetation index and its health classes.

use serde::{Serialize, Serializer};
use serde_json::Number;
use std::fmt;

use crate::model::{BandSample, Coordinate};

/// Lower bound (inclusive) of [`VegetationCategory::Moderate`].
pub const MODERATE_THRESHOLD: f64 = 0.30;
/// Lower bound (inclusive) of [`VegetationCategory::Healthy`].
pub const HEALTHY_THRESHOLD: f64 = 0.50;

pub const UNAVAILABLE_MESSAGE: &str = "Band values not available (clouds/no image)";

/// An NDVI value, always within `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct VegetationIndex(f64);

impl VegetationIndex {
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && (-1.0..=1.0).contains(&value)).then_some(Self(value))
    }

    /// `(nir - red) / (nir + red)`.
    ///
    /// `None` when the denominator is zero or the result leaves `[-1, 1]`,
    /// which only negative reflectance can cause.
    pub fn from_bands(sample: BandSample) -> Option<Self> {
        let sum = sample.nir + sample.red;
        if sum == 0.0 {
            return None;
        }
        Self::new((sample.nir - sample.red) / sum)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn category(self) -> VegetationCategory {
        VegetationCategory::classify(self)
    }

    /// Three decimal places, e.g. `"0.579"`.
    ///
    /// Exact binary midpoints round away from zero (`0.0625` gives `"0.063"`),
    /// as `Number.prototype.toFixed` does; `{:.3}` alone would round them to even.
    pub fn formatted(self) -> String {
        let sign = if self.0 < 0.0 { "-" } else { "" };
        let magnitude = self.0.abs();

        let magnitude = if is_midpoint_at_3(magnitude) {
            // Nudge off the midpoint so the nearest candidate is the larger one.
            magnitude + 0.000_25
        } else {
            magnitude
        };

        format!("{sign}{magnitude:.3}")
    }
}

/// True when `v` lies exactly halfway between two 3-decimal values.
///
/// Such midpoints are multiples of 1/16 in binary, so their decimal
/// expansion ends by the fourth place; 60 places leaves ample room.
fn is_midpoint_at_3(v: f64) -> bool {
    let expanded = format!("{v:.60}");
    let Some((_, frac)) = expanded.split_once('.') else {
        return false;
    };
    frac.as_bytes().get(3) == Some(&b'5') && frac.bytes().skip(4).all(|b| b == b'0')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VegetationCategory {
    Low,
    Moderate,
    Healthy,
}

impl VegetationCategory {
    /// Half-open bands: `[.., 0.30)`, `[0.30, 0.50)`, `[0.50, ..]`.
    pub fn classify(index: VegetationIndex) -> Self {
        let v = index.value();
        if v < MODERATE_THRESHOLD {
            VegetationCategory::Low
        } else if v < HEALTHY_THRESHOLD {
            VegetationCategory::Moderate
        } else {
            VegetationCategory::Healthy
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VegetationCategory::Low => "Low vegetation",
            VegetationCategory::Moderate => "Moderate vegetation",
            VegetationCategory::Healthy => "Healthy vegetation",
        }
    }
}

impl fmt::Display for VegetationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for VegetationCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Outcome of a lookup, serialized as the response body of `/get-ndvi`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NdviReport {
    Available {
        lat: Number,
        lon: Number,
        #[serde(rename = "NDVI")]
        ndvi: String,
        #[serde(rename = "VegetationStatus")]
        status: VegetationCategory,
        #[serde(rename = "GoogleMapsLink")]
        maps_link: String,
    },
    Unavailable {
        lat: Number,
        lon: Number,
        message: &'static str,
    },
}

impl NdviReport {
    pub fn from_sample(coordinate: &Coordinate, sample: Option<BandSample>) -> Self {
        match sample.and_then(VegetationIndex::from_bands) {
            Some(index) => Self::available(coordinate, index),
            None => Self::unavailable(coordinate),
        }
    }

    pub fn available(coordinate: &Coordinate, index: VegetationIndex) -> Self {
        NdviReport::Available {
            lat: coordinate.lat().clone(),
            lon: coordinate.lon().clone(),
            ndvi: index.formatted(),
            status: index.category(),
            maps_link: coordinate.maps_link(),
        }
    }

    pub fn unavailable(coordinate: &Coordinate) -> Self {
        NdviReport::Unavailable {
            lat: coordinate.lat().clone(),
            lon: coordinate.lon().clone(),
            message: UNAVAILABLE_MESSAGE,
        }
    }

    #[cfg(test)]
    pub fn is_available(&self) -> bool {
        matches!(self, NdviReport::Available { .. })
    }
}
