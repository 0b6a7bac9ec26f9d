use serde::Serialize;
use serde_json::{Number, Value, json};

/// A point as supplied by the client.
///
/// The original JSON numbers are kept so responses echo what was sent. The map
/// link renders them like a JavaScript template literal would: shortest
/// round-trip form, no trailing `.0` (`10.0` and `1e2` become `10` and `100`).
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    lat: Number,
    lon: Number,
    point: GeoPoint,
}

impl Coordinate {
    /// Returns `None` if either number has no `f64` representation.
    pub fn new(lat: Number, lon: Number) -> Option<Self> {
        let point = GeoPoint {
            lat: lat.as_f64()?,
            lon: lon.as_f64()?,
        };
        Some(Self { lat, lon, point })
    }

    pub fn from_degrees(lat: f64, lon: f64) -> Option<Self> {
        Self::new(Number::from_f64(lat)?, Number::from_f64(lon)?)
    }

    pub fn lat(&self) -> &Number {
        &self.lat
    }

    pub fn lon(&self) -> &Number {
        &self.lon
    }

    pub fn point(&self) -> GeoPoint {
        self.point
    }

    /// Google Maps deep link centered on the untransformed coordinate.
    pub fn maps_link(&self) -> String {
        format!(
            "https://www.google.com/maps?q={},{}",
            display_number(&self.lat),
            display_number(&self.lon)
        )
    }
}

/// Integers print as-is; floats use `f64`'s shortest round-trip `Display`,
/// which omits a trailing `.0`. Negative zero prints as `0`.
fn display_number(n: &Number) -> String {
    match n.as_f64() {
        Some(v) if n.is_f64() => {
            if v == 0.0 {
                "0".to_string()
            } else {
                v.to_string()
            }
        }
        _ => n.to_string(),
    }
}

/// Numeric point geometry, longitude first as in GeoJSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn to_geojson(self) -> Value {
        json!({ "type": "Point", "coordinates": [self.lon, self.lat] })
    }
}

/// Near-infrared and red reflectance of a single pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandSample {
    pub nir: f64,
    pub red: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_link_keeps_integer_formatting() {
        let c = Coordinate::new(Number::from(10), Number::from(20)).unwrap();
        assert_eq!(c.maps_link(), "https://www.google.com/maps?q=10,20");
    }

    #[test]
    fn maps_link_keeps_decimal_formatting() {
        let c = Coordinate::from_degrees(37.77, -122.42).unwrap();
        assert_eq!(c.maps_link(), "https://www.google.com/maps?q=37.77,-122.42");
        assert_eq!(c.point(), GeoPoint { lon: -122.42, lat: 37.77 });
    }

    #[test]
    fn maps_link_drops_float_artifacts() {
        let body: Value = serde_json::from_str(r#"{"lat":10.0,"lon":1e2}"#).unwrap();
        let c = Coordinate::new(
            body["lat"].as_number().unwrap().clone(),
            body["lon"].as_number().unwrap().clone(),
        )
        .unwrap();
        assert_eq!(c.maps_link(), "https://www.google.com/maps?q=10,100");

        let c = Coordinate::from_degrees(-0.0, -45.5).unwrap();
        assert_eq!(c.maps_link(), "https://www.google.com/maps?q=0,-45.5");
    }

    #[test]
    fn geojson_is_lon_lat() {
        let p = GeoPoint { lon: 20.0, lat: 10.0 };
        assert_eq!(p.to_geojson(), json!({ "type": "Point", "coordinates": [20.0, 10.0] }));
    }

    #[test]
    fn non_finite_degrees_are_rejected() {
        assert!(Coordinate::from_degrees(f64::NAN, 0.0).is_none());
    }
}
