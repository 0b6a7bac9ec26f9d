use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::{error::ValidationError, model::Coordinate};

/// Whether a literal `0` is an acceptable latitude/longitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroCoordinates {
    /// The equator and the prime meridian are ordinary coordinates.
    #[default]
    Accept,
    /// Treat `0` like a missing value, as a truthiness check would.
    Reject,
}

/// Extract a [`Coordinate`] from a `{ "lat": number, "lon": number }` body.
///
/// Values are passed through untransformed: no coercion, no range clamping.
pub fn validate(body: &Value, zeros: ZeroCoordinates) -> Result<Coordinate, ValidationError> {
    let obj = body.as_object().ok_or(ValidationError::NotAnObject)?;

    let lat = number_field(obj.get("lat"), "lat", zeros)?;
    let lon = number_field(obj.get("lon"), "lon", zeros)?;

    Coordinate::new(lat, lon).ok_or(ValidationError::NotANumber("lat"))
}

fn number_field(
    value: Option<&Value>,
    name: &'static str,
    zeros: ZeroCoordinates,
) -> Result<Number, ValidationError> {
    let n = match value {
        None | Some(Value::Null) => return Err(ValidationError::Missing(name)),
        Some(Value::Number(n)) => n,
        Some(_) => return Err(ValidationError::NotANumber(name)),
    };

    if zeros == ZeroCoordinates::Reject && n.as_f64() == Some(0.0) {
        return Err(ValidationError::Zero(name));
    }

    Ok(n.clone())
}
