//! Geopoint normalization for `locations`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RecordError, RecordResult};

const GEOHASH_ALPHABET: &str = "0123456789bcdefghjkmnpqrstuvwxyz";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> RecordResult<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(RecordError::InvalidGeo(format!("latitude {lat} out of range")));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(RecordError::InvalidGeo(format!("longitude {lon} out of range")));
        }
        Ok(Self { lat, lon })
    }

    /// Parse one point from JSON: `[lat, lon]`, `["lat", "lon"]`, `{"lat", "lon"}`,
    /// or any string form accepted by [`FromStr`].
    pub fn from_value(value: &Value) -> RecordResult<Self> {
        match value {
            Value::String(s) => s.parse(),
            Value::Array(items) => match pair(items) {
                Some((lat, lon)) => Self::new(lat, lon),
                None => Err(RecordError::InvalidGeo(value.to_string())),
            },
            Value::Object(map) => {
                let lat = map.get("lat").and_then(scalar);
                let lon = map.get("lon").or_else(|| map.get("lng")).and_then(scalar);
                match (lat, lon) {
                    (Some(lat), Some(lon)) => Self::new(lat, lon),
                    _ => Err(RecordError::InvalidGeo(value.to_string())),
                }
            }
            other => Err(RecordError::InvalidGeo(other.to_string())),
        }
    }

    fn from_wkt(body: &str) -> RecordResult<Self> {
        let inner = body
            .trim()
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(|| RecordError::InvalidGeo(format!("POINT{body}")))?;
        let coords: Vec<f64> = inner
            .split_whitespace()
            .map(|c| c.parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| RecordError::InvalidGeo(e.to_string()))?;
        match coords.as_slice() {
            // WKT is x/y, i.e. lon first.
            [lon, lat] => Self::new(*lat, *lon),
            _ => Err(RecordError::InvalidGeo(format!("POINT{body}"))),
        }
    }

    fn from_geohash(hash: &str) -> RecordResult<Self> {
        let (coord, _, _) =
            geohash::decode(hash).map_err(|e| RecordError::InvalidGeo(e.to_string()))?;
        Self::new(coord.y, coord.x)
    }
}

impl FromStr for GeoPoint {
    type Err = RecordError;

    /// `"lat, lon"`, WKT `POINT(lon lat)`, or a geohash.
    fn from_str(raw: &str) -> RecordResult<Self> {
        let s = raw.trim();

        if let Some((lat, lon)) = s.split_once(',') {
            let lat = lat.trim().parse::<f64>();
            let lon = lon.trim().parse::<f64>();
            return match (lat, lon) {
                (Ok(lat), Ok(lon)) => Self::new(lat, lon),
                _ => Err(RecordError::InvalidGeo(raw.to_string())),
            };
        }

        if let Some(prefix) = s.get(..5) {
            if prefix.eq_ignore_ascii_case("point") {
                return Self::from_wkt(&s[5..]);
            }
        }

        let lowered = s.to_lowercase();
        if !lowered.is_empty()
            && lowered.len() <= 12
            && lowered.chars().all(|c| GEOHASH_ALPHABET.contains(c))
        {
            return Self::from_geohash(&lowered);
        }

        Err(RecordError::InvalidGeo(raw.to_string()))
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.lat, self.lon)
    }
}

/// Normalize a `locations` value: null, one point in any form, or an array of points.
pub fn locations_from_value(value: &Value) -> RecordResult<Vec<GeoPoint>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) if pair(items).is_some() => Ok(vec![GeoPoint::from_value(value)?]),
        Value::Array(items) => items.iter().map(GeoPoint::from_value).collect(),
        single => Ok(vec![GeoPoint::from_value(single)?]),
    }
}

/// A two-element array of numbers or numeric strings.
fn pair(items: &[Value]) -> Option<(f64, f64)> {
    match items {
        [a, b] => Some((scalar(a)?, scalar(b)?)),
        _ => None,
    }
}

fn scalar(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn close(p: GeoPoint, lat: f64, lon: f64) -> bool {
        (p.lat - lat).abs() < 1e-4 && (p.lon - lon).abs() < 1e-4
    }

    #[test]
    fn numeric_pair() {
        let p = GeoPoint::from_value(&json!([-42.5188, 172.5718])).unwrap();
        assert_eq!(p, GeoPoint { lat: -42.5188, lon: 172.5718 });
    }

    #[test]
    fn string_pair() {
        let p = GeoPoint::from_value(&json!(["34.034", "-118.6792"])).unwrap();
        assert_eq!(p, GeoPoint { lat: 34.034, lon: -118.6792 });
    }

    #[test]
    fn comma_string() {
        let p: GeoPoint = "38.8974, -77.0365".parse().unwrap();
        assert_eq!(p, GeoPoint { lat: 38.8974, lon: -77.0365 });
    }

    #[test]
    fn object_with_lon_or_lng() {
        let a = GeoPoint::from_value(&json!({"lat": 1.5, "lon": 2.5})).unwrap();
        let b = GeoPoint::from_value(&json!({"lat": "1.5", "lng": 2.5})).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn wkt_is_lon_lat() {
        let p: GeoPoint = "POINT(-77.0365 38.8974)".parse().unwrap();
        assert_eq!(p, GeoPoint { lat: 38.8974, lon: -77.0365 });
    }

    #[test]
    fn geohash_decodes_to_cell_centre() {
        let p: GeoPoint = "u4pruydqqvj".parse().unwrap();
        assert!(close(p, 57.64911, 10.40744), "{p}");
    }

    #[test]
    fn out_of_range_rejected() {
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::from_value(&json!([172.5718, -242.0])).is_err());
        assert!("nowhere, fast".parse::<GeoPoint>().is_err());
    }

    #[test]
    fn locations_single_or_many() {
        assert_eq!(locations_from_value(&json!(null)).unwrap(), vec![]);
        assert_eq!(locations_from_value(&json!([1.0, 2.0])).unwrap().len(), 1);
        assert_eq!(
            locations_from_value(&json!("38.8974, -77.0365")).unwrap().len(),
            1
        );

        let many = locations_from_value(&json!([[1.0, 2.0], "3, 4", {"lat": 5, "lon": 6}])).unwrap();
        assert_eq!(many.len(), 3);
        assert_eq!(many[1], GeoPoint { lat: 3.0, lon: 4.0 });
    }

    #[test]
    fn two_comma_strings_are_two_points() {
        let pts = locations_from_value(&json!(["1, 2", "3, 4"])).unwrap();
        assert_eq!(pts, vec![GeoPoint { lat: 1.0, lon: 2.0 }, GeoPoint { lat: 3.0, lon: 4.0 }]);
    }
}
