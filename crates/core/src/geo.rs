//! Spherical geometry for tour start locations.
//!
//! Points are stored as GeoJSON (`{"type": "Point", "coordinates": [lng, lat]}`).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{CoreError, CoreResult};

/// Earth radius used to turn a search distance into radians, in miles.
pub const EARTH_RADIUS_MI: f64 = 3963.2;

/// Earth radius used to turn a search distance into radians, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6378.1;

/// Earth radius for distances reported in metres.
pub const EARTH_RADIUS_M: f64 = 6_378_100.0;

/// Metres to miles.
pub const METERS_TO_MILES: f64 = 0.000621371;

/// Metres to kilometres.
pub const METERS_TO_KILOMETERS: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lng, lat }
    }

    /// Read a GeoJSON point (`coordinates: [lng, lat]`).
    pub fn from_geojson(value: &Value) -> Option<Self> {
        let coords = value.get("coordinates")?.as_array()?;
        match coords.as_slice() {
            [lng, lat, ..] => Some(Self::new(lat.as_f64()?, lng.as_f64()?)),
            _ => None,
        }
    }

    pub fn to_geojson(self) -> Value {
        json!({ "type": "Point", "coordinates": [self.lng, self.lat] })
    }
}

/// Parse a `lat,lng` path segment.
pub fn parse_lat_lng(raw: &str) -> CoreResult<GeoPoint> {
    let invalid = || {
        CoreError::Validation(
            "Please provide latitude and longitude in the format lat,lng".into(),
        )
    };
    let (lat, lng) = raw.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(invalid());
    }
    Ok(GeoPoint::new(lat, lng))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Miles,
    Kilometers,
}

impl DistanceUnit {
    pub fn parse(raw: &str) -> CoreResult<Self> {
        match raw {
            "mi" => Ok(Self::Miles),
            "km" => Ok(Self::Kilometers),
            other => Err(CoreError::Validation(format!(
                "Unknown distance unit '{other}'. Use 'mi' or 'km'"
            ))),
        }
    }

    /// Angular radius (radians) of a search circle `distance` units wide.
    pub fn radius_radians(self, distance: f64) -> f64 {
        match self {
            Self::Miles => distance / EARTH_RADIUS_MI,
            Self::Kilometers => distance / EARTH_RADIUS_KM,
        }
    }

    /// Factor converting metres into this unit.
    pub fn meter_multiplier(self) -> f64 {
        match self {
            Self::Miles => METERS_TO_MILES,
            Self::Kilometers => METERS_TO_KILOMETERS,
        }
    }
}

/// Central angle between two points in radians (haversine).
pub fn central_angle(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat_a, lat_b) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = lat_b - lat_a;
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

/// Great-circle distance in metres.
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    central_angle(a, b) * EARTH_RADIUS_M
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_lat_lng_segment() {
        let point = parse_lat_lng("34.111745,-118.113491").unwrap();
        assert_eq!(point.lat, 34.111745);
        assert_eq!(point.lng, -118.113491);
    }

    #[test]
    fn rejects_malformed_lat_lng() {
        assert_matches!(parse_lat_lng("34.1"), Err(CoreError::Validation(_)));
        assert_matches!(parse_lat_lng("abc,def"), Err(CoreError::Validation(_)));
        assert_matches!(parse_lat_lng("95,10"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn geojson_round_trips_coordinate_order() {
        let point = GeoPoint::new(25.7, -80.1);
        let json = point.to_geojson();
        assert_eq!(json["coordinates"][0], -80.1);
        assert_eq!(GeoPoint::from_geojson(&json), Some(point));
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let meters = distance_meters(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        assert!((meters - 111_317.0).abs() < 100.0, "got {meters}");
    }

    #[test]
    fn radius_uses_unit_specific_earth_radius() {
        assert!((DistanceUnit::Miles.radius_radians(3963.2) - 1.0).abs() < 1e-12);
        assert!((DistanceUnit::Kilometers.radius_radians(6378.1) - 1.0).abs() < 1e-12);
    }
}
