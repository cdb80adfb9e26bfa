//! Geolocation primitives.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle (haversine) distance to `other`, in kilometres.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        let p = GeoPoint::new(-23.55, -46.63);
        assert!(p.distance_km(&p).abs() < 1e-9);
    }

    #[test]
    fn test_known_distance() {
        // São Paulo to Rio de Janeiro, roughly 360 km.
        let sp = GeoPoint::new(-23.5505, -46.6333);
        let rj = GeoPoint::new(-22.9068, -43.1729);
        let d = sp.distance_km(&rj);
        assert!((d - 360.0).abs() < 10.0, "got {d}");
        assert!((d - rj.distance_km(&sp)).abs() < 1e-9);
    }
}
