//! Geographic primitives: coordinates, great-circle distance, ETA derivation.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Assumed average speed of an ambulance responding to an emergency, km/h.
/// A documented approximation, not a routing-engine estimate.
const EMERGENCY_SPEED_KMH: f64 = 40.0;

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both components are real numbers (no NaN/infinity).
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Great-circle distance between two points using the haversine formula.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// ETA in whole minutes at the fixed average emergency speed, rounded up.
pub fn eta_minutes(distance_km: f64) -> u32 {
    (distance_km / EMERGENCY_SPEED_KMH * 60.0).ceil() as u32
}

/// Round a distance to two decimal places for client-facing projections.
pub fn round_km(distance_km: f64) -> f64 {
    (distance_km * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_zero_distance() {
        let p = GeoPoint::new(12.9716, 77.5946);
        assert!(haversine_km(p, p).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Bangalore to Chennai, roughly 290 km great-circle
        let blr = GeoPoint::new(12.9716, 77.5946);
        let maa = GeoPoint::new(13.0827, 80.2707);
        let d = haversine_km(blr, maa);
        assert!((d - 290.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn test_haversine_symmetry() {
        let a = GeoPoint::new(10.0, 10.0);
        let b = GeoPoint::new(10.0, 10.01);
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-12);
    }

    #[test]
    fn test_eta_rounds_up() {
        // 10 km at 40 km/h = 15 minutes exactly
        assert_eq!(eta_minutes(10.0), 15);
        // slightly more than 10 km must round up
        assert_eq!(eta_minutes(10.01), 16);
        assert_eq!(eta_minutes(0.0), 0);
    }

    #[test]
    fn test_round_km() {
        assert_eq!(round_km(1.23456), 1.23);
        assert_eq!(round_km(1.236), 1.24);
        assert_eq!(round_km(0.0), 0.0);
    }

    #[test]
    fn test_is_finite() {
        assert!(GeoPoint::new(1.0, 2.0).is_finite());
        assert!(!GeoPoint::new(f64::NAN, 2.0).is_finite());
        assert!(!GeoPoint::new(1.0, f64::INFINITY).is_finite());
    }
}
