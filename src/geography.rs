// Geography - Surface coordinates and the great-circle metric between them

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::orbital_mechanics::{OrbitalElements, Vector3};

/// Reference sphere radius (km). Every body is measured against it.
pub const REFERENCE_RADIUS_KM: f64 = 6378.0;

/// A geographical position on a sphere
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeographicCoordinate {
    /// North-south position (degrees)
    pub latitude: f64,
    /// East-west position (degrees)
    pub longitude: f64,
}

impl GeographicCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Uniform latitude in [-90, 90) and longitude in [-180, 180)
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            latitude: rng.gen::<f64>() * 180.0 - 90.0,
            longitude: rng.gen::<f64>() * 360.0 - 180.0,
        }
    }
}

impl fmt::Display for GeographicCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.latitude, self.longitude)
    }
}

/// Great-circle distance (km) between two coordinates on the reference sphere
pub fn haversine_distance(c0: &GeographicCoordinate, c1: &GeographicCoordinate) -> f64 {
    let lat0 = c0.latitude.to_radians();
    let lat1 = c1.latitude.to_radians();
    let d_lat = lat1 - lat0;
    let d_lon = (c1.longitude - c0.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat0.cos() * lat1.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1 for antipodal points
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();
    REFERENCE_RADIUS_KM * c
}

/// Cartesian point on a sphere of the given radius, y pointing north
pub fn geographic_to_cartesian(latitude_deg: f64, longitude_deg: f64, radius: f64) -> Vector3 {
    let (sin_lat, cos_lat) = latitude_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = longitude_deg.to_radians().sin_cos();
    Vector3::new(cos_lat * cos_lon, sin_lat, cos_lat * sin_lon).scale(radius)
}

/// A point on the surface of a specific celestial body
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub body: Arc<OrbitalElements>,
    pub coordinates: GeographicCoordinate,
}

impl Location {
    pub fn new(body: Arc<OrbitalElements>, coordinates: GeographicCoordinate) -> Self {
        Self { body, coordinates }
    }

    /// Random location anywhere on the body
    pub fn random<R: Rng + ?Sized>(rng: &mut R, body: &Arc<OrbitalElements>) -> Self {
        Self::new(Arc::clone(body), GeographicCoordinate::random(rng))
    }

    pub fn same_body(&self, other: &Location) -> bool {
        self.body == other.body
    }

    /// Surface distance (km), or `None` when the locations sit on different bodies
    pub fn surface_distance(&self, other: &Location) -> Option<f64> {
        self.same_body(other)
            .then(|| haversine_distance(&self.coordinates, &other.coordinates))
    }

    /// Point on the body's unit sphere, scaled by `radius`
    pub fn to_cartesian(&self, radius: f64) -> Vector3 {
        geographic_to_cartesian(self.coordinates.latitude, self.coordinates.longitude, radius)
    }
}

// =============================================================================
// TESTS
// =============================================================================
