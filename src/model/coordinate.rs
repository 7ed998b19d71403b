//! Geographic coordinates

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Parse the numeric strings used on the wire.
    ///
    /// Empty or malformed values yield `None` rather than an error; a record
    /// without a usable position is still a valid record.
    pub fn parse(latitude: &str, longitude: &str) -> Option<Self> {
        let latitude = latitude.trim().parse::<f64>().ok()?;
        let longitude = longitude.trim().parse::<f64>().ok()?;
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        Some(Self { latitude, longitude })
    }

    /// Planar distance in degrees.
    ///
    /// No geodesic correction: at garden scale the error is irrelevant and
    /// only the relative ordering is used.
    pub fn planar_distance(&self, other: &Coordinate) -> f64 {
        let dlat = self.latitude - other.latitude;
        let dlon = self.longitude - other.longitude;
        (dlat * dlat + dlon * dlon).sqrt()
    }
}
