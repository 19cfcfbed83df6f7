//! Geographic primitives shared across contexts.

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl Coordinates {
    /// Creates a coordinate pair.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A GeoJSON point geometry.
///
/// GeoJSON orders coordinates `[longitude, latitude]`, the reverse of the
/// human-facing [`Coordinates`] pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    /// Geometry type, always `"Point"`.
    #[serde(rename = "type")]
    pub geometry_type: String,
    /// `[longitude, latitude]`.
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    /// Builds a point geometry from a coordinate pair.
    #[must_use]
    pub fn from_coordinates(position: Coordinates) -> Self {
        Self {
            geometry_type: "Point".to_owned(),
            coordinates: [position.longitude, position.latitude],
        }
    }
}
