//! Resource domain types.

use serde::{Deserialize, Serialize};

use reliefnet_core::geo::GeoPoint;

/// Amenity categories searched around a disaster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmenityKind {
    /// Medical care.
    Hospital,
    /// Fire and rescue.
    FireStation,
    /// Law enforcement.
    Police,
    /// Emergency shelter.
    Shelter,
    /// Medication supply.
    Pharmacy,
}

impl AmenityKind {
    /// All categories included in a directory search.
    pub const ALL: [Self; 5] = [
        Self::Hospital,
        Self::FireStation,
        Self::Police,
        Self::Shelter,
        Self::Pharmacy,
    ];
}

impl std::fmt::Display for AmenityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Hospital => "hospital",
            Self::FireStation => "fire_station",
            Self::Police => "police",
            Self::Shelter => "shelter",
            Self::Pharmacy => "pharmacy",
        };
        f.write_str(label)
    }
}

/// A relief resource found near a disaster. Not owned by the saga; lives in
/// the external geospatial store, keyed by name and amenity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Human-readable name from the directory.
    pub name: String,
    /// Amenity category.
    pub amenity: AmenityKind,
    /// GeoJSON point location.
    pub location: GeoPoint,
}

impl Resource {
    /// The upsert key. Writing the same resource twice, as happens under
    /// at-least-once redelivery, replaces rather than duplicates.
    #[must_use]
    pub fn upsert_key(&self) -> (String, AmenityKind) {
        (self.name.clone(), self.amenity)
    }
}
