//! Amenity directory trait.

use async_trait::async_trait;

use reliefnet_core::geo::Coordinates;

use crate::domain::Resource;
use crate::error::ResourceError;

/// The third-party geodata lookup (an Overpass-style amenity directory).
/// Only its retry wrapping is in scope here; HTTP specifics live behind an
/// implementation at the binary edge.
#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    /// Finds relief amenities within `radius_meters` of `location`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Directory`] when the upstream is
    /// unavailable or answers with an error; the caller retries with
    /// backoff.
    async fn find_near(
        &self,
        location: Coordinates,
        radius_meters: u32,
    ) -> Result<Vec<Resource>, ResourceError>;
}
