//! Geospatial store trait.

use async_trait::async_trait;

use crate::domain::Resource;
use crate::error::ResourceError;

/// The external geospatial document store for found resources.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Upserts every resource, keyed by `(name, amenity)`. Idempotent:
    /// running the same batch again replaces rows instead of duplicating
    /// them, which keeps redelivered find commands safe.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Store`] when the store is unavailable.
    async fn upsert_all(&self, resources: &[Resource]) -> Result<(), ResourceError>;
}
