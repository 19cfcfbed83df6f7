//! Disaster persistence trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Disaster, DisasterStatus};
use crate::error::DisasterError;

/// Persistence collaborator for disaster records. The document store behind
/// it (geospatial indexing, TTL expiry) is out of scope; implementations
/// live at the binary edge or in test support.
#[async_trait]
pub trait DisasterRepository: Send + Sync {
    /// Stores a new record.
    ///
    /// # Errors
    ///
    /// Returns [`DisasterError::Repository`] when the store is unavailable.
    async fn create(&self, disaster: &Disaster) -> Result<(), DisasterError>;

    /// Loads a record by id.
    ///
    /// # Errors
    ///
    /// Returns [`DisasterError::Repository`] when the store is unavailable.
    async fn get(&self, id: Uuid) -> Result<Option<Disaster>, DisasterError>;

    /// Persists a status change.
    ///
    /// # Errors
    ///
    /// Returns [`DisasterError::Repository`] when the store is unavailable.
    async fn update_status(
        &self,
        id: Uuid,
        status: DisasterStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DisasterError>;

    /// Hard-deletes a record. Deleting an id that does not exist succeeds,
    /// so compensation and the delete command stay idempotent under
    /// redelivery.
    ///
    /// # Errors
    ///
    /// Returns [`DisasterError::Repository`] when the store is unavailable.
    async fn delete(&self, id: Uuid) -> Result<(), DisasterError>;
}
